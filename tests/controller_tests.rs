//! Feed and controller behaviour driven only through the public API.

use proptest::prelude::*;
use zephyr_client::controller::{ChatController, ConnectionState, FeedUpdate};
use zephyr_client::feed::Role;
use zephyr_client::protocol::END_OF_RESPONSE;

fn connected() -> ChatController {
    let mut c = ChatController::new();
    c.connect("ws://localhost:8000", "room", "alice").unwrap();
    c.on_open();
    c
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[test]
fn test_hello_example() {
    let mut c = connected();
    c.receive("Hel");
    c.receive("lo");
    c.receive(END_OF_RESPONSE);

    let entries = c.feed().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].role, Role::Ai);
    assert_eq!(entries[0].text, "Hello");
    assert!(!entries[0].live);
}

#[test]
fn test_marker_finalizes_once_and_next_fragment_starts_new_entry() {
    let mut c = connected();
    c.receive("first");
    assert!(matches!(c.receive(END_OF_RESPONSE), FeedUpdate::Finalized(Some(_))));
    assert_eq!(c.receive(END_OF_RESPONSE), FeedUpdate::Finalized(None));
    assert_eq!(c.feed().buffer(), "");

    c.receive("second");
    let entries = c.feed().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text, "second");
    assert!(entries[0].live);
    assert_eq!(entries[1].text, "first");
    assert!(!entries[1].live);
}

#[test]
fn test_session_started_never_changes_feed() {
    let mut c = connected();
    c.receive(r#"{"type":"session_started","session_id":"room"}"#);
    assert!(c.feed().is_empty());

    c.receive("abc");
    let before = c.feed().entries().to_vec();
    c.receive(r#"{"type":"session_started","session_id":"room"}"#);
    assert_eq!(c.feed().entries(), before.as_slice());
}

#[test]
fn test_session_started_with_odd_fields_never_changes_feed() {
    let frames = [
        r#"{"type":"session_started","session_id":42}"#,
        r#"{"type":"session_started","session_id":null}"#,
        r#"{"type":"session_started","session_id":"room","user_id":"alice","ts":17}"#,
        r#"{"type":"session_started"}"#,
    ];
    let mut c = connected();
    for frame in frames {
        c.receive(frame);
    }
    assert!(c.feed().is_empty());

    c.receive("abc");
    for frame in frames {
        c.receive(frame);
    }
    assert_eq!(c.feed().len(), 1);
    assert_eq!(c.feed().entries()[0].text, "abc");
    assert!(c.feed().entries()[0].live);
}

#[test]
fn test_non_string_type_is_streamed_as_text() {
    let mut c = connected();
    c.receive(r#"{"type":1}"#);
    c.receive(r#"{"type":["session_started"]}"#);
    let entry = c.feed().live_entry().unwrap();
    assert_eq!(entry.text, r#"{"type":1}{"type":["session_started"]}"#);
}

#[test]
fn test_close_mid_stream_keeps_text() {
    let mut c = connected();
    c.receive("unfinished ");
    c.receive("thought");
    c.on_close();

    assert!(c.state().is_idle());
    let entry = &c.feed().entries()[0];
    assert!(!entry.live);
    assert_eq!(entry.text, "unfinished thought");

    // Reconnecting and streaming again starts a separate entry.
    c.connect("ws://localhost:8000", "room", "alice").unwrap();
    c.on_open();
    c.receive("fresh");
    assert_eq!(c.feed().len(), 2);
    assert_eq!(c.feed().entries()[0].text, "fresh");
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

#[test]
fn test_send_example() {
    let mut c = connected();
    let msg = c.send("  hi  ").unwrap();
    assert_eq!(msg.encode().unwrap(), r#"{"message":"hi"}"#);
    assert_eq!(c.feed().entries()[0].text, "hi");
    assert_eq!(c.feed().entries()[0].role, Role::User);
}

#[test]
fn test_user_entries_interleave_newest_first() {
    let mut c = connected();
    c.send("question one");
    c.receive("answer one");
    c.receive(END_OF_RESPONSE);
    c.send("question two");

    let texts: Vec<&str> = c.feed().entries().iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["question two", "answer one", "question one"]);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_full_lifecycle() {
    let mut c = ChatController::new();
    assert_eq!(c.state(), &ConnectionState::Idle);

    let url = c.connect("ws://h/", "s", "u").unwrap();
    assert_eq!(c.state(), &ConnectionState::Connecting { url: url.clone() });

    c.on_open();
    assert_eq!(c.state(), &ConnectionState::Connected { url: url.clone() });

    c.disconnect().unwrap();
    assert_eq!(c.state(), &ConnectionState::Closing { url });

    c.on_close();
    assert_eq!(c.state(), &ConnectionState::Idle);
    assert!(c.controls().connect);
    assert!(!c.controls().input);
}

#[test]
fn test_failed_handshake_returns_to_idle() {
    let mut c = ChatController::new();
    c.connect("ws://h", "s", "u").unwrap();
    assert!(c.on_error("connection refused"));
    c.on_close();
    assert!(c.state().is_idle());
    assert_eq!(c.status().text, "Disconnected");
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// Plain text that can never parse as a JSON object or be the end marker.
fn fragment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?']{0,12}"
}

proptest! {
    #[test]
    fn prop_live_text_is_concatenation(fragments in prop::collection::vec(fragment(), 1..20)) {
        let mut c = connected();
        for f in &fragments {
            c.receive(f);
        }
        let live_text = c.feed().live_entry().map(|e| e.text.clone());
        prop_assert_eq!(live_text, Some(fragments.concat()));
    }

    #[test]
    fn prop_session_started_between_fragments_is_invisible(
        fragments in prop::collection::vec(fragment(), 1..10),
        session_id in any::<i64>(),
    ) {
        let control = format!(r#"{{"type":"session_started","session_id":{}}}"#, session_id);
        let mut c = connected();
        for f in &fragments {
            c.receive(f);
            c.receive(&control);
        }
        let live_text = c.feed().live_entry().map(|e| e.text.clone());
        prop_assert_eq!(live_text, Some(fragments.concat()));
        prop_assert_eq!(c.feed().len(), 1);
    }

    #[test]
    fn prop_blank_input_never_sends(blank in "[ \t\n\r]{0,10}") {
        let mut c = connected();
        prop_assert!(c.send(&blank).is_none());
        prop_assert!(c.feed().is_empty());
    }
}

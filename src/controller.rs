//! Chat client controller.
//!
//! Owns the connection state, the status indicator, the enabled/disabled
//! state of the controls and the feed. It does no I/O: the app loop feeds
//! it socket events and user actions, and acts on what it returns.

use tracing::{debug, error, info};

use crate::feed::{Feed, Role};
use crate::protocol::{self, CloseRequest, InboundFrame, OutboundMessage};
use crate::session::{self, SessionIdSource};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// At most one socket exists, so every state except `Idle` carries the URL
/// of that socket.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting { url: String },
    Connected { url: String },
    Closing { url: String },
}

impl ConnectionState {
    pub fn url(&self) -> Option<&str> {
        match self {
            ConnectionState::Idle => None,
            ConnectionState::Connecting { url }
            | ConnectionState::Connected { url }
            | ConnectionState::Closing { url } => Some(url),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConnectionState::Idle)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting { .. } => write!(f, "connecting"),
            ConnectionState::Connected { .. } => write!(f, "connected"),
            ConnectionState::Closing { .. } => write!(f, "closing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub connected: bool,
}

impl Status {
    fn disconnected(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            connected: false,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::disconnected(DISCONNECTED_STATUS)
    }
}

pub const DISCONNECTED_STATUS: &str = "Disconnected";
pub const ERROR_STATUS: &str = "Connection error, see console.";

/// Which controls accept input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub connect: bool,
    pub disconnect: bool,
    pub input: bool,
    pub send: bool,
}

impl Controls {
    fn for_connection(connected: bool) -> Self {
        Self {
            connect: !connected,
            disconnect: connected,
            input: connected,
            send: connected,
        }
    }
}

impl Default for Controls {
    fn default() -> Self {
        Controls::for_connection(false)
    }
}

/// The message input field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    pub draft: String,
    pub focused: bool,
}

/// What a received frame did to the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedUpdate {
    /// End marker; carries the finalized entry, if one was live.
    Finalized(Option<u64>),
    /// Control frame, feed untouched.
    Ignored,
    /// Fragment appended to the live entry.
    Streamed { entry_id: u64, started: bool },
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ChatController {
    state: ConnectionState,
    status: Status,
    controls: Controls,
    composer: Composer,
    feed: Feed,
    session_id: String,
    user_id: String,
    id_source: SessionIdSource,
}

impl ChatController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_source(mut self, source: SessionIdSource) -> Self {
        self.id_source = source;
        self
    }

    // -- accessors ----------------------------------------------------------

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.session_id = session_id.into();
    }

    /// Replace the session id with a freshly generated one and return it.
    pub fn generate_session_id(&mut self) -> &str {
        self.session_id = session::generate_session_id(self.id_source);
        &self.session_id
    }

    // -- connection lifecycle -----------------------------------------------

    /// Resolve identity, build the socket URL and move to `Connecting`.
    ///
    /// Returns the URL the transport should open, or `None` when a socket
    /// already exists.
    pub fn connect(&mut self, host: &str, session_id: &str, user_id: &str) -> Option<String> {
        if !self.state.is_idle() {
            debug!(state = %self.state, "connect ignored, socket already exists");
            return None;
        }

        self.session_id = session::resolve_session_id(session_id, self.id_source);
        self.user_id = session::resolve_user_id(user_id);
        let url = session::session_url(host, &self.session_id, &self.user_id);

        info!(%url, session_id = %self.session_id, "connecting");
        self.state = ConnectionState::Connecting { url: url.clone() };
        Some(url)
    }

    pub fn on_open(&mut self) {
        let url = match &self.state {
            ConnectionState::Connecting { url } => url.clone(),
            other => {
                debug!(state = %other, "open event outside connecting state");
                return;
            }
        };

        info!(%url, "connected");
        self.status = Status {
            text: format!("Connected to {}", url),
            connected: true,
        };
        self.controls = Controls::for_connection(true);
        self.state = ConnectionState::Connected { url };
    }

    /// Record a socket error.
    ///
    /// Returns `true` when the socket should now be closed; the close event
    /// that follows does the cleanup.
    pub fn on_error(&mut self, err: &str) -> bool {
        error!(error = %err, "WebSocket error");
        self.status = Status::disconnected(ERROR_STATUS);

        match std::mem::take(&mut self.state) {
            ConnectionState::Idle => false,
            ConnectionState::Connecting { url }
            | ConnectionState::Connected { url }
            | ConnectionState::Closing { url } => {
                self.state = ConnectionState::Closing { url };
                true
            }
        }
    }

    /// Handle the socket closing, whatever the cause.
    pub fn on_close(&mut self) {
        info!(state = %self.state, "disconnected");
        self.status = Status::disconnected(DISCONNECTED_STATUS);
        self.controls = Controls::for_connection(false);
        self.state = ConnectionState::Idle;
        self.feed.finalize_live();
    }

    /// Ask for a normal closure, if a socket exists.
    pub fn disconnect(&mut self) -> Option<CloseRequest> {
        match std::mem::take(&mut self.state) {
            ConnectionState::Connecting { url } | ConnectionState::Connected { url } => {
                debug!(%url, "client disconnect");
                self.state = ConnectionState::Closing { url };
                Some(CloseRequest::client_disconnect())
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    // -- messages -----------------------------------------------------------

    /// Apply one inbound frame to the feed.
    pub fn receive(&mut self, raw: &str) -> FeedUpdate {
        match protocol::classify(raw) {
            InboundFrame::EndOfResponse => FeedUpdate::Finalized(self.feed.finalize_live()),
            InboundFrame::SessionStarted { session_id } => {
                debug!(?session_id, "session started");
                FeedUpdate::Ignored
            }
            InboundFrame::Fragment(fragment) => {
                let started = self.feed.live_entry().is_none();
                let entry = self.feed.push_fragment(&fragment);
                FeedUpdate::Streamed {
                    entry_id: entry.id,
                    started,
                }
            }
        }
    }

    /// Turn user input into an outbound message.
    ///
    /// Returns `None` without touching anything when the socket is not open
    /// or the input is blank.
    pub fn send(&mut self, content: &str) -> Option<OutboundMessage> {
        if !self.state.is_open() {
            debug!("send ignored, not connected");
            return None;
        }
        let content = content.trim();
        if content.is_empty() {
            return None;
        }

        self.feed.append_entry(Role::User, content, false);
        self.composer.draft.clear();
        self.composer.focused = true;
        Some(OutboundMessage::new(content))
    }

    /// Send whatever is in the composer.
    pub fn submit(&mut self) -> Option<OutboundMessage> {
        let draft = self.composer.draft.clone();
        self.send(&draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> ChatController {
        let mut c = ChatController::new();
        c.connect("ws://localhost:8000", "s1", "bob").unwrap();
        c.on_open();
        c
    }

    #[test]
    fn test_initial_state() {
        let c = ChatController::new();
        assert!(c.state().is_idle());
        assert_eq!(c.status().text, "Disconnected");
        assert!(!c.status().connected);
        assert!(c.controls().connect);
        assert!(!c.controls().disconnect);
        assert!(!c.controls().input);
    }

    #[test]
    fn test_connect_builds_url_and_moves_to_connecting() {
        let mut c = ChatController::new();
        let url = c.connect("ws://localhost:8000/", "s1", "bob smith").unwrap();
        assert_eq!(url, "ws://localhost:8000/ws/session/s1?user_id=bob%20smith");
        assert_eq!(
            c.state(),
            &ConnectionState::Connecting { url: url.clone() }
        );
        assert_eq!(c.session_id(), "s1");
        assert_eq!(c.user_id(), "bob smith");
    }

    #[test]
    fn test_connect_defaults_identity() {
        let mut c = ChatController::new().with_id_source(SessionIdSource::Timestamp);
        let url = c.connect("ws://h", "  ", "").unwrap();
        assert!(c.session_id().starts_with("session-"));
        assert_eq!(c.user_id(), "anonymous");
        assert!(url.ends_with("?user_id=anonymous"));
    }

    #[test]
    fn test_connect_twice_is_noop() {
        let mut c = ChatController::new();
        assert!(c.connect("ws://h", "a", "u").is_some());
        assert!(c.connect("ws://h", "b", "u").is_none());
        assert_eq!(c.session_id(), "a");
        c.on_open();
        assert!(c.connect("ws://h", "c", "u").is_none());
    }

    #[test]
    fn test_open_sets_status_and_controls() {
        let c = connected();
        assert!(c.status().connected);
        assert_eq!(
            c.status().text,
            "Connected to ws://localhost:8000/ws/session/s1?user_id=bob"
        );
        let controls = c.controls();
        assert!(!controls.connect);
        assert!(controls.disconnect);
        assert!(controls.input);
        assert!(controls.send);
    }

    #[test]
    fn test_open_without_connect_is_ignored() {
        let mut c = ChatController::new();
        c.on_open();
        assert!(c.state().is_idle());
        assert!(!c.status().connected);
    }

    #[test]
    fn test_error_requests_close_then_close_cleans_up() {
        let mut c = connected();
        assert!(c.on_error("boom"));
        assert_eq!(c.status().text, "Connection error, see console.");
        assert!(matches!(c.state(), ConnectionState::Closing { .. }));
        c.on_close();
        assert!(c.state().is_idle());
        assert_eq!(c.status().text, "Disconnected");
        assert!(c.controls().connect);
    }

    #[test]
    fn test_error_while_idle_requests_nothing() {
        let mut c = ChatController::new();
        assert!(!c.on_error("late"));
        assert!(c.state().is_idle());
    }

    #[test]
    fn test_close_allows_reconnect() {
        let mut c = connected();
        c.on_close();
        assert!(c.connect("ws://h", "s2", "bob").is_some());
    }

    #[test]
    fn test_disconnect_uses_normal_closure() {
        let mut c = connected();
        let close = c.disconnect().unwrap();
        assert_eq!(close, CloseRequest::client_disconnect());
        assert!(matches!(c.state(), ConnectionState::Closing { .. }));
        assert!(c.disconnect().is_none());
    }

    #[test]
    fn test_disconnect_while_connecting() {
        let mut c = ChatController::new();
        c.connect("ws://h", "s", "u");
        assert!(c.disconnect().is_some());
    }

    #[test]
    fn test_disconnect_while_idle_is_noop() {
        let mut c = ChatController::new();
        assert!(c.disconnect().is_none());
        assert!(c.state().is_idle());
    }

    #[test]
    fn test_receive_streams_and_finalizes() {
        let mut c = connected();
        let first = c.receive("Hel");
        let id = match first {
            FeedUpdate::Streamed { entry_id, started } => {
                assert!(started);
                entry_id
            }
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(
            c.receive("lo"),
            FeedUpdate::Streamed {
                entry_id: id,
                started: false
            }
        );
        assert_eq!(c.receive("[END_OF_RESPONSE]"), FeedUpdate::Finalized(Some(id)));
        let entries = c.feed().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "Hello");
        assert!(!entries[0].live);
    }

    #[test]
    fn test_marker_without_live_entry() {
        let mut c = connected();
        assert_eq!(c.receive("[END_OF_RESPONSE]"), FeedUpdate::Finalized(None));
        assert!(c.feed().is_empty());
    }

    #[test]
    fn test_session_started_ignored() {
        let mut c = connected();
        c.receive("partial");
        let update = c.receive(r#"{"type":"session_started","session_id":"s1"}"#);
        assert_eq!(update, FeedUpdate::Ignored);
        assert_eq!(c.feed().len(), 1);
        assert_eq!(c.feed().live_entry().unwrap().text, "partial");
    }

    #[test]
    fn test_other_json_is_text() {
        let mut c = connected();
        c.receive(r#"{"type":"token"}"#);
        assert_eq!(c.feed().live_entry().unwrap().text, r#"{"type":"token"}"#);
    }

    #[test]
    fn test_close_finalizes_live_entry_keeping_text() {
        let mut c = connected();
        c.receive("half an ans");
        c.on_close();
        let entry = &c.feed().entries()[0];
        assert!(!entry.live);
        assert_eq!(entry.text, "half an ans");
        assert_eq!(c.feed().buffer(), "");
    }

    #[test]
    fn test_send_trims_and_records_user_entry() {
        let mut c = connected();
        c.composer_mut().draft = "  hi  ".to_string();
        let msg = c.submit().unwrap();
        assert_eq!(msg.encode().unwrap(), r#"{"message":"hi"}"#);
        let entry = &c.feed().entries()[0];
        assert_eq!(entry.role, Role::User);
        assert_eq!(entry.text, "hi");
        assert!(!entry.live);
        assert_eq!(c.composer().draft, "");
        assert!(c.composer().focused);
    }

    #[test]
    fn test_send_blank_is_ignored() {
        let mut c = connected();
        assert!(c.send("   \t ").is_none());
        assert!(c.send("").is_none());
        assert!(c.feed().is_empty());
    }

    #[test]
    fn test_send_while_disconnected_is_ignored() {
        let mut c = ChatController::new();
        assert!(c.send("hello").is_none());
        c.connect("ws://h", "s", "u");
        assert!(c.send("hello").is_none());
        assert!(c.feed().is_empty());
    }

    #[test]
    fn test_generate_session_id_replaces_current() {
        let mut c = ChatController::new();
        c.set_session_id("old");
        let new_id = c.generate_session_id().to_string();
        assert_ne!(new_id, "old");
        assert_eq!(c.session_id(), new_id);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Idle.to_string(), "idle");
        assert_eq!(
            ConnectionState::Connected { url: "u".into() }.to_string(),
            "connected"
        );
        assert_eq!(ConnectionState::Idle.url(), None);
    }
}

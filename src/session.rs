//! Session identity and connection URL construction.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::time::{SystemTime, UNIX_EPOCH};

/// User id used when none is given.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Where a new session id comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionIdSource {
    /// Random v4 UUID.
    #[default]
    Uuid,
    /// `session-<hex millis>`; used when secure random ids are unavailable.
    Timestamp,
}

/// Generate a fresh session id.
pub fn generate_session_id(source: SessionIdSource) -> String {
    match source {
        SessionIdSource::Uuid => uuid::Uuid::new_v4().to_string(),
        SessionIdSource::Timestamp => timestamp_session_id(now_ms()),
    }
}

/// Fallback id for a given epoch-millis timestamp.
///
/// Two clients starting in the same millisecond get the same id.
pub fn timestamp_session_id(millis: u64) -> String {
    format!("session-{:x}", millis)
}

/// Current Unix time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Trimmed session id, or a freshly generated one when blank.
pub fn resolve_session_id(input: &str, source: SessionIdSource) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        generate_session_id(source)
    } else {
        trimmed.to_string()
    }
}

/// Trimmed user id, or `anonymous` when blank.
pub fn resolve_user_id(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        ANONYMOUS_USER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Build `<host>/ws/session/<session_id>?user_id=<encoded user_id>`.
///
/// One trailing slash is stripped from the host. The scheme is not checked;
/// callers supply `ws://` or `wss://`.
pub fn session_url(host: &str, session_id: &str, user_id: &str) -> String {
    let host = host.trim();
    let host = host.strip_suffix('/').unwrap_or(host);
    format!(
        "{}/ws/session/{}?user_id={}",
        host,
        session_id,
        url_encode(user_id)
    )
}

/// The characters `encodeURIComponent` leaves alone:
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a query value the way `encodeURIComponent` does.
pub fn url_encode(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

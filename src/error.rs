//! Hub error types
//!
//! Library code returns these typed errors; the binary and the server edge
//! wrap them in `anyhow` with context.

use thiserror::Error;

/// Errors surfaced by hub handles and table construction.
#[derive(Debug, Error)]
pub enum HubError {
    /// The hub task has stopped; no more clients or requests are accepted.
    #[error("hub is no longer running")]
    HubClosed,

    /// An action table entry could not be registered.
    #[error("invalid action table: {0}")]
    InvalidActionTable(String),
}

/// Per-frame protocol violations. These never close a connection; the
/// offending frame is logged and dropped.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not a JSON object with a request header.
    #[error("unable to decode request header: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The `type` field is something other than `ACTION`.
    #[error("malformed request: not an action (type {0:?})")]
    NotAnAction(String),

    /// The `id` field is missing or empty.
    #[error("malformed request: no id")]
    MissingId,

    /// The frame does not fit the shape registered for its action.
    #[error("unable to decode request for action {action:?}: {source}")]
    Decode {
        action: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type HubResult<T> = Result<T, HubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_messages() {
        let err = ProtocolError::NotAnAction("NOTICE".into());
        assert_eq!(
            err.to_string(),
            "malformed request: not an action (type \"NOTICE\")"
        );
        assert_eq!(ProtocolError::MissingId.to_string(), "malformed request: no id");
    }

    #[test]
    fn test_decode_error_keeps_source() {
        let source = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = ProtocolError::Decode {
            action: "ping".into(),
            source,
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("\"ping\""));
    }
}

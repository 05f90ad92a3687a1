use std::time::Duration;

/// Failures that end a session. Each is surfaced at most once per session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The request could not be issued, was answered with a non-success
    /// status, or the connection dropped before the first byte.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The connection dropped after streaming began. Content already
    /// reconciled stays in place.
    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),

    /// No bytes arrived within the configured idle window.
    #[error("no data received for {}s", .0.as_secs())]
    IdleTimeout(Duration),

    /// The server sent an explicit `error` event.
    #[error("{0}")]
    Application(String),
}

impl StreamError {
    /// Application errors arrive as events, so the store already holds an
    /// entry for them.
    pub fn is_application(&self) -> bool {
        matches!(self, StreamError::Application(_))
    }
}

/// Failures reported by a [`Transport`](super::session::Transport).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("backend returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("{0}")]
    Connect(String),

    #[error("{0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Connect(err.to_string())
        }
    }
}

//! Connection error taxonomy

use thiserror::Error;

/// Errors surfaced by the connection layer
#[derive(Debug, Error)]
pub enum ConnError {
    /// Handshake did not complete within the configured window
    #[error("handshake timed out after {0}ms")]
    HandshakeTimeout(u64),

    /// Direct tool call did not return within the configured window
    #[error("tool call timed out after {0}ms")]
    CallTimeout(u64),

    /// No live session to serve a direct call
    #[error("not connected")]
    NotConnected,

    /// Underlying transport failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Automatic reconnection gave up after the configured attempt budget
    #[error("reconnection failed after {attempts} attempts: {message}")]
    ReconnectExhausted { attempts: u32, message: String },
}

impl ConnError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

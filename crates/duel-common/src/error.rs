//! Common error types for Duelcast.

use thiserror::Error;

/// Result type alias using Duelcast's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for session operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Media channel operation failed
    #[error("media transport error: {0}")]
    Media(String),

    /// Signal channel operation failed
    #[error("signal transport error: {0}")]
    Signal(String),

    /// A join attempt could not complete
    #[error("join failed: {0}")]
    Join(String),

    /// Operation not valid in the current session phase
    #[error("session state error: {0}")]
    Session(String),

    /// Protocol error
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a media transport error from any displayable type.
    pub fn media(msg: impl std::fmt::Display) -> Self {
        Self::Media(msg.to_string())
    }

    /// Create a signal transport error from any displayable type.
    pub fn signal(msg: impl std::fmt::Display) -> Self {
        Self::Signal(msg.to_string())
    }

    /// Create a join error from any displayable type.
    pub fn join(msg: impl std::fmt::Display) -> Self {
        Self::Join(msg.to_string())
    }

    /// Create a session state error from any displayable type.
    pub fn session(msg: impl std::fmt::Display) -> Self {
        Self::Session(msg.to_string())
    }

    /// Create a protocol error from any displayable type.
    pub fn protocol(msg: impl std::fmt::Display) -> Self {
        Self::Protocol(msg.to_string())
    }

    /// Create an internal error from any displayable type.
    pub fn internal(msg: impl std::fmt::Display) -> Self {
        Self::Internal(msg.to_string())
    }
}

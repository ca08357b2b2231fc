//! # Playback Error Types
//!
//! Errors surfaced by the media channel, either synchronously from `submit`
//! or through a request's [`PlayOutcome`](crate::request::PlayOutcome).

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur while scheduling playback on a channel.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The resource already reports itself as playing.
    #[error("Media is already playing")]
    AlreadyActive,

    /// The channel found its model inconsistent with the backend.
    ///
    /// Indicates a backend or scheduling bug; never retried.
    #[error("Channel invariant violated: {0}")]
    InvariantViolation(String),

    /// The backend failed to start the resource.
    #[error("Playback backend error: {0}")]
    Backend(#[from] BridgeError),

    /// The serial executor refused the task.
    #[error("Serial executor unavailable: {0}")]
    Executor(#[source] BridgeError),

    /// No async runtime was available to drive start operations.
    #[error("Async runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// Channel configuration is invalid.
    #[error("Invalid channel configuration: {0}")]
    InvalidConfig(String),
}

impl PlaybackError {
    /// Returns `true` for programmer errors that indicate model corruption.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlaybackError::InvariantViolation(_))
    }

    /// Returns `true` if the error originated in the media backend.
    pub fn is_backend_error(&self) -> bool {
        matches!(self, PlaybackError::Backend(_))
    }
}

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

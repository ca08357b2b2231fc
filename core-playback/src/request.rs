//! # Play Requests
//!
//! A [`PlayRequest`] is the completion handle returned for every submission.
//! It settles exactly once: the first call among `resolve_started`,
//! `resolve_failed`, `cancel`, or the channel's internal supersede wins, and
//! every later call is a no-op that returns `false`.
//!
//! ```rust,no_run
//! use core_playback::{PlayOutcome, PlayRequest};
//!
//! # async fn example(request: PlayRequest) {
//! match request.wait().await {
//!     PlayOutcome::Started => println!("playing"),
//!     PlayOutcome::Superseded => println!("a newer request won"),
//!     PlayOutcome::Cancelled => println!("caller gave up"),
//!     PlayOutcome::Failed(err) => println!("backend failed: {err}"),
//! }
//! # }
//! ```

use crate::error::PlaybackError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Terminal state of a play request.
#[derive(Debug, Clone)]
pub enum PlayOutcome {
    /// The backend accepted the start instruction.
    Started,
    /// The start was attempted and failed.
    Failed(Arc<PlaybackError>),
    /// Discarded without playing because a newer request arrived first.
    Superseded,
    /// Cancelled by the caller before it settled.
    Cancelled,
}

impl PlayOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, PlayOutcome::Started)
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, PlayOutcome::Superseded)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PlayOutcome::Cancelled)
    }

    /// The error carried by a [`PlayOutcome::Failed`] outcome.
    pub fn error(&self) -> Option<&PlaybackError> {
        match self {
            PlayOutcome::Failed(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Completion handle for one play attempt.
///
/// Cloning yields another handle to the same request.
#[derive(Clone)]
pub struct PlayRequest {
    outcome: Arc<watch::Sender<Option<PlayOutcome>>>,
}

impl PlayRequest {
    pub fn new() -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            outcome: Arc::new(outcome),
        }
    }

    /// Returns `true` once the request has settled.
    pub fn is_resolved(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// Current outcome, if settled.
    pub fn outcome(&self) -> Option<PlayOutcome> {
        self.outcome.borrow().clone()
    }

    /// Settle as started. Returns `false` if already settled.
    pub fn resolve_started(&self) -> bool {
        self.settle(PlayOutcome::Started)
    }

    /// Settle as failed. Returns `false` if already settled.
    pub fn resolve_failed(&self, error: PlaybackError) -> bool {
        self.settle(PlayOutcome::Failed(Arc::new(error)))
    }

    /// Cancel the request.
    ///
    /// A request cancelled while still queued is never started. Returns
    /// `false` if the request had already settled, in which case the existing
    /// outcome is kept.
    pub fn cancel(&self) -> bool {
        self.settle(PlayOutcome::Cancelled)
    }

    pub(crate) fn supersede(&self) -> bool {
        self.settle(PlayOutcome::Superseded)
    }

    fn settle(&self, outcome: PlayOutcome) -> bool {
        self.outcome.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(outcome);
            true
        })
    }

    /// Wait until the request settles.
    pub async fn wait(&self) -> PlayOutcome {
        let mut rx = self.outcome.subscribe();
        loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                return outcome;
            }
            // The sender lives as long as `self`, so `changed` cannot observe a
            // closed channel here.
            if rx.changed().await.is_err() {
                return PlayOutcome::Cancelled;
            }
        }
    }
}

impl Default for PlayRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PlayRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayRequest")
            .field("outcome", &*self.outcome.borrow())
            .finish()
    }
}

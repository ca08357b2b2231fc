//! # Event Bus System
//!
//! Broadcasts media channel activity using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **ChannelEvent**: what happened to a queued play request
//! - **EventBus**: broadcast sender owned by a channel
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! Events are purely observational. The channel never waits on subscribers,
//! and emitting with no subscribers is not an error for the channel.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{ChannelEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(ChannelEvent::Admitted { channel: "voice".into(), entry: 1, queued: 1 }).ok();
//! assert_eq!(rx.recv().await.unwrap().entry(), 1);
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; keep reading.
//! - **`RecvError::Closed`**: the channel was dropped; stop reading.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

// ============================================================================
// Channel Events
// ============================================================================

/// Lifecycle events for entries of a media channel.
///
/// `entry` is the channel-assigned sequence number of the request, `channel`
/// the label from the channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ChannelEvent {
    /// A request joined the queue.
    Admitted {
        channel: String,
        entry: u64,
        /// Queue length after admission, head included.
        queued: usize,
    },
    /// The resource was told to start.
    StartIssued { channel: String, entry: u64 },
    /// The resource failed to start.
    StartFailed {
        channel: String,
        entry: u64,
        message: String,
    },
    /// The head was asked to pause so a successor can run.
    PauseRequested { channel: String, entry: u64 },
    /// The head paused and left the queue.
    Retired {
        channel: String,
        entry: u64,
        released: bool,
    },
    /// A pending request was discarded because a newer one arrived.
    Superseded {
        channel: String,
        entry: u64,
        released: bool,
    },
    /// A request cancelled by its caller was dropped before starting.
    Dropped { channel: String, entry: u64 },
    /// The channel detected an inconsistent backend or scheduling state.
    Fault {
        channel: String,
        entry: u64,
        message: String,
    },
}

impl ChannelEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &'static str {
        match self {
            ChannelEvent::Admitted { .. } => "Request admitted",
            ChannelEvent::StartIssued { .. } => "Start issued",
            ChannelEvent::StartFailed { .. } => "Start failed",
            ChannelEvent::PauseRequested { .. } => "Pause requested",
            ChannelEvent::Retired { .. } => "Head retired",
            ChannelEvent::Superseded { .. } => "Request superseded",
            ChannelEvent::Dropped { .. } => "Cancelled request dropped",
            ChannelEvent::Fault { .. } => "Channel fault",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            ChannelEvent::Fault { .. } => EventSeverity::Error,
            ChannelEvent::StartFailed { .. } => EventSeverity::Warning,
            ChannelEvent::StartIssued { .. } | ChannelEvent::Retired { .. } => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Sequence number of the entry the event refers to.
    pub fn entry(&self) -> u64 {
        match self {
            ChannelEvent::Admitted { entry, .. }
            | ChannelEvent::StartIssued { entry, .. }
            | ChannelEvent::StartFailed { entry, .. }
            | ChannelEvent::PauseRequested { entry, .. }
            | ChannelEvent::Retired { entry, .. }
            | ChannelEvent::Superseded { entry, .. }
            | ChannelEvent::Dropped { entry, .. }
            | ChannelEvent::Fault { entry, .. } => *entry,
        }
    }
}

impl fmt::Display for ChannelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (entry {})", self.description(), self.entry())
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast sender for [`ChannelEvent`]s.
///
/// Slow subscribers receive `RecvError::Lagged` instead of blocking the
/// channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChannelEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, like `tokio::sync::broadcast::channel`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: ChannelEvent) -> Result<usize, SendError<ChannelEvent>> {
        self.sender.send(event)
    }

    /// Publishes the event produced by `build`, skipping construction when
    /// nobody is subscribed.
    ///
    /// Returns `true` if at least one subscriber received the event.
    pub fn emit_with<F>(&self, build: F) -> bool
    where
        F: FnOnce() -> ChannelEvent,
    {
        if self.sender.receiver_count() == 0 {
            return false;
        }
        self.sender.send(build()).is_ok()
    }

    /// Creates a new receiver for all future events.
    pub fn subscribe(&self) -> Receiver<ChannelEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream
// ============================================================================

type EventFilter = Box<dyn Fn(&ChannelEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{ChannelEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let faults = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, ChannelEvent::Fault { .. }));
/// ```
pub struct EventStream {
    receiver: Receiver<ChannelEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<ChannelEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ChannelEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &ChannelEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<ChannelEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<ChannelEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

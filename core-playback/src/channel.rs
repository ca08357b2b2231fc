//! # Media Channel
//!
//! Serializes play requests against one shared playback slot.
//!
//! ## Overview
//!
//! A [`Channel`] keeps a queue of requests. Only the head of the queue is ever
//! started. When a new request arrives behind it, the head is asked to pause
//! and the successor is started only after the head reports
//! [`MediaState::Paused`]. Requests that pile up behind the head in the
//! meantime are coalesced: once the head retires, only the newest pending
//! request plays and the ones in between settle as
//! [`PlayOutcome::Superseded`](crate::PlayOutcome::Superseded).
//!
//! ```text
//! Paused ──submit──> PlayPending ──backend──> Playing
//!                        │                       │
//!                        └──successor──> PausePending <──successor──┘
//!                                            │
//!                                         backend
//!                                            v
//!                                  Paused (head retires)
//! ```
//!
//! ## Threading Model
//!
//! Every state change runs on the [`SerialExecutor`]. Submissions and backend
//! notifications are turned into [`Signal`]s; a signal raised on the serial
//! context while no signal is being handled runs inline, anything else is
//! scheduled. Start futures run on the Tokio runtime captured at construction.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ThreadSerialExecutor;
//! use core_playback::Channel;
//! use std::sync::Arc;
//!
//! let executor = Arc::new(ThreadSerialExecutor::new()?);
//! let channel = Channel::new(executor)?;
//!
//! let request = channel.play(clip)?;
//! let outcome = request.wait().await;
//! ```

use crate::config::ChannelConfig;
use crate::error::{PlaybackError, Result};
use crate::request::PlayRequest;
use bridge_traits::{MediaState, PlayableResource, SerialExecutor, StateListener, SubscriptionId};
use core_runtime::events::{ChannelEvent, EventBus, Receiver};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::{debug, error, trace, warn};

/// Channel-assigned sequence number of a queued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl EntryId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of the resource at the head of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Paused,
    Playing,
    /// Pause requested, backend has not confirmed yet.
    PausePending,
    /// Start issued, backend has not confirmed yet.
    PlayPending,
}

/// Point-in-time view of a channel, safe to read from any thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSnapshot {
    /// Entries in the queue, head included.
    pub queued: usize,
    /// State of the head, `None` when the queue is empty.
    pub head_state: Option<ResourceState>,
}

/// One pending or active play request.
struct QueueEntry {
    id: EntryId,
    resource: Arc<dyn PlayableResource>,
    completion: Option<PlayRequest>,
    auto_release: bool,
    subscription: Option<SubscriptionId>,
}

impl QueueEntry {
    /// Whether the caller cancelled the request before it was started.
    fn is_cancelled(&self) -> bool {
        self.completion
            .as_ref()
            .and_then(PlayRequest::outcome)
            .map_or(false, |outcome| outcome.is_cancelled())
    }

    fn release_if_requested(&self) -> bool {
        if self.auto_release {
            self.resource.release();
        }
        self.auto_release
    }
}

/// Work items for the serial context.
enum Signal {
    Submit(QueueEntry),
    StateChanged { entry: EntryId, state: MediaState },
    StartFailed { entry: EntryId },
}

struct ChannelState {
    queue: VecDeque<QueueEntry>,
    resource_state: ResourceState,
}

impl ChannelState {
    fn head_id(&self) -> Option<EntryId> {
        self.queue.front().map(|entry| entry.id)
    }

    fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            queued: self.queue.len(),
            head_state: (!self.queue.is_empty()).then_some(self.resource_state),
        }
    }
}

struct ChannelInner {
    config: ChannelConfig,
    executor: Arc<dyn SerialExecutor>,
    runtime: Handle,
    events: EventBus,
    next_entry: AtomicU64,
    // Only locked on the serial context.
    state: Mutex<ChannelState>,
    snapshot: Mutex<ChannelSnapshot>,
}

/// Serializing scheduler over one shared playback resource.
///
/// Cloning a `Channel` yields another handle to the same queue.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

impl Channel {
    /// Create a channel with the default configuration.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(executor: Arc<dyn SerialExecutor>) -> Result<Self> {
        Self::with_config(executor, ChannelConfig::default())
    }

    /// Create a channel with a custom configuration.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_config(executor: Arc<dyn SerialExecutor>, config: ChannelConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| PlaybackError::RuntimeUnavailable(e.to_string()))?;
        Self::with_runtime(executor, config, runtime)
    }

    /// Create a channel that drives start operations on `runtime`.
    pub fn with_runtime(
        executor: Arc<dyn SerialExecutor>,
        config: ChannelConfig,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;
        let events = EventBus::new(config.event_buffer_size);

        Ok(Self {
            inner: Arc::new(ChannelInner {
                config,
                executor,
                runtime,
                events,
                next_entry: AtomicU64::new(1),
                state: Mutex::new(ChannelState {
                    queue: VecDeque::new(),
                    resource_state: ResourceState::Paused,
                }),
                snapshot: Mutex::new(ChannelSnapshot::default()),
            }),
        })
    }

    /// Play `resource`, releasing it afterwards if the configuration says so.
    pub fn play(&self, resource: Arc<dyn PlayableResource>) -> Result<PlayRequest> {
        let auto_release = self.inner.config.auto_release_by_default;
        self.submit(resource, auto_release)
    }

    /// Queue `resource` for playback.
    ///
    /// Returns immediately; the request settles later. When `auto_release` is
    /// set the channel calls `release()` on the resource once it leaves the
    /// queue, whether it played or was superseded.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::AlreadyActive`] if the resource reports itself as
    ///   playing.
    /// - [`PlaybackError::Executor`] if the serial executor has shut down.
    pub fn submit(
        &self,
        resource: Arc<dyn PlayableResource>,
        auto_release: bool,
    ) -> Result<PlayRequest> {
        self.submit_with_request(PlayRequest::new(), resource, auto_release)
    }

    /// Queue `resource` using a caller-provided completion handle.
    pub fn submit_with_request(
        &self,
        request: PlayRequest,
        resource: Arc<dyn PlayableResource>,
        auto_release: bool,
    ) -> Result<PlayRequest> {
        if resource.is_active() {
            return Err(PlaybackError::AlreadyActive);
        }

        let id = self.inner.next_entry_id();
        debug!(
            channel = %self.inner.config.label,
            entry = %id,
            auto_release,
            "Submitting play request"
        );

        let entry = QueueEntry {
            id,
            resource,
            completion: Some(request.clone()),
            auto_release,
            subscription: None,
        };

        if let Err(err) = self.inner.dispatch(Signal::Submit(entry)) {
            request.cancel();
            return Err(err);
        }
        Ok(request)
    }

    /// Current queue length and head state.
    pub fn snapshot(&self) -> ChannelSnapshot {
        *self.inner.snapshot.lock()
    }

    /// Number of entries in the queue, head included.
    pub fn len(&self) -> usize {
        self.snapshot().queued
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// State of the head entry, if any.
    pub fn head_state(&self) -> Option<ResourceState> {
        self.snapshot().head_state
    }

    /// Subscribe to channel lifecycle events.
    pub fn subscribe_events(&self) -> Receiver<ChannelEvent> {
        self.inner.events.subscribe()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("label", &self.inner.config.label)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl ChannelInner {
    fn next_entry_id(&self) -> EntryId {
        EntryId(self.next_entry.fetch_add(1, Ordering::Relaxed))
    }

    /// Publish the event built by `build`, given the channel label.
    fn emit(&self, build: impl FnOnce(String) -> ChannelEvent) {
        // No subscribers is the common case.
        self.events.emit_with(|| build(self.config.label.clone()));
    }

    /// Run `signal` on the serial context.
    fn dispatch(self: &Arc<Self>, signal: Signal) -> Result<()> {
        if self.executor.is_current_context() {
            if let Some(mut state) = self.state.try_lock() {
                self.handle(&mut state, signal);
                return Ok(());
            }
        }

        let inner = Arc::clone(self);
        self.executor
            .schedule_later(Box::new(move || {
                let mut state = inner.state.lock();
                inner.handle(&mut state, signal);
            }))
            .map_err(PlaybackError::Executor)
    }

    fn handle(self: &Arc<Self>, state: &mut ChannelState, signal: Signal) {
        match signal {
            Signal::Submit(entry) => self.admit(state, entry),
            Signal::StateChanged {
                entry,
                state: media_state,
            } => self.on_state_change(state, entry, media_state),
            Signal::StartFailed { entry } => {
                if state.head_id() != Some(entry) {
                    return;
                }
                if matches!(
                    state.resource_state,
                    ResourceState::PlayPending | ResourceState::PausePending
                ) {
                    debug!(channel = %self.config.label, entry = %entry, "Failed start leaves head paused");
                    state.resource_state = ResourceState::Paused;
                    self.advance(state);
                }
            }
        }
        *self.snapshot.lock() = state.snapshot();
    }

    fn admit(self: &Arc<Self>, state: &mut ChannelState, entry: QueueEntry) {
        if entry.resource.is_active() {
            warn!(channel = %self.config.label, entry = %entry.id, "Resource became active before admission");
            if let Some(completion) = &entry.completion {
                completion.resolve_failed(PlaybackError::AlreadyActive);
            }
            return;
        }

        if entry.is_cancelled() {
            self.drop_cancelled(entry);
            return;
        }

        state.queue.push_back(entry);
        let queued = state.queue.len();
        if let Some(admitted) = state.queue.back() {
            trace!(channel = %self.config.label, entry = %admitted.id, queued, "Admitted");
            self.emit(|channel| ChannelEvent::Admitted {
                channel,
                entry: admitted.id.as_u64(),
                queued,
            });
        }

        if queued == 1 {
            self.activate_head(state);
        } else {
            self.advance(state);
        }
    }

    fn on_state_change(self: &Arc<Self>, state: &mut ChannelState, entry: EntryId, media_state: MediaState) {
        if state.head_id() != Some(entry) {
            trace!(channel = %self.config.label, entry = %entry, state = ?media_state, "Ignoring notification from retired entry");
            return;
        }

        state.resource_state = match media_state {
            MediaState::Paused => ResourceState::Paused,
            MediaState::Playing => ResourceState::Playing,
            MediaState::Preparing | MediaState::Buffering => return,
        };
        trace!(channel = %self.config.label, entry = %entry, state = ?state.resource_state, "Head state changed");
        self.advance(state);
    }

    /// Move the queue forward if a successor is waiting behind the head.
    fn advance(self: &Arc<Self>, state: &mut ChannelState) {
        if state.queue.len() <= 1 {
            return;
        }

        match state.resource_state {
            ResourceState::Paused => self.retire_head(state),
            ResourceState::PausePending => {}
            ResourceState::PlayPending | ResourceState::Playing => {
                if let Some(head) = state.queue.front() {
                    debug!(channel = %self.config.label, entry = %head.id, "Pausing head for successor");
                    head.resource.request_pause();
                    self.emit(|channel| ChannelEvent::PauseRequested {
                        channel,
                        entry: head.id.as_u64(),
                    });
                }
                state.resource_state = ResourceState::PausePending;
            }
        }
    }

    fn retire_head(self: &Arc<Self>, state: &mut ChannelState) {
        let Some(head) = state.queue.pop_front() else {
            return;
        };
        if let Some(subscription) = head.subscription {
            head.resource.unsubscribe(subscription);
        }
        let released = head.release_if_requested();
        debug!(channel = %self.config.label, entry = %head.id, released, "Head retired");
        self.emit(|channel| ChannelEvent::Retired {
            channel,
            entry: head.id.as_u64(),
            released,
        });

        // Only the newest pending request survives.
        while state.queue.len() > 1 {
            if let Some(skipped) = state.queue.pop_front() {
                self.supersede(skipped);
            }
        }

        state.resource_state = ResourceState::Paused;
        if state.queue.front().map_or(false, QueueEntry::is_cancelled) {
            if let Some(cancelled) = state.queue.pop_front() {
                self.drop_cancelled(cancelled);
            }
            return;
        }

        self.activate_head(state);
    }

    fn supersede(&self, entry: QueueEntry) {
        let superseded = entry
            .completion
            .as_ref()
            .map_or(true, PlayRequest::supersede);
        if !superseded {
            // Settled by the caller while it waited behind the head.
            self.drop_cancelled(entry);
            return;
        }
        let released = entry.release_if_requested();
        debug!(channel = %self.config.label, entry = %entry.id, released, "Request superseded");
        self.emit(|channel| ChannelEvent::Superseded {
            channel,
            entry: entry.id.as_u64(),
            released,
        });
    }

    fn drop_cancelled(&self, entry: QueueEntry) {
        let released = entry.release_if_requested();
        debug!(channel = %self.config.label, entry = %entry.id, released, "Dropping cancelled request");
        self.emit(|channel| ChannelEvent::Dropped {
            channel,
            entry: entry.id.as_u64(),
        });
    }

    /// Subscribe to the head and start it.
    fn activate_head(self: &Arc<Self>, state: &mut ChannelState) {
        let Some(head) = state.queue.front_mut() else {
            return;
        };

        let listener = self.listener_for(head.id);
        head.subscription = Some(head.resource.subscribe(listener));

        if head.resource.is_active() {
            let message = format!("entry {} is already playing when promoted to head", head.id);
            error!(channel = %self.config.label, entry = %head.id, "{}", message);
            self.emit(|channel| ChannelEvent::Fault {
                channel,
                entry: head.id.as_u64(),
                message: message.clone(),
            });
            if let Some(completion) = &head.completion {
                completion.resolve_failed(PlaybackError::InvariantViolation(message));
            }
            // The backend says it is playing; a later successor will pause it.
            state.resource_state = ResourceState::Playing;
            return;
        }

        state.resource_state = ResourceState::PlayPending;
        self.issue_start(head);
    }

    fn issue_start(self: &Arc<Self>, entry: &QueueEntry) {
        let id = entry.id;
        let resource = Arc::clone(&entry.resource);
        let completion = entry.completion.clone();
        let channel = Arc::downgrade(self);

        debug!(channel = %self.config.label, entry = %id, "Starting head");
        self.emit(|channel| ChannelEvent::StartIssued {
            channel,
            entry: id.as_u64(),
        });

        self.runtime.spawn(async move {
            match resource.start().await {
                Ok(()) => {
                    if let Some(completion) = completion {
                        completion.resolve_started();
                    }
                }
                Err(err) => {
                    warn!(entry = %id, error = %err, "Resource failed to start");
                    if let Some(channel) = channel.upgrade() {
                        channel.emit(|label| ChannelEvent::StartFailed {
                            channel: label,
                            entry: id.as_u64(),
                            message: err.to_string(),
                        });
                        if let Err(dispatch_err) = channel.dispatch(Signal::StartFailed { entry: id }) {
                            warn!(entry = %id, error = %dispatch_err, "Could not report failed start");
                        }
                    }
                    if let Some(completion) = completion {
                        completion.resolve_failed(PlaybackError::Backend(err));
                    }
                }
            }
        });
    }

    fn listener_for(self: &Arc<Self>, entry: EntryId) -> StateListener {
        let channel: Weak<ChannelInner> = Arc::downgrade(self);
        Arc::new(move |media_state: MediaState| {
            if !media_state.is_settled() {
                return;
            }
            let Some(channel) = channel.upgrade() else {
                return;
            };
            if let Err(err) = channel.dispatch(Signal::StateChanged {
                entry,
                state: media_state,
            }) {
                warn!(entry = %entry, error = %err, "Dropped state notification");
            }
        })
    }
}

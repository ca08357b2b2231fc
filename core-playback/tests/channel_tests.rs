//! Integration tests for the media channel
//!
//! This test suite verifies:
//! - Only one resource is ever instructed to play at a time
//! - A successor starts only after its predecessor confirmed the pause
//! - Requests queued during a pause are coalesced to the newest one
//! - Every request settles exactly once
//! - Auto-release happens exactly once per entry
//!
//! Mock resources record every instruction into a shared journal so that
//! ordering can be checked after the fact.

use async_trait::async_trait;
use bridge_desktop::ThreadSerialExecutor;
use bridge_traits::{
    BridgeError, MediaState, PlayableResource, SerialExecutor, StateListener, SubscriptionId,
};
use core_playback::{
    Channel, ChannelConfig, PlayOutcome, PlayRequest, PlaybackError, ResourceState,
};
use core_runtime::events::{ChannelEvent, Receiver};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Journal
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Start(&'static str),
    /// The backend confirmed the start.
    Playing(&'static str),
    Pause(&'static str),
    Paused(&'static str),
    Release(&'static str),
}

#[derive(Default)]
struct Journal {
    calls: Mutex<Vec<Call>>,
    playing: Mutex<Option<&'static str>>,
    overlaps: Mutex<Vec<(&'static str, &'static str)>>,
}

impl Journal {
    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn starts(&self) -> Vec<&'static str> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Start(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    fn count(&self, call: Call) -> usize {
        self.calls().into_iter().filter(|c| *c == call).count()
    }

    fn position(&self, call: Call) -> Option<usize> {
        self.calls().into_iter().position(|c| c == call)
    }

    fn began(&self, name: &'static str) {
        let mut playing = self.playing.lock();
        if let Some(other) = *playing {
            if other != name {
                self.overlaps.lock().push((other, name));
            }
        }
        *playing = Some(name);
    }

    fn ended(&self, name: &'static str) {
        let mut playing = self.playing.lock();
        if *playing == Some(name) {
            *playing = None;
        }
    }

    fn overlaps(&self) -> Vec<(&'static str, &'static str)> {
        self.overlaps.lock().clone()
    }
}

// ============================================================================
// Mock Resource
// ============================================================================

struct MockResource {
    name: &'static str,
    journal: Arc<Journal>,
    active: AtomicBool,
    fail_start: bool,
    /// Pause only when the test calls `confirm_pause`.
    manual_pause: bool,
    /// Keep notifying listeners after `unsubscribe`.
    leaky: bool,
    start_delay: Duration,
    /// Pause asked for before the start was confirmed.
    pause_deferred: AtomicBool,
    listeners: Mutex<HashMap<SubscriptionId, StateListener>>,
    releases: AtomicUsize,
}

impl MockResource {
    fn base(name: &'static str, journal: &Arc<Journal>) -> Self {
        Self {
            name,
            journal: Arc::clone(journal),
            active: AtomicBool::new(false),
            fail_start: false,
            manual_pause: false,
            leaky: false,
            start_delay: Duration::ZERO,
            pause_deferred: AtomicBool::new(false),
            listeners: Mutex::new(HashMap::new()),
            releases: AtomicUsize::new(0),
        }
    }

    /// Confirms pauses synchronously from inside `request_pause`.
    fn immediate(name: &'static str, journal: &Arc<Journal>) -> Arc<Self> {
        Arc::new(Self::base(name, journal))
    }

    fn manual(name: &'static str, journal: &Arc<Journal>) -> Arc<Self> {
        Arc::new(Self {
            manual_pause: true,
            ..Self::base(name, journal)
        })
    }

    fn failing(name: &'static str, journal: &Arc<Journal>) -> Arc<Self> {
        Arc::new(Self {
            fail_start: true,
            ..Self::base(name, journal)
        })
    }

    fn leaky_manual(name: &'static str, journal: &Arc<Journal>) -> Arc<Self> {
        Arc::new(Self {
            manual_pause: true,
            leaky: true,
            ..Self::base(name, journal)
        })
    }

    /// Manual pause, with a start that takes a while to be confirmed.
    fn slow_manual(name: &'static str, journal: &Arc<Journal>) -> Arc<Self> {
        Arc::new(Self {
            manual_pause: true,
            start_delay: Duration::from_millis(50),
            ..Self::base(name, journal)
        })
    }

    fn emit(&self, state: MediaState) {
        let listeners: Vec<StateListener> = self.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener(state);
        }
    }

    fn confirm_pause(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.journal.ended(self.name);
        self.journal.record(Call::Paused(self.name));
        self.emit(MediaState::Paused);
    }

    fn force_active(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayableResource for MockResource {
    async fn start(&self) -> bridge_traits::Result<()> {
        self.journal.record(Call::Start(self.name));
        if self.fail_start {
            return Err(BridgeError::OperationFailed("device busy".into()));
        }
        self.emit(MediaState::Preparing);
        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }
        self.journal.began(self.name);
        self.active.store(true, Ordering::SeqCst);
        self.journal.record(Call::Playing(self.name));
        self.emit(MediaState::Playing);
        if self.pause_deferred.swap(false, Ordering::SeqCst) {
            self.confirm_pause();
        }
        Ok(())
    }

    fn request_pause(&self) {
        self.journal.record(Call::Pause(self.name));
        if self.manual_pause {
            return;
        }
        // A backend still preparing pauses once the start lands.
        if self.is_active() {
            self.confirm_pause();
        } else {
            self.pause_deferred.store(true, Ordering::SeqCst);
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.journal.record(Call::Release(self.name));
    }

    fn subscribe(&self, listener: StateListener) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.listeners.lock().insert(id, listener);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if !self.leaky {
            self.listeners.lock().remove(&id);
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    executor: Arc<ThreadSerialExecutor>,
    channel: Channel,
    journal: Arc<Journal>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(ChannelConfig::new("test"))
    }

    fn with_config(config: ChannelConfig) -> Self {
        let executor = Arc::new(ThreadSerialExecutor::with_name("channel-test").unwrap());
        let serial: Arc<dyn SerialExecutor> = executor.clone();
        let channel = Channel::with_config(serial, config).unwrap();
        Self {
            executor,
            channel,
            journal: Arc::new(Journal::default()),
        }
    }

    /// Let the serial context drain, including signals raised while draining.
    async fn settle(&self) {
        for _ in 0..4 {
            self.executor.barrier().await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn submit(&self, resource: &Arc<MockResource>, auto_release: bool) -> PlayRequest {
        let resource: Arc<dyn PlayableResource> = resource.clone();
        self.channel.submit(resource, auto_release).unwrap()
    }
}

async fn outcome(request: &PlayRequest) -> PlayOutcome {
    tokio::time::timeout(Duration::from_secs(2), request.wait())
        .await
        .expect("request did not settle")
}

fn drain(events: &mut Receiver<ChannelEvent>) -> Vec<ChannelEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

// ============================================================================
// Admission
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn first_request_starts_immediately() {
    let h = Harness::new();
    let a = MockResource::manual("a", &h.journal);

    let ra = h.submit(&a, false);
    assert!(outcome(&ra).await.is_started());
    h.settle().await;

    assert_eq!(h.journal.calls(), vec![Call::Start("a"), Call::Playing("a")]);
    assert_eq!(h.channel.len(), 1);
    assert_eq!(h.channel.head_state(), Some(ResourceState::Playing));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejects_resource_that_is_already_playing() {
    let h = Harness::new();
    let a = MockResource::manual("a", &h.journal);
    a.force_active();

    let resource: Arc<dyn PlayableResource> = a.clone();
    let result = h.channel.submit(resource, true);

    assert!(matches!(result, Err(PlaybackError::AlreadyActive)));
    h.settle().await;
    assert!(h.channel.is_empty());
    assert_eq!(a.releases(), 0);
    assert!(h.journal.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn submission_on_serial_context_is_admitted_inline() {
    let h = Harness::new();
    let a = MockResource::manual("a", &h.journal);
    let (tx, rx) = tokio::sync::oneshot::channel();

    let channel = h.channel.clone();
    let resource: Arc<dyn PlayableResource> = a.clone();
    h.executor
        .schedule_later(Box::new(move || {
            let request = channel.submit(resource, false).unwrap();
            let _ = tx.send((request, channel.len()));
        }))
        .unwrap();

    let (request, queued_inside) = rx.await.unwrap();
    assert_eq!(queued_inside, 1);
    assert!(outcome(&request).await.is_started());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn request_cancelled_before_admission_is_dropped() {
    let h = Harness::new();
    let a = MockResource::manual("a", &h.journal);

    let request = PlayRequest::new();
    request.cancel();
    let resource: Arc<dyn PlayableResource> = a.clone();
    h.channel
        .submit_with_request(request.clone(), resource, true)
        .unwrap();
    h.settle().await;

    assert!(outcome(&request).await.is_cancelled());
    assert!(h.journal.starts().is_empty());
    assert!(h.channel.is_empty());
    assert_eq!(a.releases(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn submit_after_executor_shutdown_fails() {
    let h = Harness::new();
    let a = MockResource::manual("a", &h.journal);
    h.executor.shutdown();

    let request = PlayRequest::new();
    let resource: Arc<dyn PlayableResource> = a.clone();
    let result = h
        .channel
        .submit_with_request(request.clone(), resource, false);

    assert!(matches!(result, Err(PlaybackError::Executor(_))));
    assert!(request.outcome().unwrap().is_cancelled());
}

#[test]
fn channel_requires_a_runtime() {
    let executor: Arc<dyn SerialExecutor> = Arc::new(ThreadSerialExecutor::new().unwrap());
    let result = Channel::new(executor);
    assert!(matches!(result, Err(PlaybackError::RuntimeUnavailable(_))));
}

#[tokio::test]
async fn channel_rejects_invalid_config() {
    let executor: Arc<dyn SerialExecutor> = Arc::new(ThreadSerialExecutor::new().unwrap());
    let config = ChannelConfig::new("test").with_event_buffer_size(0);
    let result = Channel::with_config(executor, config);
    assert!(matches!(result, Err(PlaybackError::InvalidConfig(_))));
}

// ============================================================================
// Hand-over
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn successor_waits_for_pause_confirmation() {
    let h = Harness::new();
    let a = MockResource::manual("a", &h.journal);
    let b = MockResource::manual("b", &h.journal);

    let ra = h.submit(&a, false);
    assert!(outcome(&ra).await.is_started());
    h.settle().await;

    let rb = h.submit(&b, false);
    h.settle().await;

    assert_eq!(
        h.journal.calls(),
        vec![Call::Start("a"), Call::Playing("a"), Call::Pause("a")]
    );
    assert!(!rb.is_resolved());
    assert_eq!(h.channel.head_state(), Some(ResourceState::PausePending));
    assert_eq!(h.channel.len(), 2);

    a.confirm_pause();
    assert!(outcome(&rb).await.is_started());

    assert_eq!(
        h.journal.calls(),
        vec![
            Call::Start("a"),
            Call::Playing("a"),
            Call::Pause("a"),
            Call::Paused("a"),
            Call::Start("b"),
            Call::Playing("b"),
        ]
    );
    assert!(h.journal.overlaps().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn synchronous_pause_confirmation_hands_over() {
    let h = Harness::new();
    let a = MockResource::immediate("a", &h.journal);
    let b = MockResource::immediate("b", &h.journal);

    let ra = h.submit(&a, false);
    assert!(outcome(&ra).await.is_started());
    h.settle().await;

    let rb = h.submit(&b, false);
    assert!(outcome(&rb).await.is_started());

    let paused_a = h.journal.position(Call::Paused("a")).unwrap();
    let start_b = h.journal.position(Call::Start("b")).unwrap();
    assert!(paused_a < start_b);
    assert!(h.journal.overlaps().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn coalesces_requests_queued_during_pause() {
    let h = Harness::new();
    let a = MockResource::manual("a", &h.journal);
    let b = MockResource::manual("b", &h.journal);
    let c = MockResource::manual("c", &h.journal);

    let ra = h.submit(&a, false);
    assert!(outcome(&ra).await.is_started());
    h.settle().await;

    let rb = h.submit(&b, false);
    let rc = h.submit(&c, false);
    h.settle().await;

    // One pause instruction is enough for any number of successors.
    assert_eq!(h.journal.count(Call::Pause("a")), 1);
    assert!(h.journal.position(Call::Start("c")).is_none());

    a.confirm_pause();

    assert!(outcome(&rb).await.is_superseded());
    assert!(outcome(&rc).await.is_started());
    assert!(ra.outcome().unwrap().is_started());

    assert_eq!(h.journal.starts(), vec!["a", "c"]);
    assert!(h.journal.position(Call::Paused("a")) < h.journal.position(Call::Start("c")));
    assert!(h.journal.overlaps().is_empty());

    h.settle().await;
    assert_eq!(h.channel.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn back_to_back_requests_pause_a_head_that_is_still_starting() {
    let h = Harness::new();
    let a = MockResource::slow_manual("a", &h.journal);
    let b = MockResource::manual("b", &h.journal);
    let c = MockResource::manual("c", &h.journal);

    let ra = h.submit(&a, true);
    let rb = h.submit(&b, true);
    let rc = h.submit(&c, true);

    assert!(outcome(&ra).await.is_started());
    h.settle().await;

    // Paused while pending, then paused again once `Playing` arrived.
    assert!(h.journal.position(Call::Pause("a")) < h.journal.position(Call::Playing("a")));
    assert_eq!(h.journal.count(Call::Pause("a")), 2);
    assert_eq!(h.channel.head_state(), Some(ResourceState::PausePending));
    assert!(!rb.is_resolved());
    assert!(!rc.is_resolved());

    a.confirm_pause();

    assert!(outcome(&rb).await.is_superseded());
    assert!(outcome(&rc).await.is_started());
    h.settle().await;

    assert_eq!(h.journal.starts(), vec!["a", "c"]);
    assert!(h.journal.position(Call::Paused("a")) < h.journal.position(Call::Start("c")));
    assert_eq!((a.releases(), b.releases(), c.releases()), (1, 1, 0));
    assert!(h.journal.overlaps().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn burst_of_requests_keeps_playback_exclusive() {
    const NAMES: [&str; 24] = [
        "r00", "r01", "r02", "r03", "r04", "r05", "r06", "r07", "r08", "r09", "r10", "r11",
        "r12", "r13", "r14", "r15", "r16", "r17", "r18", "r19", "r20", "r21", "r22", "r23",
    ];

    let h = Harness::new();
    let resources: Vec<_> = NAMES
        .iter()
        .map(|&name| MockResource::immediate(name, &h.journal))
        .collect();

    let mut requests = Vec::new();
    for (i, resource) in resources.iter().enumerate() {
        requests.push(h.submit(resource, true));
        if i % 3 == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    let (last, earlier) = requests.split_last().unwrap();
    assert!(outcome(last).await.is_started());
    for request in earlier {
        let settled = outcome(request).await;
        assert!(settled.is_started() || settled.is_superseded());
    }
    h.settle().await;

    assert!(h.journal.overlaps().is_empty());
    let (newest, older) = resources.split_last().unwrap();
    assert_eq!(newest.releases(), 0);
    for resource in older {
        assert_eq!(resource.releases(), 1);
    }
    assert_eq!(h.channel.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_request_settles_exactly_once() {
    let h = Harness::new();
    let head = MockResource::manual("head", &h.journal);
    let rh = h.submit(&head, false);
    assert!(outcome(&rh).await.is_started());
    h.settle().await;

    const NAMES: [&str; 8] = ["p0", "p1", "p2", "p3", "p4", "p5", "p6", "p7"];
    let pending: Vec<_> = NAMES
        .iter()
        .map(|&name| MockResource::manual(name, &h.journal))
        .collect();
    let requests: Vec<_> = pending.iter().map(|r| h.submit(r, false)).collect();
    h.settle().await;

    head.confirm_pause();

    let (last, superseded) = requests.split_last().unwrap();
    assert!(outcome(last).await.is_started());
    for request in superseded {
        assert!(outcome(request).await.is_superseded());
        // A settled request keeps its first outcome.
        assert!(!request.resolve_started());
        assert!(request.outcome().unwrap().is_superseded());
    }

    assert_eq!(h.journal.starts(), vec!["head", "p7"]);
    assert!(h.journal.overlaps().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stale_notifications_from_retired_head_are_ignored() {
    let h = Harness::new();
    let a = MockResource::leaky_manual("a", &h.journal);
    let b = MockResource::manual("b", &h.journal);
    let c = MockResource::manual("c", &h.journal);

    let ra = h.submit(&a, false);
    assert!(outcome(&ra).await.is_started());
    h.settle().await;

    let rb = h.submit(&b, false);
    h.settle().await;
    a.confirm_pause();
    assert!(outcome(&rb).await.is_started());
    h.settle().await;

    let rc = h.submit(&c, false);
    h.settle().await;
    assert_eq!(h.channel.head_state(), Some(ResourceState::PausePending));

    // `a` still holds its old listener and reports a pause for itself.
    a.emit(MediaState::Paused);
    h.settle().await;
    assert!(h.journal.position(Call::Start("c")).is_none());
    assert!(!rc.is_resolved());

    b.confirm_pause();
    assert!(outcome(&rc).await.is_started());
    assert!(h.journal.overlaps().is_empty());
}

// ============================================================================
// Release
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn auto_release_happens_once_per_entry() {
    let h = Harness::new();
    let a = MockResource::manual("a", &h.journal);
    let b = MockResource::manual("b", &h.journal);
    let c = MockResource::immediate("c", &h.journal);
    let d = MockResource::manual("d", &h.journal);

    let ra = h.submit(&a, true);
    assert!(outcome(&ra).await.is_started());
    h.settle().await;

    let rb = h.submit(&b, true);
    let rc = h.submit(&c, true);
    h.settle().await;
    assert_eq!(a.releases(), 0);

    a.confirm_pause();
    assert!(outcome(&rb).await.is_superseded());
    assert!(outcome(&rc).await.is_started());
    h.settle().await;

    assert_eq!(a.releases(), 1);
    assert_eq!(b.releases(), 1);
    assert_eq!(c.releases(), 0);

    let rd = h.submit(&d, false);
    assert!(outcome(&rd).await.is_started());
    h.settle().await;

    assert_eq!(a.releases(), 1);
    assert_eq!(b.releases(), 1);
    assert_eq!(c.releases(), 1);
    assert_eq!(d.releases(), 0);

    // `a` is released only after it paused.
    assert!(h.journal.position(Call::Paused("a")) < h.journal.position(Call::Release("a")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn play_uses_configured_auto_release() {
    let h = Harness::with_config(ChannelConfig::new("test").with_auto_release_by_default(true));
    let a = MockResource::immediate("a", &h.journal);
    let b = MockResource::manual("b", &h.journal);

    let resource: Arc<dyn PlayableResource> = a.clone();
    let ra = h.channel.play(resource).unwrap();
    assert!(outcome(&ra).await.is_started());
    h.settle().await;

    let resource: Arc<dyn PlayableResource> = b.clone();
    let rb = h.channel.play(resource).unwrap();
    assert!(outcome(&rb).await.is_started());
    h.settle().await;

    assert_eq!(a.releases(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn nothing_is_released_without_auto_release() {
    let h = Harness::new();
    let a = MockResource::immediate("a", &h.journal);
    let b = MockResource::manual("b", &h.journal);
    let c = MockResource::manual("c", &h.journal);

    let ra = h.submit(&a, false);
    assert!(outcome(&ra).await.is_started());
    h.settle().await;

    let rb = h.submit(&b, false);
    assert!(outcome(&rb).await.is_started());
    h.settle().await;
    let rc = h.submit(&c, false);
    h.settle().await;
    b.confirm_pause();
    assert!(outcome(&rc).await.is_started());

    assert_eq!(a.releases() + b.releases() + c.releases(), 0);
}

// ============================================================================
// Cancellation and failures
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_pending_request_is_never_started() {
    let h = Harness::new();
    let a = MockResource::manual("a", &h.journal);
    let b = MockResource::manual("b", &h.journal);

    let ra = h.submit(&a, false);
    assert!(outcome(&ra).await.is_started());
    h.settle().await;

    let rb = h.submit(&b, true);
    h.settle().await;
    assert!(rb.cancel());

    a.confirm_pause();
    h.settle().await;

    assert!(outcome(&rb).await.is_cancelled());
    assert_eq!(h.journal.starts(), vec!["a"]);
    assert_eq!(b.releases(), 1);
    assert!(h.channel.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_request_behind_newer_one_is_reported_dropped() {
    let h = Harness::new();
    let mut events = h.channel.subscribe_events();
    let a = MockResource::manual("a", &h.journal);
    let b = MockResource::manual("b", &h.journal);
    let c = MockResource::manual("c", &h.journal);

    let ra = h.submit(&a, false);
    assert!(outcome(&ra).await.is_started());
    h.settle().await;

    let rb = h.submit(&b, true);
    let rc = h.submit(&c, false);
    h.settle().await;
    assert!(rb.cancel());

    a.confirm_pause();
    assert!(outcome(&rc).await.is_started());
    h.settle().await;

    assert!(rb.outcome().unwrap().is_cancelled());
    assert_eq!(b.releases(), 1);

    let events = drain(&mut events);
    assert!(events
        .iter()
        .any(|event| matches!(event, ChannelEvent::Dropped { entry: 2, .. })));
    assert!(!events
        .iter()
        .any(|event| matches!(event, ChannelEvent::Superseded { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_failure_does_not_stall_successors() {
    let h = Harness::new();
    let a = MockResource::failing("a", &h.journal);
    let b = MockResource::manual("b", &h.journal);

    let ra = h.submit(&a, false);
    let failed = outcome(&ra).await;
    assert!(matches!(failed.error(), Some(PlaybackError::Backend(_))));
    h.settle().await;
    assert_eq!(h.channel.head_state(), Some(ResourceState::Paused));

    let rb = h.submit(&b, false);
    assert!(outcome(&rb).await.is_started());

    // The failed head is retired without a pause instruction.
    assert_eq!(h.journal.count(Call::Pause("a")), 0);
    assert_eq!(h.journal.starts(), vec!["a", "b"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn promoting_an_active_resource_is_reported_as_fault() {
    let h = Harness::new();
    let mut events = h.channel.subscribe_events();
    let a = MockResource::manual("a", &h.journal);
    let b = MockResource::manual("b", &h.journal);

    let ra = h.submit(&a, false);
    assert!(outcome(&ra).await.is_started());
    h.settle().await;

    let rb = h.submit(&b, false);
    h.settle().await;
    b.force_active();
    a.confirm_pause();

    let failed = outcome(&rb).await;
    assert!(failed.error().map_or(false, PlaybackError::is_fatal));
    h.settle().await;

    assert_eq!(h.journal.starts(), vec!["a"]);
    assert_eq!(h.channel.head_state(), Some(ResourceState::Playing));
    assert!(drain(&mut events)
        .iter()
        .any(|event| matches!(event, ChannelEvent::Fault { .. })));
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn events_trace_the_request_lifecycle() {
    let h = Harness::new();
    let mut events = h.channel.subscribe_events();
    let a = MockResource::manual("a", &h.journal);
    let b = MockResource::manual("b", &h.journal);
    let c = MockResource::manual("c", &h.journal);

    let ra = h.submit(&a, true);
    assert!(outcome(&ra).await.is_started());
    h.settle().await;
    let _rb = h.submit(&b, false);
    let rc = h.submit(&c, false);
    h.settle().await;
    a.confirm_pause();
    assert!(outcome(&rc).await.is_started());
    h.settle().await;

    let events = drain(&mut events);
    let kinds: Vec<(&str, u64)> = events
        .iter()
        .map(|event| (event.description(), event.entry()))
        .collect();

    assert_eq!(
        kinds,
        vec![
            ("Request admitted", 1),
            ("Start issued", 1),
            ("Request admitted", 2),
            ("Pause requested", 1),
            ("Request admitted", 3),
            ("Head retired", 1),
            ("Request superseded", 2),
            ("Start issued", 3),
        ]
    );
}

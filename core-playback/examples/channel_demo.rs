//! # Media Channel Example
//!
//! Plays three simulated clips through one channel. The second clip is
//! requested while the first is still pausing, so it is superseded by the
//! third.
//!
//! Run with: `cargo run --example channel_demo --package core-playback`

use async_trait::async_trait;
use bridge_desktop::ThreadSerialExecutor;
use bridge_traits::{MediaState, PlayableResource, SerialExecutor, StateListener, SubscriptionId};
use core_playback::{Channel, ChannelConfig, PlayOutcome};
use core_runtime::{init_logging, events::EventStream, LogFormat, LogLevel, LoggingConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

// ============================================================================
// Simulated Clip
// ============================================================================

/// A clip whose backend takes a little while to confirm a pause.
struct SimulatedClip {
    name: String,
    active: Arc<AtomicBool>,
    listeners: Arc<Mutex<HashMap<SubscriptionId, StateListener>>>,
    pause_latency: Duration,
    // `request_pause` is called on the serial thread, outside the runtime.
    runtime: Handle,
}

impl SimulatedClip {
    fn new(name: &str, pause_latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            active: Arc::new(AtomicBool::new(false)),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            pause_latency,
            runtime: Handle::current(),
        })
    }

    fn notify(listeners: &Mutex<HashMap<SubscriptionId, StateListener>>, state: MediaState) {
        let snapshot: Vec<StateListener> = listeners.lock().values().cloned().collect();
        for listener in snapshot {
            listener(state);
        }
    }
}

#[async_trait]
impl PlayableResource for SimulatedClip {
    async fn start(&self) -> bridge_traits::Result<()> {
        info!(clip = %self.name, "Clip starting");
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.active.store(true, Ordering::SeqCst);
        Self::notify(&self.listeners, MediaState::Playing);
        Ok(())
    }

    fn request_pause(&self) {
        let active = Arc::clone(&self.active);
        let listeners = Arc::clone(&self.listeners);
        let latency = self.pause_latency;
        let name = self.name.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(latency).await;
            active.store(false, Ordering::SeqCst);
            info!(clip = %name, "Clip paused");
            Self::notify(&listeners, MediaState::Paused);
        });
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn release(&self) {
        info!(clip = %self.name, "Clip released");
    }

    fn subscribe(&self, listener: StateListener) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.listeners.lock().insert(id, listener);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().remove(&id);
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    )?;

    let executor: Arc<dyn SerialExecutor> = Arc::new(ThreadSerialExecutor::new()?);
    let config = ChannelConfig::new("demo").with_auto_release_by_default(true);
    let channel = Channel::with_config(executor, config)?;

    let mut events = EventStream::new(channel.subscribe_events());
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("  event: {event}");
        }
    });

    let intro = SimulatedClip::new("intro", Duration::from_millis(150));
    let jingle = SimulatedClip::new("jingle", Duration::from_millis(50));
    let outro = SimulatedClip::new("outro", Duration::from_millis(50));

    let first = channel.play(intro)?;
    println!("intro: {:?}", first.wait().await);

    let second = channel.play(jingle)?;
    let third = channel.play(outro)?;

    for (name, request) in [("jingle", second), ("outro", third)] {
        match request.wait().await {
            PlayOutcome::Started => println!("{name}: started"),
            PlayOutcome::Superseded => println!("{name}: superseded"),
            other => println!("{name}: {other:?}"),
        }
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("final snapshot: {:?}", channel.snapshot());

    drop(channel);
    printer.abort();
    Ok(())
}

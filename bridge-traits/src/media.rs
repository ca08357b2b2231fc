//! Playable media contracts.
//!
//! A [`PlayableResource`] is one media item owned by the host: an audio clip,
//! a video element, or a microphone capture session. The core never decodes or
//! renders anything itself; it only tells the resource when to start and when
//! to pause, and listens for the state transitions the backend reports back.
//!
//! Backends usually confirm transitions asynchronously. A `request_pause()`
//! call returns immediately and the resource later notifies its listeners with
//! [`MediaState::Paused`] once the platform has actually quiesced.

use crate::error::Result;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// State reported by a media backend.
///
/// Only [`MediaState::Paused`] and [`MediaState::Playing`] are acted upon by
/// the core. The remaining variants are transitional states that backends may
/// emit for their own observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaState {
    Paused,
    Playing,
    /// Backend is loading or opening the source.
    Preparing,
    /// Playback is running but waiting on data.
    Buffering,
}

impl MediaState {
    /// Returns `true` for the two states that end a transition.
    pub fn is_settled(&self) -> bool {
        matches!(self, MediaState::Paused | MediaState::Playing)
    }
}

/// Callback invoked by a resource whenever its state changes.
///
/// Listeners may be invoked from any thread, including synchronously from
/// within [`PlayableResource::request_pause`].
pub type StateListener = Arc<dyn Fn(MediaState) + Send + Sync>;

/// Token identifying a registered [`StateListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single media item that can be started and paused by the core.
///
/// # Contract
///
/// - `start` resolves once the backend has accepted the play instruction (or
///   failed to). It should also emit [`MediaState::Playing`] to listeners.
/// - `request_pause` is fire-and-forget; the effect is observed through a
///   [`MediaState::Paused`] notification.
/// - `is_active` reports whether the backend currently considers the item to
///   be playing.
/// - `release` frees backend handles and is expected to be idempotent.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::media::{MediaState, PlayableResource, StateListener, SubscriptionId};
///
/// struct Clip { /* native handle */ }
///
/// #[async_trait::async_trait]
/// impl PlayableResource for Clip {
///     async fn start(&self) -> bridge_traits::error::Result<()> {
///         // hand off to the platform player
///         Ok(())
///     }
///     fn request_pause(&self) {}
///     fn is_active(&self) -> bool { false }
///     fn release(&self) {}
///     fn subscribe(&self, listener: StateListener) -> SubscriptionId { SubscriptionId::new() }
///     fn unsubscribe(&self, id: SubscriptionId) {}
/// }
/// ```
#[async_trait::async_trait]
pub trait PlayableResource: Send + Sync {
    /// Begin playback.
    async fn start(&self) -> Result<()>;

    /// Ask the backend to pause. Returns before the pause has taken effect.
    fn request_pause(&self);

    /// Whether the backend reports the item as currently playing.
    fn is_active(&self) -> bool;

    /// Release backend resources held by this item.
    fn release(&self);

    /// Register a state-change listener.
    fn subscribe(&self, listener: StateListener) -> SubscriptionId;

    /// Remove a previously registered listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

//! Workspace facade crate.
//!
//! Re-exports the media channel crates so host applications can depend on
//! `media-channel` alone. The `desktop-shims` feature (on by default) adds the
//! thread-backed serial executor from `bridge-desktop`.

pub use bridge_traits;
pub use core_playback;
pub use core_runtime;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;

pub use bridge_traits::{
    MediaState, PlayableResource, SerialExecutor, StateListener, SubscriptionId,
};
pub use core_playback::{
    Channel, ChannelConfig, ChannelSnapshot, PlayOutcome, PlayRequest, PlaybackError,
    ResourceState,
};
pub use core_runtime::{init_logging, ChannelEvent, LoggingConfig};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::ThreadSerialExecutor;

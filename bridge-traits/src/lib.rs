//! # Host Bridge Traits
//!
//! Contracts between the media channel core and the host platform.
//!
//! ## Overview
//!
//! The core coordinates playback but owns neither the media backend nor the
//! thread it runs on. Hosts provide both through the traits in this crate:
//!
//! - [`PlayableResource`](media::PlayableResource) - one media item that can be
//!   started, paused, released, and observed
//! - [`SerialExecutor`](executor::SerialExecutor) - the single logical thread
//!   on which the core mutates its state
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Executor available |
//! | Mobile   | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep messages actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so that resources and executors can
//! be shared between the caller, the serial context, and runtime workers.

pub mod error;
pub mod executor;
pub mod media;

pub use error::{BridgeError, Result};

pub use executor::{SerialExecutor, SerialTask};
pub use media::{MediaState, PlayableResource, StateListener, SubscriptionId};

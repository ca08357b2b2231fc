//! # Playback Channel Module
//!
//! Coordinates access to a single playback slot.
//!
//! ## Overview
//!
//! This module handles:
//! - Queueing play requests against one shared media resource
//! - Pausing the active item before its successor starts
//! - Coalescing requests that arrive while a pause is in flight
//! - Exactly-once completion of every request
//! - Optional release of resources once they leave the queue

pub mod channel;
pub mod config;
pub mod error;
pub mod request;

pub use channel::{Channel, ChannelSnapshot, EntryId, ResourceState};
pub use config::ChannelConfig;
pub use error::{PlaybackError, Result};
pub use request::{PlayOutcome, PlayRequest};

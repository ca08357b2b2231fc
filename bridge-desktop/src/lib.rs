//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `SerialExecutor` using a dedicated OS thread fed by a Tokio channel
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ThreadSerialExecutor;
//! use std::sync::Arc;
//!
//! let executor = Arc::new(ThreadSerialExecutor::new()?);
//! // Hand the executor to `core_playback::Channel::new`
//! ```

mod executor;

pub use executor::ThreadSerialExecutor;

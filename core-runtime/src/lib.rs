//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the media channel crates:
//! - Logging and tracing setup
//! - Channel event bus
//!
//! Other crates depend on this one for the logging conventions and the
//! event types they publish.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{ChannelEvent, EventBus, EventSeverity, EventStream};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};

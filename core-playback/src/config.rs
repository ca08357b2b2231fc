//! # Channel Configuration

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};

/// Media channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Name used in log fields and events.
    ///
    /// Default: `"media"`.
    #[serde(default = "default_label")]
    pub label: String,

    /// Auto-release flag applied by [`Channel::play`](crate::Channel::play).
    ///
    /// Default: false.
    #[serde(default)]
    pub auto_release_by_default: bool,

    /// Capacity of the event broadcast buffer.
    ///
    /// Default: 64.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            auto_release_by_default: false,
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl ChannelConfig {
    /// Create a configuration with the given label and default values.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_auto_release_by_default(mut self, auto_release: bool) -> Self {
        self.auto_release_by_default = auto_release;
        self
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(PlaybackError::InvalidConfig(
                "label must not be empty".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(PlaybackError::InvalidConfig(
                "event_buffer_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_label() -> String {
    "media".to_string()
}

fn default_event_buffer_size() -> usize {
    64
}

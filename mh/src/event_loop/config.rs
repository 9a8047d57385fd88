//! Event loop configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Event loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLoopConfig {
    /// Name used in logs and errors
    #[serde(default = "default_name")]
    pub name: String,

    /// Channel buffer size for execute requests
    #[serde(default = "default_channel_buffer", rename = "channel-buffer")]
    pub channel_buffer: usize,
}

fn default_name() -> String {
    debug!("default_name: called");
    "main".to_string()
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    64
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        debug!("EventLoopConfig::default: called");
        Self {
            name: default_name(),
            channel_buffer: default_channel_buffer(),
        }
    }
}

impl EventLoopConfig {
    /// Config with a specific loop name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

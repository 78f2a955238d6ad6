//! Per-connection and allocation limits.

use serde::Deserialize;

/// Limits configuration.
///
/// These bound how much a single connection can cost the server and how hard
/// code allocation tries before giving up.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Code generation attempts before `CodeSpaceExhausted` (default: 32).
    #[serde(default = "default_max_code_attempts")]
    pub max_code_attempts: usize,
    /// Outbound event queue per connection (default: 256).
    /// Events for a full queue are dropped for that recipient only.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    /// Largest accepted WebSocket message in bytes (default: 64 KiB).
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Sustained inbound events per second (default: 20).
    #[serde(default = "default_message_rate")]
    pub message_rate: f32,
    /// Inbound burst allowance (default: 40).
    #[serde(default = "default_message_burst")]
    pub message_burst: f32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_code_attempts: default_max_code_attempts(),
            outbound_queue: default_outbound_queue(),
            max_frame_bytes: default_max_frame_bytes(),
            message_rate: default_message_rate(),
            message_burst: default_message_burst(),
        }
    }
}

fn default_max_code_attempts() -> usize {
    32
}

fn default_outbound_queue() -> usize {
    256
}

fn default_max_frame_bytes() -> usize {
    64 * 1024
}

fn default_message_rate() -> f32 {
    20.0
}

fn default_message_burst() -> f32 {
    40.0
}

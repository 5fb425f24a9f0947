//! Real-time channel settings.

use std::time::Duration;

use callboard_core::retry::BackoffConfig;
use serde::{Deserialize, Serialize};

/// Event-stream connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealtimeSettings {
    /// WebSocket URL of the event stream.
    pub socket_url: String,
    /// Consecutive failed connection attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Delay before the first retry, doubled per attempt.
    pub reconnect_delay_ms: u64,
    /// Cap on the retry delay.
    pub max_reconnect_delay_ms: u64,
    /// Time allowed for connect plus authentication handshake.
    pub handshake_timeout_ms: u64,
    /// Capacity of the outbound control-message queue.
    pub outbound_buffer: usize,
}

impl RealtimeSettings {
    /// Backoff parameters for reconnection.
    pub fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            max_attempts: self.max_reconnect_attempts,
            base_delay_ms: self.reconnect_delay_ms,
            max_delay_ms: self.max_reconnect_delay_ms,
        }
    }

    /// Handshake timeout as a [`Duration`].
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            socket_url: "ws://localhost:3105/events".to_string(),
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 1000,
            max_reconnect_delay_ms: 30_000,
            handshake_timeout_ms: 10_000,
            outbound_buffer: 64,
        }
    }
}

//! Connection policy configuration
//!
//! Reconnection, grace period, and timeout knobs for a project's tool
//! server link. Deserializes from application settings files; every field
//! has a default so partial configs work.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the connection manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Give up automatic reconnection after this many consecutive failures
    pub max_reconnect_attempts: u32,
    /// First reconnect delay; doubles on each subsequent attempt
    pub initial_reconnect_delay_ms: u64,
    /// Upper bound on the reconnect delay
    pub max_reconnect_delay_ms: u64,
    /// How long a dropped session keeps its positive status before the
    /// link is reported disconnected
    pub grace_period_ms: u64,
    /// Abort a handshake that has not completed within this window
    pub handshake_timeout_ms: u64,
    /// Abort a direct tool call that has not returned within this window
    pub call_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            initial_reconnect_delay_ms: 1_000,
            max_reconnect_delay_ms: 30_000,
            grace_period_ms: 3_000,
            handshake_timeout_ms: 20_000,
            call_timeout_ms: 60_000,
        }
    }
}

impl ConnectionConfig {
    /// Delay before reconnect attempt number `attempt` (zero-based)
    ///
    /// Exponential: `initial * 2^attempt`, capped at the configured maximum.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay = self
            .initial_reconnect_delay_ms
            .saturating_mul(factor)
            .min(self.max_reconnect_delay_ms);
        Duration::from_millis(delay)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

//! Reconnection backoff configuration and delay calculation.
//!
//! The real-time channel retries a bounded number of times with an
//! exponentially growing delay. This module holds the portable math; the
//! actual sleeping lives in `callboard-sync`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default maximum consecutive failed connection attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
/// Default maximum delay in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Bounded exponential backoff parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackoffConfig {
    /// Consecutive failed attempts after which the caller gives up.
    pub max_attempts: u32,
    /// Delay before the first retry, in ms.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay, in ms.
    pub max_delay_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl BackoffConfig {
    /// Delay to wait after the `failures`-th consecutive failure (1-based).
    #[must_use]
    pub fn delay_after(&self, failures: u32) -> Duration {
        Duration::from_millis(calculate_backoff_delay(
            failures.saturating_sub(1),
            self.base_delay_ms,
            self.max_delay_ms,
        ))
    }

    /// Whether `failures` consecutive failures exhaust the budget.
    #[must_use]
    pub fn is_exhausted(&self, failures: u32) -> bool {
        failures >= self.max_attempts
    }
}

/// Calculate exponential backoff delay without jitter.
///
/// Formula: `min(max_delay, base_delay * 2^attempt)`, where `attempt` is
/// zero-based (0 for the first retry).
#[must_use]
pub fn calculate_backoff_delay(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) -> u64 {
    let exponential = base_delay_ms.saturating_mul(1u64 << attempt.min(31));
    exponential.min(max_delay_ms)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

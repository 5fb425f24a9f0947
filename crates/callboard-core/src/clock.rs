//! Wall-clock abstraction.
//!
//! Token expiry is an absolute timestamp issued by the server, while timers
//! run on tokio's monotonic clock. [`TokioClock`] bridges the two by deriving
//! wall time from `tokio::time::Instant`, so a test running with paused time
//! sees expiry deadlines move when it calls `tokio::time::advance`.

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Current time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock anchored to tokio's clock.
///
/// Must be created inside a tokio runtime.
#[derive(Clone, Copy, Debug)]
pub struct TokioClock {
    anchor_wall: DateTime<Utc>,
    anchor_instant: tokio::time::Instant,
}

impl TokioClock {
    /// Anchor at the current system time.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Anchor at an explicit wall time.
    pub fn starting_at(wall: DateTime<Utc>) -> Self {
        Self {
            anchor_wall: wall,
            anchor_instant: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = self.anchor_instant.elapsed();
        let elapsed = chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());
        self.anchor_wall + elapsed
    }
}

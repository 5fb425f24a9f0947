//! Periodic re-fetch of the dashboard lists.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::store::CallStore;

/// Re-fetches calls, conversations and stats on a fixed interval.
///
/// Stopped by [`stop`](Self::stop) or on drop.
#[derive(Debug)]
pub struct RefreshScheduler {
    store: Arc<CallStore>,
    interval: Duration,
    running: Mutex<Option<CancellationToken>>,
}

impl RefreshScheduler {
    /// Scheduler for `store`, ticking every `interval`.
    pub fn new(store: Arc<CallStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            running: Mutex::new(None),
        }
    }

    /// Tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the refresh loop is running.
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Start the loop. No-op if already running. The first refresh happens
    /// one interval from now.
    pub fn start(&self) {
        let mut running = self.running.lock();
        if running.is_some() || self.interval.is_zero() {
            return;
        }
        let cancel = CancellationToken::new();
        let store = self.store.clone();
        let period = self.interval;
        let token = cancel.clone();
        drop(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        debug!("periodic refresh");
                        if let Err(e) = store.refresh_all().await {
                            warn!(error = %e, "periodic refresh failed");
                        }
                    }
                }
            }
            debug!("refresh loop stopped");
        }));
        *running = Some(cancel);
    }

    /// Stop the loop. A refresh already in flight finishes but no more start.
    pub fn stop(&self) {
        if let Some(cancel) = self.running.lock().take() {
            cancel.cancel();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

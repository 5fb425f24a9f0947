//! One-shot timer used for renewal scheduling.
//!
//! Scheduling replaces any pending timer. Cancellation only affects a timer
//! that has not fired yet; once the delay elapses the action runs to
//! completion even if the timer is rescheduled from inside it.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// A single replaceable delayed action.
#[derive(Debug, Default)]
pub struct OneShotTimer {
    pending: Mutex<Option<CancellationToken>>,
}

impl OneShotTimer {
    /// Idle timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay`, cancelling any pending timer.
    ///
    /// Must be called within a tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();
        if let Some(previous) = self.pending.lock().replace(token) {
            previous.cancel();
        }
        drop(tokio::spawn(async move {
            tokio::select! {
                () = child.cancelled() => {}
                () = tokio::time::sleep(delay) => action.await,
            }
        }));
    }

    /// Cancel the pending timer, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.pending.lock().take() {
            token.cancel();
        }
    }

    /// Whether a timer has been scheduled and not cancelled.
    pub fn is_armed(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

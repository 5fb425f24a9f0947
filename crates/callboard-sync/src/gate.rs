//! Connection gate: follows authentication transitions.
//!
//! Authenticated opens the real-time link and starts periodic refresh.
//! Logged out closes the link, stops refresh and clears the cache.

use std::sync::Arc;

use callboard_session::AuthEvent;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::realtime::RealtimeSync;
use crate::scheduler::RefreshScheduler;
use crate::session::SessionHandle;

/// Drives a [`RealtimeSync`] (and optionally a [`RefreshScheduler`]) from
/// session events.
pub struct SessionGate {
    session: Arc<dyn SessionHandle>,
    realtime: RealtimeSync,
    scheduler: Option<Arc<RefreshScheduler>>,
}

impl SessionGate {
    /// Gate for `realtime`.
    pub fn new(session: Arc<dyn SessionHandle>, realtime: RealtimeSync) -> Self {
        Self {
            session,
            realtime,
            scheduler: None,
        }
    }

    /// Also start and stop `scheduler` with the session.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Arc<RefreshScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Subscribe now and follow the session on a background task.
    ///
    /// If the session is already authenticated the link opens right away.
    pub fn spawn(self) -> JoinHandle<()> {
        let rx = self.session.subscribe();
        tokio::spawn(self.run(rx))
    }

    #[tracing::instrument(skip_all, name = "session_gate")]
    async fn run(self, mut rx: broadcast::Receiver<AuthEvent>) {
        if self.session.credentials().is_some() {
            self.open();
        }
        loop {
            match rx.recv().await {
                Ok(AuthEvent::Authenticated { user_id, tenant_id }) => {
                    info!(%user_id, %tenant_id, "session authenticated, opening real-time link");
                    self.open();
                }
                Ok(AuthEvent::Renewed { expires_at }) => {
                    debug!(%expires_at, "access token renewed");
                }
                Ok(AuthEvent::LoggedOut { reason }) => {
                    info!(?reason, "session ended, closing real-time link");
                    self.close();
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged = n, "session gate lagged, re-checking session");
                    if self.session.credentials().is_some() {
                        self.open();
                    } else {
                        self.close();
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("session event source closed");
                    self.close();
                    break;
                }
            }
        }
    }

    fn open(&self) {
        self.realtime.connect();
        if let Some(scheduler) = &self.scheduler {
            scheduler.start();
        }
    }

    fn close(&self) {
        self.realtime.disconnect();
        if let Some(scheduler) = &self.scheduler {
            scheduler.stop();
        }
        self.realtime.store().clear();
    }
}

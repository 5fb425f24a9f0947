//! Service wiring shared by the subcommands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use callboard_api::{HttpAuthApi, HttpCallsApi, HttpClient};
use callboard_core::clock::SystemClock;
use callboard_core::types::UiPreferences;
use callboard_session::storage::load_preferences;
use callboard_session::{FileSessionStore, Rehydration, SessionManager};
use callboard_settings::ClientSettings;
use callboard_sync::{
    CallStore, NotificationCenter, RealtimeConfig, RealtimeSync, RefreshScheduler, SessionGate,
    SessionHandle, WsConnector,
};

/// Settings plus the long-lived services built from them.
pub struct App {
    pub settings: ClientSettings,
    pub session: SessionManager,
    client: HttpClient,
}

/// Everything `watch` runs.
pub struct Feed {
    pub store: Arc<CallStore>,
    pub notifications: Arc<NotificationCenter>,
    pub realtime: RealtimeSync,
    pub gate: SessionGate,
}

impl App {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let client = HttpClient::new(&settings.api).context("Failed to build HTTP client")?;
        let store = Arc::new(FileSessionStore::new(settings.session.data_dir()));
        let session = SessionManager::with_options(
            Arc::new(HttpAuthApi::new(client.clone())),
            store,
            settings.session.renewal_lead(),
            Arc::new(SystemClock),
        );
        Ok(Self {
            settings,
            session,
            client,
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        self.settings.session.data_dir()
    }

    pub fn preferences(&self) -> UiPreferences {
        load_preferences(&self.data_dir())
    }

    /// Restore the stored session or fail with a hint to log in.
    pub fn require_session(&self) -> Result<()> {
        match self.session.rehydrate() {
            Rehydration::Restored => Ok(()),
            Rehydration::NoSession => bail!("Not logged in. Run `callboard login` first."),
            Rehydration::Expired => bail!("Session expired. Run `callboard login` again."),
        }
    }

    /// Entity cache backed by the call service, authenticated by the session.
    pub fn call_store(&self) -> Arc<CallStore> {
        let api = HttpCallsApi::new(self.client.clone(), Arc::new(self.session.clone()));
        Arc::new(CallStore::new(Arc::new(api)))
    }

    /// Cache, real-time link and gate, with periodic refresh when enabled
    /// both in settings and in the stored preferences.
    pub fn feed(&self) -> Feed {
        let store = self.call_store();
        let notifications = Arc::new(NotificationCenter::new());
        let session: Arc<dyn SessionHandle> = Arc::new(self.session.clone());
        let realtime = RealtimeSync::new(
            RealtimeConfig::from_settings(&self.settings.realtime),
            Arc::new(WsConnector),
            session.clone(),
            store.clone(),
            notifications.clone(),
        );

        let mut gate = SessionGate::new(session, realtime.clone());
        if self.settings.refresh.auto_refresh && self.preferences().auto_refresh {
            let scheduler = RefreshScheduler::new(store.clone(), self.settings.refresh.interval());
            gate = gate.with_scheduler(Arc::new(scheduler));
        }

        Feed {
            store,
            notifications,
            realtime,
            gate,
        }
    }
}

//! The session manager.
//!
//! Owns the authenticated session and its renewal schedule:
//!
//! ```text
//! Unauthenticated ──login──▶ Authenticating ──ok──▶ Authenticated ◀──▶ Refreshing
//!        ▲                         │ err                  │                 │ err
//!        └─────────────────────────┴──────── logout ──────┴─────────────────┘
//! ```
//!
//! Renewal fires once at `expires_at - renewal_lead` and is rescheduled after
//! every successful refresh. At most one refresh request is in flight; every
//! concurrent caller awaits the same shared outcome. A failed refresh ends the
//! session exactly once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use callboard_api::{AccessTokenProvider, ApiError, AuthApi};
use callboard_core::clock::{Clock, SystemClock};
use callboard_core::ids::{TenantId, UserId};
use callboard_core::types::{AuthTokens, LoginRequest, User, UserPatch};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::errors::SessionError;
use crate::events::{AuthEvent, AuthEvents, LogoutReason};
use crate::storage::{PersistedSession, SessionStore};
use crate::timer::OneShotTimer;

/// Renew this long before the access token expires.
pub const DEFAULT_RENEWAL_LEAD: Duration = Duration::from_secs(300);

type RenewalFuture = Shared<BoxFuture<'static, Result<(), SessionError>>>;

/// Authentication phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthPhase {
    /// No session.
    #[default]
    Unauthenticated,
    /// Login request in flight.
    Authenticating,
    /// Session active.
    Authenticated,
    /// Session active, renewal in flight.
    Refreshing,
}

impl AuthPhase {
    /// Whether a session exists in this phase.
    pub fn has_session(self) -> bool {
        matches!(self, Self::Authenticated | Self::Refreshing)
    }
}

/// Outcome of [`SessionManager::rehydrate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rehydration {
    /// Nothing was stored.
    NoSession,
    /// The stored session is active again.
    Restored,
    /// The stored session had expired and was discarded.
    Expired,
}

/// Delay until renewal: `expires_at - lead - now`, never negative.
pub fn renewal_delay(expires_at: DateTime<Utc>, lead: Duration, now: DateTime<Utc>) -> Duration {
    let lead = chrono::Duration::from_std(lead).unwrap_or_else(|_| chrono::Duration::zero());
    (expires_at - lead - now).to_std().unwrap_or(Duration::ZERO)
}

#[derive(Debug, Default)]
struct State {
    phase: AuthPhase,
    user: Option<User>,
    tokens: Option<AuthTokens>,
    last_error: Option<String>,
    /// Bumped whenever a session starts or ends. In-flight work captured
    /// under an older generation must not touch the current session.
    generation: u64,
}

struct Inner {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    renewal_lead: Duration,
    state: RwLock<State>,
    renewal: Mutex<Option<(u64, RenewalFuture)>>,
    timer: OneShotTimer,
    events: AuthEvents,
}

/// Single source of truth for "is this client authenticated".
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Manager with the system clock and the default renewal lead.
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn SessionStore>) -> Self {
        Self::with_options(api, store, DEFAULT_RENEWAL_LEAD, Arc::new(SystemClock))
    }

    /// Manager with an explicit renewal lead and clock.
    pub fn with_options(
        api: Arc<dyn AuthApi>,
        store: Arc<dyn SessionStore>,
        renewal_lead: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                clock,
                renewal_lead,
                state: RwLock::new(State::default()),
                renewal: Mutex::new(None),
                timer: OneShotTimer::new(),
                events: AuthEvents::new(),
            }),
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Current phase.
    pub fn phase(&self) -> AuthPhase {
        self.inner.state.read().phase
    }

    /// Whether a session exists and its access token has not expired.
    pub fn is_authenticated(&self) -> bool {
        let now = self.inner.clock.now();
        let state = self.inner.state.read();
        state.phase.has_session()
            && state.tokens.as_ref().is_some_and(|t| !t.is_expired_at(now))
    }

    /// Signed-in user.
    pub fn user(&self) -> Option<User> {
        self.inner.state.read().user.clone()
    }

    /// Current credentials.
    pub fn tokens(&self) -> Option<AuthTokens> {
        self.inner.state.read().tokens.clone()
    }

    /// User and tenant of the active session.
    pub fn identity(&self) -> Option<(UserId, TenantId)> {
        self.inner
            .state
            .read()
            .user
            .as_ref()
            .map(|u| (u.id.clone(), u.tenant_id.clone()))
    }

    /// Message of the last login or renewal failure.
    pub fn last_error(&self) -> Option<String> {
        self.inner.state.read().last_error.clone()
    }

    /// Forget the last error.
    pub fn clear_error(&self) {
        self.inner.state.write().last_error = None;
    }

    /// Whether a renewal timer is pending.
    pub fn renewal_scheduled(&self) -> bool {
        self.inner.timer.is_armed()
    }

    /// Receive authentication transitions from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    // ── Operations ──────────────────────────────────────────────────────

    /// Exchange credentials for a session.
    ///
    /// Failures are returned to the caller and not retried.
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<User, SessionError> {
        let generation = {
            let mut state = self.inner.state.write();
            match state.phase {
                AuthPhase::Authenticating => return Err(SessionError::LoginInProgress),
                AuthPhase::Authenticated | AuthPhase::Refreshing => {
                    return Err(SessionError::AlreadyAuthenticated);
                }
                AuthPhase::Unauthenticated => {}
            }
            state.phase = AuthPhase::Authenticating;
            state.last_error = None;
            state.generation
        };
        let _reset = LoginReset(&self.inner);

        match self.inner.api.login(&request).await {
            Ok(resp) => {
                {
                    let state = self.inner.state.read();
                    if state.generation != generation || state.phase != AuthPhase::Authenticating {
                        debug!("logout raced login, discarding login response");
                        return Err(SessionError::NotAuthenticated);
                    }
                }
                self.inner.establish(resp.user.clone(), resp.tokens);
                Ok(resp.user)
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                let mut state = self.inner.state.write();
                state.phase = AuthPhase::Unauthenticated;
                state.last_error = Some(e.user_message());
                Err(e.into())
            }
        }
    }

    /// End the session.
    ///
    /// Local state is cleared before this returns. The server is notified in
    /// the background and any failure there is logged and ignored.
    pub fn logout(&self) {
        if let Some(access_token) = self.inner.end_session(LogoutReason::UserRequested) {
            self.inner.notify_server_logout(access_token);
        }
    }

    /// End the session and wait for the server call to finish.
    ///
    /// Used by short-lived processes that would otherwise exit before the
    /// background notification in [`logout`](Self::logout) runs.
    #[instrument(skip_all)]
    pub async fn logout_and_wait(&self) {
        let Some(access_token) = self.inner.end_session(LogoutReason::UserRequested) else {
            return;
        };
        if let Err(e) = self.inner.api.logout(&access_token).await {
            warn!(error = %e, "server logout failed, ignoring");
        }
    }

    /// Renew the access token.
    ///
    /// Joins the in-flight renewal if there is one. On failure the session
    /// has already ended by the time this returns.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        self.inner.renewal().await
    }

    /// Restore a persisted session at startup.
    ///
    /// An expired session is discarded. Otherwise renewal is scheduled at
    /// the usual lead, immediately if that deadline has passed.
    pub fn rehydrate(&self) -> Rehydration {
        if self.phase() != AuthPhase::Unauthenticated {
            return Rehydration::Restored;
        }
        let Some(persisted) = self.inner.store.load() else {
            return Rehydration::NoSession;
        };
        if persisted.tokens.is_expired_at(self.inner.clock.now()) {
            info!(expires_at = %persisted.tokens.expires_at, "stored session expired");
            if let Err(e) = self.inner.store.clear() {
                warn!(error = %e, "failed to clear expired session");
            }
            let _ = self.inner.events.emit(AuthEvent::LoggedOut {
                reason: LogoutReason::Expired,
            });
            return Rehydration::Expired;
        }
        self.inner.establish(persisted.user, persisted.tokens);
        Rehydration::Restored
    }

    /// Update profile fields of the signed-in user.
    pub fn update_user(&self, patch: &UserPatch) -> Result<User, SessionError> {
        let user = {
            let mut state = self.inner.state.write();
            let Some(user) = state.user.as_mut() else {
                return Err(SessionError::NotAuthenticated);
            };
            user.apply(patch);
            user.clone()
        };
        self.inner.persist();
        Ok(user)
    }

    /// Stop the renewal timer without ending the session.
    pub fn dispose(&self) {
        self.inner.timer.cancel();
    }
}

/// Resets `Authenticating` if a login future is dropped mid-flight.
struct LoginReset<'a>(&'a Inner);

impl Drop for LoginReset<'_> {
    fn drop(&mut self) {
        let mut state = self.0.state.write();
        if state.phase == AuthPhase::Authenticating {
            state.phase = AuthPhase::Unauthenticated;
        }
    }
}

impl Inner {
    fn establish(self: &Arc<Self>, user: User, tokens: AuthTokens) {
        let expires_at = tokens.expires_at;
        let user_id = user.id.clone();
        let tenant_id = user.tenant_id.clone();
        {
            let mut state = self.state.write();
            state.generation += 1;
            state.phase = AuthPhase::Authenticated;
            state.user = Some(user);
            state.tokens = Some(tokens);
            state.last_error = None;
        }
        self.persist();
        self.schedule_renewal(expires_at);
        info!(user_id = %user_id, tenant_id = %tenant_id, %expires_at, "session established");
        let _ = self.events.emit(AuthEvent::Authenticated { user_id, tenant_id });
    }

    fn persist(&self) {
        let snapshot = {
            let state = self.state.read();
            match (&state.user, &state.tokens) {
                (Some(user), Some(tokens)) => PersistedSession {
                    user: user.clone(),
                    tokens: tokens.clone(),
                },
                _ => return,
            }
        };
        if let Err(e) = self.store.save(&snapshot) {
            warn!(error = %e, "failed to persist session");
        }
    }

    fn schedule_renewal(self: &Arc<Self>, expires_at: DateTime<Utc>) {
        let delay = renewal_delay(expires_at, self.renewal_lead, self.clock.now());
        debug!(?delay, %expires_at, "renewal scheduled");
        let weak = Arc::downgrade(self);
        self.timer.schedule(delay, async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let renewal = inner.renewal();
            drop(inner);
            if let Err(e) = renewal.await {
                debug!(error = %e, "scheduled renewal failed");
            }
        });
    }

    fn renewal(self: &Arc<Self>) -> RenewalFuture {
        let generation = self.state.read().generation;
        let mut slot = self.renewal.lock();
        if let Some((slot_generation, inflight)) = slot.as_ref() {
            if *slot_generation == generation {
                return inflight.clone();
            }
        }
        let fut = Arc::clone(self).run_renewal(generation).boxed().shared();
        *slot = Some((generation, fut.clone()));
        fut
    }

    async fn run_renewal(self: Arc<Self>, generation: u64) -> Result<(), SessionError> {
        let outcome = self.renew_once(generation).await;
        let mut slot = self.renewal.lock();
        if slot.as_ref().is_some_and(|(g, _)| *g == generation) {
            *slot = None;
        }
        outcome
    }

    #[instrument(skip_all)]
    async fn renew_once(self: &Arc<Self>, generation: u64) -> Result<(), SessionError> {
        let refresh_token = {
            let mut state = self.state.write();
            if state.generation != generation || !state.phase.has_session() {
                return Err(SessionError::NotAuthenticated);
            }
            let Some(tokens) = state.tokens.as_ref() else {
                return Err(SessionError::NotAuthenticated);
            };
            let token = tokens.refresh_token.clone();
            state.phase = AuthPhase::Refreshing;
            token
        };

        match self.api.refresh(&refresh_token).await {
            Ok(resp) => {
                let expires_at = resp.expires_at;
                {
                    let mut state = self.state.write();
                    if state.generation != generation {
                        return Err(SessionError::NotAuthenticated);
                    }
                    if let Some(tokens) = state.tokens.as_mut() {
                        tokens.access_token = resp.access_token;
                        tokens.expires_at = expires_at;
                    }
                    state.phase = AuthPhase::Authenticated;
                }
                self.persist();
                self.schedule_renewal(expires_at);
                info!(%expires_at, "access token renewed");
                let _ = self.events.emit(AuthEvent::Renewed { expires_at });
                Ok(())
            }
            Err(e) => {
                {
                    let mut state = self.state.write();
                    if state.generation != generation {
                        return Err(e.into());
                    }
                    state.last_error = Some(e.user_message());
                }
                warn!(error = %e, "token renewal failed, ending session");
                if let Some(access_token) = self.end_session(LogoutReason::RenewalFailed) {
                    self.notify_server_logout(access_token);
                }
                Err(e.into())
            }
        }
    }

    /// Returns the access token of the session that ended, if there was one.
    fn end_session(&self, reason: LogoutReason) -> Option<String> {
        let tokens = {
            let mut state = self.state.write();
            state.generation += 1;
            state.phase = AuthPhase::Unauthenticated;
            state.user = None;
            if reason == LogoutReason::UserRequested {
                state.last_error = None;
            }
            state.tokens.take()
        };
        self.timer.cancel();
        let _ = self.renewal.lock().take();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear stored session");
        }

        let tokens = tokens?;
        info!(?reason, "session ended");
        let _ = self.events.emit(AuthEvent::LoggedOut { reason });
        Some(tokens.access_token)
    }

    fn notify_server_logout(&self, access_token: String) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime, skipping server logout");
            return;
        };
        let api = Arc::clone(&self.api);
        drop(handle.spawn(async move {
            if let Err(e) = api.logout(&access_token).await {
                warn!(error = %e, "server logout failed, ignoring");
            }
        }));
    }
}

#[async_trait]
impl AccessTokenProvider for SessionManager {
    fn access_token(&self) -> Option<String> {
        self.tokens().map(|t| t.access_token)
    }

    async fn renew(&self) -> Result<(), ApiError> {
        self.refresh().await.map_err(ApiError::from)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

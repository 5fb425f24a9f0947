//! Authentication state-change events.

use callboard_core::ids::{TenantId, UserId};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoutReason {
    /// Explicit logout.
    UserRequested,
    /// The renewal credential was rejected or the renewal failed.
    RenewalFailed,
    /// The restored session had already expired.
    Expired,
}

/// Emitted on every authentication transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session became active (login or rehydration).
    Authenticated {
        /// Signed-in user.
        user_id: UserId,
        /// Their tenant.
        tenant_id: TenantId,
    },
    /// The access token was renewed.
    Renewed {
        /// New expiry.
        expires_at: DateTime<Utc>,
    },
    /// The session ended.
    LoggedOut {
        /// Why.
        reason: LogoutReason,
    },
}

impl AuthEvent {
    /// Whether this event leaves the client authenticated.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::LoggedOut { .. })
    }
}

/// Broadcast emitter for [`AuthEvent`].
///
/// Non-blocking: slow receivers lag rather than block the sender.
#[derive(Debug)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthEvents {
    /// Emitter with the default capacity.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self { tx }
    }

    /// Emit to all subscribers; returns how many received it.
    pub fn emit(&self, event: AuthEvent) -> usize {
        tracing::debug!(?event, "auth event");
        self.tx.send(event).unwrap_or(0)
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }

    /// Active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

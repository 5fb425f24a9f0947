//! What the synchronizer needs from the session.

use async_trait::async_trait;
use callboard_core::ids::{TenantId, UserId};
use callboard_session::{AuthEvent, SessionError, SessionManager};
use tokio::sync::broadcast;

/// Identity presented in the real-time handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token.
    pub access_token: String,
    /// Signed-in user.
    pub user_id: UserId,
    /// Their tenant.
    pub tenant_id: TenantId,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Session operations used by the synchronizer and the connection gate.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Current credentials, `None` when signed out.
    fn credentials(&self) -> Option<Credentials>;

    /// Authentication transitions.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// Renew the access token, sharing any renewal already in flight.
    async fn renew(&self) -> Result<(), SessionError>;
}

#[async_trait]
impl SessionHandle for SessionManager {
    fn credentials(&self) -> Option<Credentials> {
        let tokens = self.tokens()?;
        let (user_id, tenant_id) = self.identity()?;
        Some(Credentials {
            access_token: tokens.access_token,
            user_id,
            tenant_id,
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        SessionManager::subscribe(self)
    }

    async fn renew(&self) -> Result<(), SessionError> {
        self.refresh().await
    }
}

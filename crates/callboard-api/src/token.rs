//! Bearer token source for authorized requests.

use async_trait::async_trait;

use crate::errors::ApiError;

/// Supplies the current access token and renews it on demand.
///
/// Implemented by the session manager so that a 401 on any REST call joins
/// the same in-flight renewal as the timer-driven one.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Current access token, if authenticated.
    fn access_token(&self) -> Option<String>;

    /// Obtain a fresh access token.
    async fn renew(&self) -> Result<(), ApiError>;
}

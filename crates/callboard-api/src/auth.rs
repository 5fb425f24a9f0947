//! Authentication endpoints.

use async_trait::async_trait;
use callboard_core::types::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse};
use serde_json::Value;
use tracing::instrument;

use crate::client::{ApiRequest, HttpClient};
use crate::errors::ApiError;

/// Credential exchange with the auth service.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`.
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError>;

    /// `POST /auth/refresh`.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError>;

    /// `POST /auth/logout`.
    async fn logout(&self, access_token: &str) -> Result<(), ApiError>;
}

/// [`AuthApi`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpAuthApi {
    client: HttpClient,
}

impl HttpAuthApi {
    /// Wrap a configured client.
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    #[instrument(skip_all, fields(email = %request.email))]
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let body = serde_json::to_value(request).map_err(|e| ApiError::Decode(e.to_string()))?;
        let req = ApiRequest::post("/auth/login").json(body);
        match self.client.send::<LoginResponse>(&req, None).await {
            Ok(decoded) => decoded.require("login"),
            Err(ApiError::Unauthorized) => {
                Err(ApiError::InvalidCredentials("invalid email or password".into()))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let body = serde_json::to_value(RefreshRequest {
            refresh_token: refresh_token.to_string(),
        })
        .map_err(|e| ApiError::Decode(e.to_string()))?;
        let req = ApiRequest::post("/auth/refresh").json(body);
        self.client
            .send::<RefreshResponse>(&req, None)
            .await?
            .require("refresh")
    }

    #[instrument(skip_all)]
    async fn logout(&self, access_token: &str) -> Result<(), ApiError> {
        let req = ApiRequest::post("/auth/logout");
        let _ = self.client.send::<Value>(&req, Some(access_token)).await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

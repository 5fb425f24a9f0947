//! REST endpoint settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Base URLs of the backend services and the request timeout.
///
/// Requests are routed to a base URL by path prefix; see
/// `callboard_api::routing`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// Auth service (`/auth`, `/users`).
    pub auth_url: String,
    /// Call service (`/calls`, `/conversations`, `/dashboard`).
    pub call_url: String,
    /// Tenant service (`/tenants`).
    pub tenant_url: String,
    /// Phone number service (`/phone-numbers`).
    pub phone_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl ApiSettings {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            auth_url: "http://localhost:3101/api".to_string(),
            call_url: "http://localhost:3103/api".to_string(),
            tenant_url: "http://localhost:3102/api".to_string(),
            phone_url: "http://localhost:3104/api".to_string(),
            timeout_ms: 30_000,
        }
    }
}

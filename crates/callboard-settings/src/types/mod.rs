//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may set any subset of fields; missing fields keep their default.

mod api;
mod realtime;
mod session;

pub use api::*;
pub use realtime::*;
pub use session::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the callboard client.
///
/// ```json
/// {
///   "api": { "callUrl": "https://calls.example.com/api" },
///   "realtime": { "maxReconnectAttempts": 8 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// REST endpoints and timeout.
    pub api: ApiSettings,
    /// Real-time channel.
    pub realtime: RealtimeSettings,
    /// Session lifecycle and storage.
    pub session: SessionSettings,
    /// Periodic list refresh.
    pub refresh: RefreshSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

impl ClientSettings {
    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("api.authUrl", &self.api.auth_url),
            ("api.callUrl", &self.api.call_url),
            ("api.tenantUrl", &self.api.tenant_url),
            ("api.phoneUrl", &self.api.phone_url),
            ("realtime.socketUrl", &self.realtime.socket_url),
        ] {
            if url.trim().is_empty() {
                return Err(SettingsError::InvalidValue(format!("{name} must not be empty")));
            }
        }
        if self.realtime.max_reconnect_attempts == 0 {
            return Err(SettingsError::InvalidValue(
                "realtime.maxReconnectAttempts must be at least 1".into(),
            ));
        }
        if self.refresh.interval_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "refresh.intervalSecs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

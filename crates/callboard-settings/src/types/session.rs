//! Session and refresh settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session lifecycle and persistence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Renew this many seconds before the access token expires.
    pub renewal_lead_secs: u64,
    /// Directory for persisted state. `None` means `~/.callboard`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

impl SessionSettings {
    /// Renewal lead as a [`Duration`].
    pub fn renewal_lead(&self) -> Duration {
        Duration::from_secs(self.renewal_lead_secs)
    }

    /// Resolved storage directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .as_ref()
            .map_or_else(crate::loader::callboard_home, PathBuf::from)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            renewal_lead_secs: 300,
            data_dir: None,
        }
    }
}

/// Periodic list refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshSettings {
    /// Refresh lists on a timer.
    pub auto_refresh: bool,
    /// Seconds between refreshes.
    pub interval_secs: u64,
}

impl RefreshSettings {
    /// Interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            interval_secs: 30,
        }
    }
}

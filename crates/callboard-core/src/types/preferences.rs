//! Persisted dashboard preferences.

use serde::{Deserialize, Serialize};

/// Colour theme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light.
    Light,
    /// Dark.
    Dark,
    /// Follow the OS.
    #[default]
    System,
}

/// User interface preferences, stored under the `ui-storage` namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiPreferences {
    /// Colour theme.
    pub theme: Theme,
    /// Sidebar collapsed.
    pub sidebar_collapsed: bool,
    /// Dense layout.
    pub compact_mode: bool,
    /// UI animations.
    pub animations: bool,
    /// Periodically refetch lists.
    pub auto_refresh: bool,
    /// Auto-refresh period in milliseconds.
    pub refresh_interval: u64,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            sidebar_collapsed: false,
            compact_mode: false,
            animations: true,
            auto_refresh: true,
            refresh_interval: 30_000,
        }
    }
}

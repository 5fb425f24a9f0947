//! # callboard-settings
//!
//! Layered configuration for the callboard client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ClientSettings::default()`]
//! 2. **User file**: `~/.callboard/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `CALLBOARD_*` overrides (highest priority)
//!
//! The loaded value is passed explicitly to the services that need it;
//! there is no global settings instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{callboard_home, deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

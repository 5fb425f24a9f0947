//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ClientSettings::default()`]
//! 2. If `~/.callboard/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `CALLBOARD_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::ClientSettings;

/// `~/.callboard`, or `/tmp/.callboard` when `HOME` is unset.
pub fn callboard_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".callboard")
}

/// Resolve the path to the settings file (`~/.callboard/settings.json`).
pub fn settings_path() -> PathBuf {
    callboard_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ClientSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<ClientSettings> {
    let defaults = serde_json::to_value(ClientSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: ClientSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Integers must parse and fall within range; anything else is ignored
/// with a warning and the file/default value stays.
pub fn apply_env_overrides(settings: &mut ClientSettings) {
    // ── REST ────────────────────────────────────────────────────────
    if let Some(v) = read_env_string("CALLBOARD_AUTH_API_URL") {
        settings.api.auth_url = v;
    }
    if let Some(v) = read_env_string("CALLBOARD_CALL_API_URL") {
        settings.api.call_url = v;
    }
    if let Some(v) = read_env_string("CALLBOARD_TENANT_API_URL") {
        settings.api.tenant_url = v;
    }
    if let Some(v) = read_env_string("CALLBOARD_PHONE_API_URL") {
        settings.api.phone_url = v;
    }
    if let Some(v) = read_env_u64("CALLBOARD_API_TIMEOUT_MS", 100, 600_000) {
        settings.api.timeout_ms = v;
    }

    // ── Real-time ───────────────────────────────────────────────────
    if let Some(v) = read_env_string("CALLBOARD_SOCKET_URL") {
        settings.realtime.socket_url = v;
    }
    if let Some(v) = read_env_u32("CALLBOARD_MAX_RECONNECT_ATTEMPTS", 1, 100) {
        settings.realtime.max_reconnect_attempts = v;
    }

    // ── Session / refresh / logging ─────────────────────────────────
    if let Some(v) = read_env_bool("CALLBOARD_AUTO_REFRESH") {
        settings.refresh.auto_refresh = v;
    }
    if let Some(v) = read_env_u64("CALLBOARD_REFRESH_INTERVAL_SECS", 1, 86_400) {
        settings.refresh.interval_secs = v;
    }
    if let Some(v) = read_env_string("CALLBOARD_DATA_DIR") {
        settings.session.data_dir = Some(v);
    }
    if let Some(v) = read_env_string("CALLBOARD_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers ─────────────────────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

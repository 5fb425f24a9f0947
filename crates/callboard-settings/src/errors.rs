//! Settings error types.

use callboard_core::errors::{Classify, ErrorCategory};
use thiserror::Error;

/// Errors that can occur when loading or parsing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A settings value was invalid (e.g., out of range).
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

impl Classify for SettingsError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Io(_) => ErrorCategory::Unknown,
            Self::Json(_) | Self::InvalidValue(_) => ErrorCategory::Validation,
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_is_validation() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err: SettingsError = json_err.into();
        assert!(err.to_string().contains("parse settings JSON"));
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn invalid_value_display() {
        let err = SettingsError::InvalidValue("socketUrl must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "invalid settings value: socketUrl must not be empty"
        );
    }
}

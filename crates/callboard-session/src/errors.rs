//! Session error types.

use callboard_api::ApiError;
use callboard_core::errors::{Classify, ErrorCategory};

/// Errors from session operations.
///
/// `Clone` because one renewal outcome is shared by every concurrent caller.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The auth service call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The operation needs an authenticated session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A session is already active; log out first.
    #[error("already authenticated")]
    AlreadyAuthenticated,

    /// Another login is in progress.
    #[error("login already in progress")]
    LoginInProgress,
}

impl Classify for SessionError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Api(e) => e.category(),
            Self::NotAuthenticated => ErrorCategory::Authentication,
            Self::AlreadyAuthenticated | Self::LoginInProgress => ErrorCategory::BusinessRule,
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Api(e) => e,
            SessionError::NotAuthenticated
            | SessionError::AlreadyAuthenticated
            | SessionError::LoginInProgress => ApiError::Unauthorized,
        }
    }
}

/// Errors from local persistence.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Classify for StorageError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Io(_) => ErrorCategory::Unknown,
            Self::Json(_) => ErrorCategory::Validation,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

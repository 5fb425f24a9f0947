//! Error taxonomy shared across the callboard crates.
//!
//! Each crate owns its own `thiserror` enum, but every one of them maps onto
//! an [`ErrorCategory`] through the [`Classify`] trait. The category decides
//! how a failure propagates:
//!
//! | category | propagation |
//! |---|---|
//! | `Authentication` | fatal to the session, forces logout |
//! | `Network` | recoverable via bounded retry, surfaced as degraded status |
//! | `Validation` | dropped and logged, never crashes the cache or view |
//! | `BusinessRule` | returned to the initiating caller, cache unchanged |
//! | `Server` | returned to the caller |

use serde::{Deserialize, Serialize};

/// Error category for classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid credentials or an expired / rejected renewal credential.
    Authentication,
    /// Timeout, unreachable host, dropped socket.
    Network,
    /// Malformed payload or unexpected response shape.
    Validation,
    /// Rejected by a business rule (takeover already requested, bad status transition).
    BusinessRule,
    /// Server-side failure (5xx).
    Server,
    /// Unrecognized error.
    Unknown,
}

impl ErrorCategory {
    /// Whether an operation failing with this category may succeed if retried.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }

    /// Whether this category ends the authenticated session.
    #[must_use]
    pub fn is_fatal_to_session(self) -> bool {
        matches!(self, Self::Authentication)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Network => write!(f, "network"),
            Self::Validation => write!(f, "validation"),
            Self::BusinessRule => write!(f, "business_rule"),
            Self::Server => write!(f, "server"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Implemented by every error enum in the workspace.
pub trait Classify {
    /// The taxonomy bucket this error falls into.
    fn category(&self) -> ErrorCategory;

    /// Shorthand for `self.category().is_retryable()`.
    fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

/// Classify an HTTP status code.
///
/// `401` is authentication, `408`/`429` are treated as transient network
/// conditions, other `4xx` are business-rule / validation rejections and
/// `5xx` are server errors.
#[must_use]
pub fn category_for_status(status: u16) -> ErrorCategory {
    match status {
        401 => ErrorCategory::Authentication,
        408 | 429 => ErrorCategory::Network,
        422 => ErrorCategory::Validation,
        400..=499 => ErrorCategory::BusinessRule,
        500..=599 => ErrorCategory::Server,
        _ => ErrorCategory::Unknown,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_display() {
        assert_eq!(ErrorCategory::Authentication.to_string(), "authentication");
        assert_eq!(ErrorCategory::BusinessRule.to_string(), "business_rule");
    }

    #[test]
    fn category_serde() {
        let json = serde_json::to_string(&ErrorCategory::BusinessRule).unwrap();
        assert_eq!(json, "\"business_rule\"");
    }

    #[test]
    fn retryable_categories() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Server.is_retryable());
        assert!(!ErrorCategory::Authentication.is_retryable());
        assert!(!ErrorCategory::Validation.is_retryable());
        assert!(!ErrorCategory::BusinessRule.is_retryable());
    }

    #[test]
    fn only_authentication_is_fatal() {
        assert!(ErrorCategory::Authentication.is_fatal_to_session());
        assert!(!ErrorCategory::Network.is_fatal_to_session());
    }

    #[test]
    fn status_classification() {
        assert_eq!(category_for_status(401), ErrorCategory::Authentication);
        assert_eq!(category_for_status(409), ErrorCategory::BusinessRule);
        assert_eq!(category_for_status(422), ErrorCategory::Validation);
        assert_eq!(category_for_status(429), ErrorCategory::Network);
        assert_eq!(category_for_status(503), ErrorCategory::Server);
        assert_eq!(category_for_status(302), ErrorCategory::Unknown);
    }
}

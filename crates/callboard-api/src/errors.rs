//! REST error types.

use callboard_core::errors::{Classify, ErrorCategory, category_for_status};

/// A classified REST failure.
///
/// `Clone` so a single renewal outcome can be handed to every caller
/// awaiting it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Login rejected the email/password pair.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The bearer or renewal credential was rejected (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The server failed (5xx).
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Error description.
        message: String,
    },

    /// The server refused the request (`success: false` or a 4xx).
    #[error("request rejected ({status} {code}): {message}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Machine-readable code from the envelope.
        code: String,
        /// Error description.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Map a transport error from `reqwest`.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Human-readable message suitable for a notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials(m) | Self::Rejected { message: m, .. } if !m.is_empty() => {
                m.clone()
            }
            Self::Server { message, .. } if !message.is_empty() => message.clone(),
            _ => self.to_string(),
        }
    }
}

impl Classify for ApiError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCredentials(_) | Self::Unauthorized => ErrorCategory::Authentication,
            Self::Timeout | Self::Network(_) => ErrorCategory::Network,
            Self::Server { .. } => ErrorCategory::Server,
            Self::Rejected { status, .. } => match category_for_status(*status) {
                ErrorCategory::Unknown => ErrorCategory::BusinessRule,
                c => c,
            },
            Self::Decode(_) => ErrorCategory::Validation,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(status: u16) -> ApiError {
        ApiError::Rejected {
            status,
            code: "X".into(),
            message: "nope".into(),
        }
    }

    #[test]
    fn categories() {
        assert_eq!(ApiError::Unauthorized.category(), ErrorCategory::Authentication);
        assert_eq!(ApiError::Timeout.category(), ErrorCategory::Network);
        assert_eq!(ApiError::Decode("x".into()).category(), ErrorCategory::Validation);
        assert_eq!(rejected(200).category(), ErrorCategory::BusinessRule);
        assert_eq!(rejected(409).category(), ErrorCategory::BusinessRule);
        assert_eq!(rejected(422).category(), ErrorCategory::Validation);
        assert_eq!(rejected(429).category(), ErrorCategory::Network);
        assert!(
            ApiError::Server {
                status: 503,
                message: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn display() {
        assert_eq!(
            rejected(409).to_string(),
            "request rejected (409 X): nope"
        );
        assert_eq!(ApiError::Timeout.to_string(), "request timed out");
    }

    #[test]
    fn user_message_prefers_server_text() {
        assert_eq!(rejected(409).user_message(), "nope");
        assert_eq!(ApiError::Timeout.user_message(), "request timed out");
    }
}

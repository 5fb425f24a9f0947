//! Identity and credential types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{TenantId, UserId};

/// Role of a dashboard user within its tenant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Tenant owner.
    Owner,
    /// Operator who can act on calls and conversations.
    Operator,
    /// Read-only access.
    #[default]
    Viewer,
}

/// Account status of a dashboard user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Active account.
    #[default]
    Active,
    /// Deactivated account.
    Inactive,
    /// Invitation not yet accepted.
    Pending,
    /// Suspended by an administrator.
    Suspended,
}

/// An authenticated dashboard user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque user ID.
    pub id: UserId,
    /// Tenant the user belongs to.
    pub tenant_id: TenantId,
    /// Login email.
    pub email: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Role within the tenant.
    #[serde(default)]
    pub role: UserRole,
    /// Account status.
    #[serde(default)]
    pub status: UserStatus,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// IANA timezone name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Last successful login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Apply a partial profile update in place.
    pub fn apply(&mut self, patch: &UserPatch) {
        if let Some(v) = &patch.first_name {
            self.first_name.clone_from(v);
        }
        if let Some(v) = &patch.last_name {
            self.last_name.clone_from(v);
        }
        if let Some(v) = &patch.phone {
            self.phone = Some(v.clone());
        }
        if let Some(v) = &patch.timezone {
            self.timezone = Some(v.clone());
        }
        if let Some(v) = &patch.avatar {
            self.avatar = Some(v.clone());
        }
    }

    /// `"First Last"`, falling back to the email when both are empty.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

/// Partial profile update.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    /// New given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// New family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// New phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// New timezone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// New avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Access / renewal credential pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    /// Short-lived bearer token for API calls.
    pub access_token: String,
    /// Long-lived token used only to obtain a new access token.
    pub refresh_token: String,
    /// Absolute expiry of the access token.
    pub expires_at: DateTime<Utc>,
}

impl AuthTokens {
    /// Whether the access token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Body of `POST /auth/login`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Password.
    pub password: String,
    /// Ask the server for a longer-lived renewal credential.
    #[serde(default)]
    pub remember_me: bool,
}

/// Tenant summary returned alongside a login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    /// Tenant ID.
    pub id: TenantId,
    /// Display name.
    pub name: String,
    /// Tenant domain.
    #[serde(default)]
    pub domain: String,
}

/// Payload of a successful login.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// The authenticated user.
    pub user: User,
    /// Issued credentials.
    pub tokens: AuthTokens,
    /// Tenant details, when the server includes them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantSummary>,
}

/// Body of `POST /auth/refresh`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// The renewal credential.
    pub refresh_token: String,
}

/// Payload of a successful renewal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// Fresh access token.
    pub access_token: String,
    /// Its absolute expiry.
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        serde_json::from_value(serde_json::json!({
            "id": "u1",
            "tenantId": "t1",
            "email": "ops@example.com",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "role": "operator"
        }))
        .unwrap()
    }

    #[test]
    fn user_deserializes_with_defaults() {
        let u = user();
        assert_eq!(u.id.as_str(), "u1");
        assert_eq!(u.role, UserRole::Operator);
        assert_eq!(u.status, UserStatus::Active);
        assert!(u.avatar.is_none());
    }

    #[test]
    fn apply_patch_only_touches_given_fields() {
        let mut u = user();
        u.apply(&UserPatch {
            phone: Some("+15550100".into()),
            ..UserPatch::default()
        });
        assert_eq!(u.phone.as_deref(), Some("+15550100"));
        assert_eq!(u.first_name, "Ada");
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let mut u = user();
        assert_eq!(u.display_name(), "Ada Lovelace");
        u.first_name.clear();
        u.last_name.clear();
        assert_eq!(u.display_name(), "ops@example.com");
    }

    #[test]
    fn tokens_expiry() {
        let now = Utc::now();
        let tokens = AuthTokens {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: now,
        };
        assert!(tokens.is_expired_at(now));
        assert!(!tokens.is_expired_at(now - chrono::Duration::seconds(1)));
    }

    #[test]
    fn login_request_wire_format() {
        let req = LoginRequest {
            email: "a@b.c".into(),
            password: "pw".into(),
            remember_me: true,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["rememberMe"], true);
    }

    #[test]
    fn refresh_response_parses_rfc3339() {
        let r: RefreshResponse = serde_json::from_str(
            r#"{"accessToken":"new","expiresAt":"2025-06-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(r.access_token, "new");
        assert_eq!(r.expires_at.to_rfc3339(), "2025-06-01T12:00:00+00:00");
    }
}

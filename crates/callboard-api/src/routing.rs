//! Path-prefix routing to backend services.

use callboard_settings::ApiSettings;

/// Backend service that owns a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Service {
    /// `/auth`, `/users`, and anything unrecognised.
    Auth,
    /// `/calls`, `/conversations`, `/dashboard`.
    Call,
    /// `/tenants`.
    Tenant,
    /// `/phone-numbers`.
    Phone,
}

impl Service {
    /// Service owning `path`.
    pub fn for_path(path: &str) -> Self {
        let prefixed = |p: &str| path.starts_with(p);
        if prefixed("/auth") || prefixed("/users") {
            Self::Auth
        } else if prefixed("/tenants") {
            Self::Tenant
        } else if prefixed("/calls") || prefixed("/conversations") || prefixed("/dashboard") {
            Self::Call
        } else if prefixed("/phone-numbers") {
            Self::Phone
        } else {
            Self::Auth
        }
    }
}

/// Base URL per service.
#[derive(Clone, Debug)]
pub struct ServiceUrls {
    auth: String,
    call: String,
    tenant: String,
    phone: String,
}

impl ServiceUrls {
    /// Build from settings, trimming trailing slashes.
    pub fn from_settings(settings: &ApiSettings) -> Self {
        let trim = |s: &str| s.trim_end_matches('/').to_string();
        Self {
            auth: trim(&settings.auth_url),
            call: trim(&settings.call_url),
            tenant: trim(&settings.tenant_url),
            phone: trim(&settings.phone_url),
        }
    }

    /// Every service at one base URL.
    pub fn single(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            auth: base.clone(),
            call: base.clone(),
            tenant: base.clone(),
            phone: base,
        }
    }

    /// Base URL of `service`.
    pub fn base(&self, service: Service) -> &str {
        match service {
            Service::Auth => &self.auth,
            Service::Call => &self.call,
            Service::Tenant => &self.tenant,
            Service::Phone => &self.phone,
        }
    }

    /// Absolute URL for `path`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.base(Service::for_path(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_prefix() {
        assert_eq!(Service::for_path("/auth/login"), Service::Auth);
        assert_eq!(Service::for_path("/users/profile"), Service::Auth);
        assert_eq!(Service::for_path("/calls/c1"), Service::Call);
        assert_eq!(Service::for_path("/conversations/c1/takeover"), Service::Call);
        assert_eq!(Service::for_path("/dashboard/stats"), Service::Call);
        assert_eq!(Service::for_path("/tenants/current"), Service::Tenant);
        assert_eq!(Service::for_path("/phone-numbers"), Service::Phone);
        assert_eq!(Service::for_path("/health"), Service::Auth);
    }

    #[test]
    fn url_for_joins_base() {
        let urls = ServiceUrls::from_settings(&ApiSettings {
            call_url: "https://calls.example.com/api/".into(),
            ..ApiSettings::default()
        });
        assert_eq!(
            urls.url_for("/calls?page=1"),
            "https://calls.example.com/api/calls?page=1"
        );
        assert_eq!(
            urls.url_for("/auth/login"),
            "http://localhost:3101/api/auth/login"
        );
    }
}

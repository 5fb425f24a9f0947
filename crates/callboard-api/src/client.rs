//! Shared HTTP plumbing: routing, timeout, envelope decoding.

use callboard_core::types::{ApiEnvelope, ResponseMeta};
use callboard_settings::ApiSettings;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::errors::ApiError;
use crate::routing::ServiceUrls;

/// A decoded successful envelope.
#[derive(Debug)]
pub struct Decoded<T> {
    /// `data`, if present.
    pub data: Option<T>,
    /// `meta`, if present.
    pub meta: Option<ResponseMeta>,
}

impl<T> Decoded<T> {
    /// `data`, or a decode error naming `what`.
    pub fn require(self, what: &str) -> Result<T, ApiError> {
        self.data
            .ok_or_else(|| ApiError::Decode(format!("{what}: response has no data")))
    }
}

/// One outgoing request.
#[derive(Debug)]
pub struct ApiRequest<'a> {
    method: Method,
    path: &'a str,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl<'a> ApiRequest<'a> {
    /// `GET path`.
    pub fn get(path: &'a str) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST path`.
    pub fn post(path: &'a str) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PATCH path`.
    pub fn patch(path: &'a str) -> Self {
        Self::new(Method::PATCH, path)
    }

    fn new(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    /// Append query pairs.
    #[must_use]
    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Set a JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// HTTP client bound to the backend services.
#[derive(Clone, Debug)]
pub struct HttpClient {
    http: reqwest::Client,
    urls: ServiceUrls,
}

impl HttpClient {
    /// Build a client with the configured timeout and service URLs.
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        Self::with_urls(ServiceUrls::from_settings(settings), settings)
    }

    /// Build a client with explicit service URLs.
    pub fn with_urls(urls: ServiceUrls, settings: &ApiSettings) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { http, urls })
    }

    /// Send `req`, optionally with a bearer token, and decode the envelope.
    pub async fn send<T: DeserializeOwned>(
        &self,
        req: &ApiRequest<'_>,
        bearer: Option<&str>,
    ) -> Result<Decoded<T>, ApiError> {
        let url = self.urls.url_for(req.path);
        debug!(method = %req.method, %url, "api request");

        let mut builder = self.http.request(req.method.clone(), &url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        let resp = builder.send().await.map_err(|e| ApiError::from_transport(&e))?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| ApiError::from_transport(&e))?;
        decode(status, &text)
    }
}

/// Classify a response by status and envelope.
pub fn decode<T: DeserializeOwned>(status: u16, body: &str) -> Result<Decoded<T>, ApiError> {
    if status == 401 {
        return Err(ApiError::Unauthorized);
    }

    let envelope = serde_json::from_str::<ApiEnvelope<Value>>(body);

    if status >= 500 {
        let message = envelope
            .ok()
            .and_then(|e| e.error)
            .map_or_else(|| body.to_string(), |e| e.message);
        return Err(ApiError::Server { status, message });
    }

    let envelope = match envelope {
        Ok(e) => e,
        Err(_) if status >= 400 => {
            return Err(ApiError::Rejected {
                status,
                code: String::new(),
                message: body.to_string(),
            });
        }
        Err(e) => return Err(ApiError::Decode(e.to_string())),
    };

    if !envelope.success || status >= 400 {
        let error = envelope.error.unwrap_or_default();
        return Err(ApiError::Rejected {
            status,
            code: error.code,
            message: error.message,
        });
    }

    let data = match envelope.data {
        None | Some(Value::Null) => None,
        Some(v) => Some(serde_json::from_value(v).map_err(|e| ApiError::Decode(e.to_string()))?),
    };
    Ok(Decoded {
        data,
        meta: envelope.meta,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn decode_success() {
        let d: Decoded<Vec<u32>> = decode(200, r#"{"success":true,"data":[1]}"#).unwrap();
        assert_eq!(d.data, Some(vec![1]));
        assert!(d.meta.is_none());
    }

    #[test]
    fn decode_unauthorized() {
        assert_matches!(decode::<Value>(401, ""), Err(ApiError::Unauthorized));
    }

    #[test]
    fn decode_server_error_uses_envelope_message() {
        let r = decode::<Value>(
            503,
            r#"{"success":false,"error":{"code":"DOWN","message":"maintenance"}}"#,
        );
        assert_matches!(r, Err(ApiError::Server { status: 503, message }) if message == "maintenance");
    }

    #[test]
    fn decode_server_error_plain_body() {
        let r = decode::<Value>(502, "bad gateway");
        assert_matches!(r, Err(ApiError::Server { message, .. }) if message == "bad gateway");
    }

    #[test]
    fn decode_business_rejection() {
        let r = decode::<Value>(
            200,
            r#"{"success":false,"error":{"code":"TAKEOVER_EXISTS","message":"already requested"}}"#,
        );
        assert_matches!(r, Err(ApiError::Rejected { status: 200, code, .. }) if code == "TAKEOVER_EXISTS");
    }

    #[test]
    fn decode_4xx_non_envelope() {
        let r = decode::<Value>(404, "Not Found");
        assert_matches!(r, Err(ApiError::Rejected { status: 404, .. }));
    }

    #[test]
    fn decode_bad_json_on_success() {
        assert_matches!(decode::<Value>(200, "<html>"), Err(ApiError::Decode(_)));
    }

    #[test]
    fn decode_wrong_data_shape() {
        let r = decode::<Vec<u32>>(200, r#"{"success":true,"data":{"x":1}}"#);
        assert_matches!(r, Err(ApiError::Decode(_)));
    }

    #[test]
    fn require_missing_data() {
        let d: Decoded<u32> = decode(200, r#"{"success":true}"#).unwrap();
        assert_matches!(d.require("stats"), Err(ApiError::Decode(m)) if m.contains("stats"));
    }
}

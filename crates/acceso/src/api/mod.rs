//! HTTP client for the REST API under test.
//!
//! Every request carries `Authorization: Bearer <key>` and
//! `Content-Type: application/json` unless the caller overrides them. The
//! response comes back exactly as the server sent it: no status
//! interpretation, no retries.

pub mod users;

pub use users::UsersApi;

use crate::config::{Settings, DEFAULT_API_BASE_URL};
use crate::result::{AccesoError, AccesoResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where requests go and how they authenticate
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL; request paths are appended verbatim
    pub base_url: String,
    /// Bearer token
    pub api_key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: SecretString::from(""),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ApiConfig {
    /// Config for `base_url` authenticating with `api_key`
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let api_key: String = api_key.into();
        Self {
            base_url: base_url.into(),
            api_key: SecretString::from(api_key),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// API settings of a loaded profile
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.api_base_url.clone(),
            api_key: settings.api_key.clone(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A response, unmodified
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// HTTP status code
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// 2xx status
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Header value, if present and valid UTF-8
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Deserialize the body
    pub fn json<T: DeserializeOwned>(&self) -> AccesoResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as an untyped JSON value
    pub fn json_value(&self) -> AccesoResult<serde_json::Value> {
        self.json()
    }

    /// Body as text (lossy)
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Authenticated JSON client
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiConfig,
    client: reqwest::Client,
}

impl ApiClient {
    /// Client for `config`
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// Client for the API of a loaded profile
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(ApiConfig::from_settings(settings))
    }

    /// Current base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Current bearer token
    #[must_use]
    pub const fn api_key(&self) -> &SecretString {
        &self.config.api_key
    }

    /// Replace the bearer token for subsequent requests
    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        let api_key: String = api_key.into();
        self.config.api_key = SecretString::from(api_key);
    }

    /// Replace the base URL for subsequent requests
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.config.base_url = base_url.into();
    }

    /// Typed access to `/users`
    #[must_use]
    pub const fn users(&self) -> UsersApi<'_> {
        UsersApi::new(self)
    }

    /// Defaults overridden key-by-key by `extra`. Names compare
    /// case-insensitively.
    pub fn effective_headers(&self, extra: &[(&str, &str)]) -> AccesoResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", self.config.api_key.expose_secret());
        headers.insert(AUTHORIZATION, header_value("Authorization", &bearer)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in extra {
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                AccesoError::InvalidHeader {
                    name: (*name).to_string(),
                    message: e.to_string(),
                }
            })?;
            headers.insert(header, header_value(name, value)?);
        }
        Ok(headers)
    }

    /// GET `path`
    pub async fn get(&self, path: &str, headers: &[(&str, &str)]) -> AccesoResult<ApiResponse> {
        self.send(Method::GET, path, None, headers).await
    }

    /// POST `body` to `path`
    pub async fn post(
        &self,
        path: &str,
        body: Option<&serde_json::Value>,
        headers: &[(&str, &str)],
    ) -> AccesoResult<ApiResponse> {
        self.send(Method::POST, path, body, headers).await
    }

    /// PUT `body` to `path`
    pub async fn put(
        &self,
        path: &str,
        body: Option<&serde_json::Value>,
        headers: &[(&str, &str)],
    ) -> AccesoResult<ApiResponse> {
        self.send(Method::PUT, path, body, headers).await
    }

    /// PATCH `body` to `path`
    pub async fn patch(
        &self,
        path: &str,
        body: Option<&serde_json::Value>,
        headers: &[(&str, &str)],
    ) -> AccesoResult<ApiResponse> {
        self.send(Method::PATCH, path, body, headers).await
    }

    /// DELETE `path`
    pub async fn delete(&self, path: &str, headers: &[(&str, &str)]) -> AccesoResult<ApiResponse> {
        self.send(Method::DELETE, path, None, headers).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        headers: &[(&str, &str)],
    ) -> AccesoResult<ApiResponse> {
        let url = format!("{}{path}", self.config.base_url);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .headers(self.effective_headers(headers)?);
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            %method,
            %url,
            status,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "api request"
        );
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

fn header_value(name: &str, value: &str) -> AccesoResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| AccesoError::InvalidHeader {
        name: name.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::result::FailureKind;
    use proptest::prelude::*;

    fn client() -> ApiClient {
        ApiClient::new(ApiConfig::new("http://api.test", "k3y"))
    }

    mod header_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let headers = client().effective_headers(&[]).unwrap();
            assert_eq!(headers["authorization"], "Bearer k3y");
            assert_eq!(headers["content-type"], "application/json");
            assert_eq!(headers.len(), 2);
        }

        #[test]
        fn test_override_is_case_insensitive() {
            let headers = client()
                .effective_headers(&[("AUTHORIZATION", "Basic abc"), ("X-Trace", "1")])
                .unwrap();
            assert_eq!(headers["authorization"], "Basic abc");
            assert_eq!(headers.get_all("authorization").iter().count(), 1);
            assert_eq!(headers["x-trace"], "1");
            assert_eq!(headers["content-type"], "application/json");
        }

        #[test]
        fn test_empty_key_still_sends_bearer() {
            let client = ApiClient::new(ApiConfig::new("http://api.test", ""));
            let headers = client.effective_headers(&[]).unwrap();
            assert_eq!(headers["authorization"], "Bearer ");
        }

        #[test]
        fn test_invalid_header_name() {
            let err = client().effective_headers(&[("bad header", "x")]).unwrap_err();
            assert!(matches!(err, AccesoError::InvalidHeader { .. }));
            assert_eq!(err.kind(), FailureKind::Transport);
        }

        #[test]
        fn test_setters_affect_only_this_instance() {
            let original = client();
            let mut changed = original.clone();
            changed.set_api_key("other");
            changed.set_base_url("http://elsewhere.test");
            assert_eq!(original.api_key().expose_secret(), "k3y");
            assert_eq!(original.base_url(), "http://api.test");
            assert_eq!(
                changed.effective_headers(&[]).unwrap()["authorization"],
                "Bearer other"
            );
        }

        #[test]
        fn test_from_settings() {
            let settings = Settings {
                api_base_url: "http://staging-api.test".into(),
                api_key: SecretString::from("s3cret"),
                ..Settings::default()
            };
            let client = ApiClient::from_settings(&settings);
            assert_eq!(client.base_url(), "http://staging-api.test");
            assert_eq!(client.api_key().expose_secret(), "s3cret");
        }
    }

    mod response_tests {
        use super::*;

        fn response(body: &str) -> ApiResponse {
            ApiResponse {
                status: 201,
                headers: HeaderMap::new(),
                body: body.as_bytes().to_vec(),
            }
        }

        #[test]
        fn test_json_helpers() {
            let r = response(r#"{"id": 7}"#);
            assert!(r.is_success());
            assert_eq!(r.json_value().unwrap()["id"], 7);
            assert_eq!(r.text(), r#"{"id": 7}"#);
        }

        #[test]
        fn test_json_error_on_non_json_body() {
            let err = response("<html>").json_value().unwrap_err();
            assert!(matches!(err, AccesoError::Json(_)));
        }
    }

    proptest! {
        #[test]
        fn prop_effective_headers_override_key_by_key(
            key in "[A-Za-z0-9]{0,16}",
            extra in proptest::collection::vec(
                (
                    prop_oneof![
                        Just("authorization".to_string()),
                        Just("content-type".to_string()),
                        "[a-z][a-z0-9-]{0,10}",
                    ],
                    "[a-zA-Z0-9 ]{0,12}",
                ),
                0..6,
            ),
            shout in any::<bool>(),
        ) {
            let client = ApiClient::new(ApiConfig::new("http://api.test", key.clone()));
            let pairs: Vec<(String, String)> = extra
                .iter()
                .map(|(n, v)| (if shout { n.to_uppercase() } else { n.clone() }, v.trim().to_string()))
                .collect();
            let borrowed: Vec<(&str, &str)> = pairs.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
            let headers = client.effective_headers(&borrowed).unwrap();

            for (name, _) in &pairs {
                let last = pairs
                    .iter()
                    .rev()
                    .find(|(n, _)| n.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v.as_str())
                    .unwrap();
                prop_assert_eq!(headers.get(name.as_str()).unwrap().to_str().unwrap(), last);
            }
            if !pairs.iter().any(|(n, _)| n.eq_ignore_ascii_case("authorization")) {
                let expected = format!("Bearer {key}");
                prop_assert_eq!(headers["authorization"].to_str().unwrap(), expected.as_str());
            }
            if !pairs.iter().any(|(n, _)| n.eq_ignore_ascii_case("content-type")) {
                prop_assert_eq!(headers["content-type"].to_str().unwrap(), "application/json");
            }
        }
    }
}

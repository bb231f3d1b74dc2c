//! HTTP client for the hosted backend (REST tables + auth service).
//!
//! Every request carries the project's anon key as `apikey` and a bearer
//! token: the user's access token when signed in, the anon key otherwise.

pub mod auth;
mod error;
pub mod rest;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

pub use self::auth::{AuthApi, AuthSession, AuthUser, SignUpResponse};
pub use self::error::{BackendError, BackendErrorKind, BackendResult, UNIQUE_VIOLATION};
pub use self::rest::Rest;
use crate::config::ResolvedBackend;

/// Standard User-Agent header for pollr requests.
pub const USER_AGENT: &str = concat!("pollr/", env!("CARGO_PKG_VERSION"));

const REST_PATH: &str = "/rest/v1";
const AUTH_PATH: &str = "/auth/v1";

/// Connection to one backend project. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Backend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl Backend {
    pub fn new(settings: &ResolvedBackend) -> Self {
        Self::with_base_url(&settings.url, &settings.anon_key)
    }

    pub fn with_base_url(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Auth service endpoints.
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    /// Table endpoints, authorized with `access_token` when given.
    pub fn rest(&self, access_token: Option<&str>) -> Rest<'_> {
        Rest::new(self, access_token.map(ToString::to_string))
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}{REST_PATH}/{table}", self.base_url)
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}{AUTH_PATH}/{endpoint}", self.base_url)
    }

    fn headers(&self, access_token: Option<&str>) -> HeaderMap {
        let bearer = access_token.unwrap_or(&self.anon_key);
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.anon_key).unwrap_or_else(|_| HeaderValue::from_static("")),
        );
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {bearer}"))
                .unwrap_or_else(|_| HeaderValue::from_static("")),
        );
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        headers
    }
}

/// Sends a request and decodes a JSON body.
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> BackendResult<T> {
    let response = checked(request).await?;
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| BackendError::parse(format!("Failed to parse response: {e}")))
}

/// Sends a request whose body, if any, is ignored.
async fn send_empty(request: RequestBuilder) -> BackendResult<()> {
    checked(request).await?;
    Ok(())
}

async fn checked(request: RequestBuilder) -> BackendResult<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let err = BackendError::http_status(status.as_u16(), &body);
    tracing::debug!(status = status.as_u16(), code = ?err.code, "backend request failed");
    Err(err)
}

//! Structured errors returned by the hosted backend.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Postgres `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Auth error codes that mean "wrong email or password".
const INVALID_CREDENTIAL_CODES: &[&str] = &["invalid_credentials", "invalid_grant"];

/// Categories of backend errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Request timed out
    Timeout,
    /// Connection failed or the request never completed
    Network,
    /// Response body could not be decoded
    Parse,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendErrorKind::HttpStatus => write!(f, "http_status"),
            BackendErrorKind::Timeout => write!(f, "timeout"),
            BackendErrorKind::Network => write!(f, "network"),
            BackendErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Error from the REST or auth endpoints.
///
/// `message` is the backend's own wording and is shown to users verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendError {
    pub kind: BackendErrorKind,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Machine-readable code (Postgres SQLSTATE or auth `error_code`)
    pub code: Option<String>,
    /// One-line summary suitable for display
    pub message: String,
    /// Raw body or extra context
    pub details: Option<String>,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            code: None,
            message: message.into(),
            details: None,
        }
    }

    /// Builds an error from a non-success response.
    ///
    /// Understands both the REST error shape (`code`, `message`, `details`)
    /// and the auth shapes (`error_code`/`msg`, `error`/`error_description`).
    pub fn http_status(status: u16, body: &str) -> Self {
        let mut err = Self {
            kind: BackendErrorKind::HttpStatus,
            status: Some(status),
            code: None,
            message: format!("HTTP {status}"),
            details: (!body.is_empty()).then(|| body.to_string()),
        };

        let Ok(json) = serde_json::from_str::<Value>(body) else {
            return err;
        };

        let str_field = |key: &str| {
            json.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
        };

        err.code = str_field("error_code")
            .or_else(|| str_field("code"))
            .or_else(|| str_field("error"));
        if let Some(message) = str_field("msg")
            .or_else(|| str_field("message"))
            .or_else(|| str_field("error_description"))
            .or_else(|| str_field("error"))
        {
            err.message = message;
        }
        if let Some(details) = str_field("details") {
            err.details = Some(details);
        }
        err
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Parse, message)
    }

    /// True for a Postgres unique-constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some(UNIQUE_VIOLATION)
    }

    /// True when the auth service rejected the email/password pair.
    pub fn is_invalid_credentials(&self) -> bool {
        if let Some(code) = self.code.as_deref()
            && INVALID_CREDENTIAL_CODES.contains(&code)
        {
            return true;
        }
        self.status == Some(400) && self.message.contains("Invalid login credentials")
    }

    /// True when the backend refused the credentials themselves (400, 401,
    /// 403). Rate limits, timeouts and server errors are not rejections.
    pub fn is_rejection(&self) -> bool {
        self.kind == BackendErrorKind::HttpStatus
            && matches!(self.status, Some(400 | 401 | 403))
    }

    /// True when the request never produced a usable response.
    pub fn is_network(&self) -> bool {
        matches!(
            self.kind,
            BackendErrorKind::Network | BackendErrorKind::Timeout
        )
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BackendError {}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::new(BackendErrorKind::Timeout, format!("Request timed out: {e}"))
        } else if e.is_connect() {
            BackendError::new(BackendErrorKind::Network, format!("Connection failed: {e}"))
        } else if e.is_decode() {
            BackendError::parse(format!("Failed to decode response: {e}"))
        } else {
            BackendError::new(BackendErrorKind::Network, format!("Request failed: {e}"))
        }
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

//! Auth service endpoints (`/auth/v1`).

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{Backend, BackendResult, send_empty, send_json};
use crate::model::UserProfile;

/// User object as returned by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<AuthUser> for UserProfile {
    fn from(user: AuthUser) -> Self {
        UserProfile {
            id: user.id,
            email: user.email,
        }
    }
}

/// Token grant returned by sign-in, refresh and auto-confirmed sign-up.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds
    pub expires_in: u64,
    /// Absolute expiry (unix seconds), when the server sends it
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

/// Sign-up either creates a live session or waits for email confirmation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(AuthSession),
    ConfirmationPending(AuthUser),
}

/// Borrowed view over the auth endpoints of a [`Backend`].
pub struct AuthApi<'a> {
    backend: &'a Backend,
}

impl<'a> AuthApi<'a> {
    pub(super) fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Password grant.
    ///
    /// # Errors
    /// Returns the backend's error (e.g. `invalid_credentials`).
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<AuthSession> {
        let request = self
            .backend
            .http
            .post(self.backend.auth_url("token"))
            .query(&[("grant_type", "password")])
            .headers(self.backend.headers(None))
            .json(&json!({ "email": email, "password": password }));
        send_json(request).await
    }

    /// Refresh-token grant.
    ///
    /// # Errors
    /// Returns the backend's error when the refresh token is rejected.
    pub async fn refresh(&self, refresh_token: &str) -> BackendResult<AuthSession> {
        let request = self
            .backend
            .http
            .post(self.backend.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .headers(self.backend.headers(None))
            .json(&json!({ "refresh_token": refresh_token }));
        send_json(request).await
    }

    /// # Errors
    /// Returns the backend's error (e.g. user already registered).
    pub async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpResponse> {
        let request = self
            .backend
            .http
            .post(self.backend.auth_url("signup"))
            .headers(self.backend.headers(None))
            .json(&json!({ "email": email, "password": password }));
        send_json(request).await
    }

    /// Revokes the session behind `access_token`.
    ///
    /// # Errors
    /// Returns the backend's error.
    pub async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        let request = self
            .backend
            .http
            .post(self.backend.auth_url("logout"))
            .headers(self.backend.headers(Some(access_token)));
        send_empty(request).await
    }

    /// # Errors
    /// Returns the backend's error (e.g. expired token).
    pub async fn get_user(&self, access_token: &str) -> BackendResult<AuthUser> {
        let request = self
            .backend
            .http
            .get(self.backend.auth_url("user"))
            .headers(self.backend.headers(Some(access_token)));
        send_json(request).await
    }

    /// # Errors
    /// Returns the backend's error (e.g. weak password).
    pub async fn update_password(
        &self,
        access_token: &str,
        password: &str,
    ) -> BackendResult<AuthUser> {
        let request = self
            .backend
            .http
            .put(self.backend.auth_url("user"))
            .headers(self.backend.headers(Some(access_token)))
            .json(&json!({ "password": password }));
        send_json(request).await
    }

    /// Sends a password reset email.
    ///
    /// # Errors
    /// Returns the backend's error (e.g. rate limited).
    pub async fn recover(&self, email: &str, redirect_to: Option<&str>) -> BackendResult<()> {
        let mut request = self
            .backend
            .http
            .post(self.backend.auth_url("recover"))
            .headers(self.backend.headers(None))
            .json(&json!({ "email": email }));
        if let Some(redirect) = redirect_to {
            request = request.query(&[("redirect_to", redirect)]);
        }
        send_empty(request).await
    }
}

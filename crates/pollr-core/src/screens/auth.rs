//! Login, password reset, and password update forms.

use super::{Alert, AlertKind, AppContext, Route};
use crate::session::{AuthError, MSG_UNEXPECTED, SignUpOutcome};

pub const MSG_RESET_SENT: &str =
    "Password reset email sent. Check your inbox for further instructions.";
pub const MSG_PASSWORD_UPDATED: &str = "Password updated successfully";
pub const MSG_PASSWORD_UPDATED_DETAIL: &str =
    "Your password has been updated. You can now log in with your new password.";

fn alert_for(title: &str, err: &AuthError) -> Alert {
    match err {
        AuthError::Validation(msg) => Alert::error("Error", *msg),
        AuthError::Unexpected(_) => Alert::error("Error", MSG_UNEXPECTED),
        other => Alert::error(title, other.user_message()),
    }
}

/// Email + password with sign-in and sign-up actions.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    loading: bool,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// # Errors
    /// Returns the alert to show; the form stays as it was.
    pub async fn sign_in(&mut self, ctx: &AppContext) -> Result<Route, Alert> {
        self.loading = true;
        let result = ctx.session.sign_in(&self.email, &self.password).await;
        self.loading = false;
        match result {
            Ok(_) => Ok(Route::PollList),
            Err(err) => Err(alert_for("Sign In Error", &err)),
        }
    }

    /// On success returns the message to show and, when a session was
    /// created, where to go next.
    ///
    /// # Errors
    /// Returns the alert to show.
    pub async fn sign_up(&mut self, ctx: &AppContext) -> Result<(Alert, Option<Route>), Alert> {
        self.loading = true;
        let result = ctx.session.sign_up(&self.email, &self.password).await;
        self.loading = false;
        match result {
            Ok(outcome) => {
                let route = matches!(outcome, SignUpOutcome::SignedIn(_)).then_some(Route::PollList);
                Ok((Alert::info("Success", outcome.message()), route))
            }
            Err(err) => Err(alert_for("Sign Up Error", &err)),
        }
    }

    pub fn forgot_password() -> Route {
        Route::ResetPassword
    }
}

/// Inline message under a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormMessage {
    pub kind: AlertKind,
    pub text: String,
}

impl FormMessage {
    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            text: text.into(),
        }
    }

    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Info,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == AlertKind::Error
    }
}

fn message_for(err: &AuthError) -> FormMessage {
    FormMessage::error(err.user_message())
}

#[derive(Debug, Clone, Default)]
pub struct ResetPasswordForm {
    pub email: String,
    message: Option<FormMessage>,
    loading: bool,
}

impl ResetPasswordForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(&self) -> Option<&FormMessage> {
        self.message.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Requests the reset email. The outcome is left in
    /// [`Self::message`] and also returned.
    pub async fn submit(&mut self, ctx: &AppContext) -> &FormMessage {
        self.loading = true;
        let redirect = ctx.config.auth.password_reset_redirect.as_deref();
        let result = ctx
            .session
            .request_password_reset(&self.email, redirect)
            .await;
        self.loading = false;

        let message = match result {
            Ok(()) => FormMessage::success(MSG_RESET_SENT),
            Err(err) => message_for(&err),
        };
        self.message.insert(message)
    }

    pub fn back() -> Route {
        Route::Login
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePasswordForm {
    password: String,
    confirm: String,
    message: Option<FormMessage>,
    loading: bool,
}

impl UpdatePasswordForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Editing either field clears a previous error.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
        self.clear_error();
    }

    pub fn set_confirm(&mut self, confirm: impl Into<String>) {
        self.confirm = confirm.into();
        self.clear_error();
    }

    fn clear_error(&mut self) {
        if self.message.as_ref().is_some_and(FormMessage::is_error) {
            self.message = None;
        }
    }

    pub fn message(&self) -> Option<&FormMessage> {
        self.message.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// On success the fields are cleared and the returned alert offers
    /// navigation to login.
    ///
    /// # Errors
    /// The failure is left in [`Self::message`]; the error variant carries
    /// the same text.
    pub async fn submit(&mut self, ctx: &AppContext) -> Result<(Alert, Route), String> {
        self.message = None;
        self.loading = true;
        let result = ctx
            .session
            .update_password(&self.password, &self.confirm)
            .await;
        self.loading = false;

        match result {
            Ok(()) => {
                self.password.clear();
                self.confirm.clear();
                self.message = Some(FormMessage::success(MSG_PASSWORD_UPDATED));
                Ok((
                    Alert::info("Success", MSG_PASSWORD_UPDATED_DETAIL),
                    Route::Login,
                ))
            }
            Err(err) => {
                let message = message_for(&err);
                let text = message.text.clone();
                self.message = Some(message);
                Err(text)
            }
        }
    }

    pub fn cancel() -> Route {
        Route::Login
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, BackendErrorKind};
    use crate::validation::MSG_CREDENTIALS_REQUIRED;

    #[test]
    fn test_alert_titles() {
        let validation = alert_for("Sign In Error", &AuthError::Validation(MSG_CREDENTIALS_REQUIRED));
        assert_eq!(validation.title, "Error");
        assert_eq!(validation.message, MSG_CREDENTIALS_REQUIRED);

        let backend = AuthError::Backend(BackendError::new(
            BackendErrorKind::HttpStatus,
            "User already registered",
        ));
        let alert = alert_for("Sign Up Error", &backend);
        assert_eq!(alert.to_string(), "Sign Up Error: User already registered");

        let unexpected = alert_for("Sign In Error", &AuthError::Unexpected(anyhow::anyhow!("boom")));
        assert_eq!(unexpected.message, MSG_UNEXPECTED);
    }

    #[test]
    fn test_editing_clears_error_only() {
        let mut form = UpdatePasswordForm::new();
        form.message = Some(FormMessage::error("Passwords do not match"));
        form.set_confirm("abcdef");
        assert_eq!(form.message(), None);

        form.message = Some(FormMessage::success(MSG_PASSWORD_UPDATED));
        form.set_password("x");
        assert!(form.message().is_some());
    }
}

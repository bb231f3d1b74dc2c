//! Local form validation, run before any network call.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_POLL_OPTIONS: usize = 2;

pub const MSG_CREDENTIALS_REQUIRED: &str = "Please enter both email and password";
pub const MSG_PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters";
pub const MSG_EMAIL_REQUIRED: &str = "Please enter your email address";
pub const MSG_BOTH_FIELDS_REQUIRED: &str = "Please enter both fields";
pub const MSG_PASSWORDS_DIFFER: &str = "Passwords do not match";
pub const MSG_QUESTION_REQUIRED: &str = "Please provide a question";
pub const MSG_OPTIONS_REQUIRED: &str = "Please provide at least two options";
pub const MSG_OPTIONS_DUPLICATE: &str = "Options must be unique";

/// Poll form fields that can carry an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PollField {
    Question,
    Options,
}

impl fmt::Display for PollField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollField::Question => f.write_str("question"),
            PollField::Options => f.write_str("options"),
        }
    }
}

/// Every failing check, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<PollField, String>);

impl ValidationErrors {
    pub fn get(&self, field: PollField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PollField, &str)> {
        self.0.iter().map(|(field, msg)| (*field, msg.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.values().map(String::as_str).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// A poll that passed validation: trimmed question, trimmed non-empty
/// options in their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPoll {
    pub question: String,
    pub options: Vec<String>,
}

/// Checks a poll draft. All checks run; failures are collected per field.
///
/// # Errors
/// Returns every failing check.
pub fn validate_poll<S: AsRef<str>>(
    question: &str,
    options: &[S],
) -> Result<ValidPoll, ValidationErrors> {
    let mut errors = BTreeMap::new();

    let question = question.trim();
    if question.is_empty() {
        errors.insert(PollField::Question, MSG_QUESTION_REQUIRED.to_string());
    }

    let filled: Vec<String> = options
        .iter()
        .map(|o| o.as_ref().trim())
        .filter(|o| !o.is_empty())
        .map(ToString::to_string)
        .collect();

    if filled.len() < MIN_POLL_OPTIONS {
        errors.insert(PollField::Options, MSG_OPTIONS_REQUIRED.to_string());
    } else {
        let mut seen = HashSet::new();
        if !filled.iter().all(|o| seen.insert(o.to_lowercase())) {
            errors.insert(PollField::Options, MSG_OPTIONS_DUPLICATE.to_string());
        }
    }

    if errors.is_empty() {
        Ok(ValidPoll {
            question: question.to_string(),
            options: filled,
        })
    } else {
        Err(ValidationErrors(errors))
    }
}

/// Sign-in requires both fields.
///
/// # Errors
/// Returns the message to show.
pub fn validate_sign_in(email: &str, password: &str) -> Result<(), &'static str> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(MSG_CREDENTIALS_REQUIRED);
    }
    Ok(())
}

/// Sign-up additionally enforces the minimum password length.
///
/// # Errors
/// Returns the message to show.
pub fn validate_sign_up(email: &str, password: &str) -> Result<(), &'static str> {
    validate_sign_in(email, password)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(MSG_PASSWORD_TOO_SHORT);
    }
    Ok(())
}

/// # Errors
/// Returns the message to show.
pub fn validate_reset_email(email: &str) -> Result<(), &'static str> {
    if email.trim().is_empty() {
        return Err(MSG_EMAIL_REQUIRED);
    }
    Ok(())
}

/// New password and its confirmation.
///
/// # Errors
/// Returns the first failing check's message.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), &'static str> {
    if password.is_empty() || confirm.is_empty() {
        return Err(MSG_BOTH_FIELDS_REQUIRED);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(MSG_PASSWORD_TOO_SHORT);
    }
    if password != confirm {
        return Err(MSG_PASSWORDS_DIFFER);
    }
    Ok(())
}

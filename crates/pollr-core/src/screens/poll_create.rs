//! Poll creation form.

use chrono::Utc;

use super::{Alert, AppContext, Route};
use crate::model::NewPoll;
use crate::validation::{self, PollField, ValidationErrors};

/// Why a submit did not create a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Local checks failed; nothing was sent
    Invalid(ValidationErrors),
    /// The backend refused the insert
    Backend(Alert),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollForm {
    question: String,
    options: Vec<String>,
    errors: ValidationErrors,
}

impl Default for PollForm {
    fn default() -> Self {
        Self {
            question: String::new(),
            options: vec![String::new(); validation::MIN_POLL_OPTIONS],
            errors: ValidationErrors::default(),
        }
    }
}

impl PollForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn set_question(&mut self, question: impl Into<String>) {
        self.question = question.into();
    }

    /// Appends a blank option and returns its index.
    pub fn add_option(&mut self) -> usize {
        self.options.push(String::new());
        self.options.len() - 1
    }

    /// Returns false if `index` is out of range.
    pub fn set_option(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.options.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn remove_option(&mut self, index: usize) -> Option<String> {
        (index < self.options.len()).then(|| self.options.remove(index))
    }

    pub fn error(&self, field: PollField) -> Option<&str> {
        self.errors.get(field)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Runs local checks, storing the per-field errors.
    ///
    /// # Errors
    /// Returns every failing check.
    pub fn validate(&mut self) -> Result<NewPoll, ValidationErrors> {
        match validation::validate_poll(&self.question, self.options.as_slice()) {
            Ok(valid) => {
                self.errors = ValidationErrors::default();
                Ok(NewPoll {
                    question: valid.question,
                    options: valid.options,
                    created_at: Utc::now(),
                })
            }
            Err(errors) => {
                self.errors = errors.clone();
                Err(errors)
            }
        }
    }

    /// Validates and inserts the poll. On success the caller navigates to
    /// the returned route.
    ///
    /// # Errors
    /// `Invalid` without any network call, or `Backend` with the backend's
    /// message.
    pub async fn submit(&mut self, ctx: &AppContext) -> Result<Route, SubmitError> {
        let poll = self.validate().map_err(SubmitError::Invalid)?;

        match ctx.rest().insert_poll(&poll).await {
            Ok(()) => {
                tracing::info!(options = poll.options.len(), "poll created");
                Ok(Route::PollList)
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to create poll");
                Err(SubmitError::Backend(Alert::error("Error", err.message)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{MSG_OPTIONS_REQUIRED, MSG_QUESTION_REQUIRED};

    #[test]
    fn test_starts_with_two_blank_options() {
        let form = PollForm::new();
        assert_eq!(form.options(), ["", ""]);
        assert!(form.errors().is_empty());
    }

    #[test]
    fn test_edit_add_remove() {
        let mut form = PollForm::new();
        assert!(form.set_option(0, "Tea"));
        assert!(form.set_option(1, "Coffee"));
        assert!(!form.set_option(5, "nope"));
        let idx = form.add_option();
        form.set_option(idx, "Water");
        assert_eq!(form.remove_option(1), Some("Coffee".to_string()));
        assert_eq!(form.remove_option(9), None);
        assert_eq!(form.options(), ["Tea", "Water"]);
    }

    #[test]
    fn test_validate_collects_errors_on_form() {
        let mut form = PollForm::new();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.iter().count(), 2);
        assert_eq!(form.error(PollField::Question), Some(MSG_QUESTION_REQUIRED));
        assert_eq!(form.error(PollField::Options), Some(MSG_OPTIONS_REQUIRED));

        form.set_question("Drink?");
        form.set_option(0, " Tea ");
        form.set_option(1, "Coffee");
        let poll = form.validate().unwrap();
        assert!(form.errors().is_empty());
        assert_eq!(poll.question, "Drink?");
        assert_eq!(poll.options, vec!["Tea", "Coffee"]);
    }
}

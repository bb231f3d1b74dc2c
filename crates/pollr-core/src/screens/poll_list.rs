//! Poll list: all polls, newest first.

use super::{Alert, AppContext, Route};
use crate::model::{Poll, UserProfile};

pub const MSG_FETCH_FAILED: &str = "Failed to fetch polls";
pub const MSG_EMPTY: &str = "No polls found";
pub const SIGN_OUT_PROMPT: &str = "Are you sure you want to sign out?";

#[derive(Debug, Default)]
pub struct PollListScreen {
    polls: Vec<Poll>,
    loading: bool,
    loaded: bool,
    confirming_sign_out: bool,
    alert: Option<Alert>,
}

impl PollListScreen {
    pub fn new() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// Fetches the list. On failure the previous list is kept and an alert
    /// is raised.
    pub async fn load(&mut self, ctx: &AppContext) {
        self.loading = true;
        match ctx.rest().list_polls().await {
            Ok(polls) => {
                tracing::debug!(count = polls.len(), "polls loaded");
                self.polls = polls;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch polls");
                self.alert = Some(Alert::error("Error", MSG_FETCH_FAILED));
            }
        }
        self.loading = false;
        self.loaded = true;
    }

    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True once a load finished with nothing to show.
    pub fn is_empty_state(&self) -> bool {
        self.loaded && !self.loading && self.polls.is_empty()
    }

    pub fn welcome(user: Option<&UserProfile>) -> String {
        let name = user.map_or("User", UserProfile::display_name);
        format!("Welcome, {name}!")
    }

    /// Route for the poll at `index` (zero-based) in the current list.
    pub fn open(&self, index: usize) -> Option<Route> {
        self.polls.get(index).map(|poll| Route::PollDetail(poll.id))
    }

    pub fn new_poll() -> Route {
        Route::NewPoll
    }

    pub fn take_alert(&mut self) -> Option<Alert> {
        self.alert.take()
    }

    /// First step of sign-out; the caller shows [`SIGN_OUT_PROMPT`].
    pub fn request_sign_out(&mut self) {
        self.confirming_sign_out = true;
    }

    pub fn is_confirming_sign_out(&self) -> bool {
        self.confirming_sign_out
    }

    pub fn cancel_sign_out(&mut self) {
        self.confirming_sign_out = false;
    }

    /// Signs out if confirmation was requested. Returns where to go next.
    pub async fn confirm_sign_out(&mut self, ctx: &AppContext) -> Option<Route> {
        if !std::mem::take(&mut self.confirming_sign_out) {
            return None;
        }
        ctx.session.sign_out().await;
        Some(Route::Login)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_welcome_uses_local_part() {
        let user = UserProfile {
            id: Uuid::nil(),
            email: Some("grace@example.com".to_string()),
        };
        assert_eq!(PollListScreen::welcome(Some(&user)), "Welcome, grace!");
        assert_eq!(PollListScreen::welcome(None), "Welcome, User!");
    }

    #[test]
    fn test_open_out_of_range() {
        let screen = PollListScreen::new();
        assert!(screen.is_loading());
        assert!(!screen.is_empty_state());
        assert_eq!(screen.open(0), None);
    }

    #[test]
    fn test_cancel_sign_out() {
        let mut screen = PollListScreen::new();
        screen.request_sign_out();
        assert!(screen.is_confirming_sign_out());
        screen.cancel_sign_out();
        assert!(!screen.is_confirming_sign_out());
    }
}

//! Auth gate for protected screens.

use crate::model::UserProfile;
use crate::session::{SessionSnapshot, SessionStore};

/// Outcome of checking the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session resolution still pending
    Loading,
    /// No user: go to login and render nothing
    RedirectToLogin,
    Allow(UserProfile),
}

pub fn evaluate(snapshot: &SessionSnapshot) -> GateDecision {
    match (&snapshot.user, snapshot.loading) {
        (_, true) => GateDecision::Loading,
        (None, false) => GateDecision::RedirectToLogin,
        (Some(user), false) => GateDecision::Allow(user.clone()),
    }
}

/// Waits until the store has finished loading, then decides.
pub async fn resolve(store: &SessionStore) -> GateDecision {
    let mut rx = store.watch();
    if rx.wait_for(|snapshot| !snapshot.loading).await.is_err() {
        return evaluate(&store.snapshot());
    }
    let snapshot = rx.borrow().clone();
    evaluate(&snapshot)
}

/// What a gated screen shows.
#[derive(Debug, PartialEq, Eq)]
pub enum GateView<'a, S> {
    Loading,
    RedirectToLogin,
    Render(&'a S),
}

/// Wraps any screen so it is only shown to a signed-in user.
#[derive(Debug, Clone)]
pub struct Protected<S> {
    content: S,
}

impl<S> Protected<S> {
    pub fn new(content: S) -> Self {
        Self { content }
    }

    /// Re-evaluated for every snapshot; the content is passed through
    /// unchanged when a user is present.
    pub fn view(&self, snapshot: &SessionSnapshot) -> GateView<'_, S> {
        match evaluate(snapshot) {
            GateDecision::Loading => GateView::Loading,
            GateDecision::RedirectToLogin => GateView::RedirectToLogin,
            GateDecision::Allow(_) => GateView::Render(&self.content),
        }
    }

    pub fn into_inner(self) -> S {
        self.content
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn user() -> UserProfile {
        UserProfile {
            id: Uuid::nil(),
            email: Some("ada@example.com".to_string()),
        }
    }

    #[test]
    fn test_loading_blocks_even_with_user() {
        let snapshot = SessionSnapshot {
            user: Some(user()),
            loading: true,
        };
        assert_eq!(evaluate(&snapshot), GateDecision::Loading);
    }

    #[test]
    fn test_no_user_redirects() {
        let gate = Protected::new("poll list");
        let snapshot = SessionSnapshot {
            user: None,
            loading: false,
        };
        assert_eq!(gate.view(&snapshot), GateView::RedirectToLogin);
    }

    #[test]
    fn test_user_renders_content_unchanged() {
        let gate = Protected::new(vec![1, 2, 3]);
        let snapshot = SessionSnapshot {
            user: Some(user()),
            loading: false,
        };
        assert_eq!(gate.view(&snapshot), GateView::Render(&vec![1, 2, 3]));
        assert_eq!(gate.into_inner(), vec![1, 2, 3]);
    }
}

//! Headless screen state.
//!
//! Each screen is a plain state struct plus async actions that talk to the
//! backend through an [`AppContext`]. Front ends render the state and call
//! the actions; navigation is expressed as returned [`Route`]s.

pub mod auth;
pub mod gate;
pub mod poll_create;
pub mod poll_detail;
pub mod poll_list;

use std::fmt;

use crate::backend::{Backend, Rest};
use crate::config::Config;
use crate::model::PollId;
use crate::session::SessionStore;

/// Navigation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    ResetPassword,
    UpdatePassword,
    PollList,
    NewPoll,
    PollDetail(PollId),
}

impl Route {
    /// Whether the route sits behind the auth gate.
    pub fn is_protected(self) -> bool {
        matches!(
            self,
            Route::PollList | Route::NewPoll | Route::PollDetail(_) | Route::UpdatePassword
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Info,
    Error,
}

/// A non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Info,
            title: title.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// Everything a screen action needs.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub session: SessionStore,
    pub config: Config,
}

impl AppContext {
    pub fn new(session: SessionStore, config: Config) -> Self {
        Self { session, config }
    }

    pub fn backend(&self) -> &Backend {
        self.session.backend()
    }

    /// Table access as the signed-in user (anonymous when signed out).
    pub fn rest(&self) -> Rest<'_> {
        let token = self.session.access_token();
        self.backend().rest(token.as_deref())
    }
}

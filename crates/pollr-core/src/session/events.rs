//! Session-change notifications.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::model::UserProfile;

/// Out-of-band session changes, mirroring the auth service's event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Stored session resolved at startup (with or without a user)
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    /// A password reset email was requested
    PasswordRecovery,
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthEvent::InitialSession => "INITIAL_SESSION",
            AuthEvent::SignedIn => "SIGNED_IN",
            AuthEvent::SignedOut => "SIGNED_OUT",
            AuthEvent::TokenRefreshed => "TOKEN_REFRESHED",
            AuthEvent::UserUpdated => "USER_UPDATED",
            AuthEvent::PasswordRecovery => "PASSWORD_RECOVERY",
        };
        f.write_str(name)
    }
}

/// What screens see of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<UserProfile>,
    /// True until the stored session has been resolved
    pub loading: bool,
}

impl SessionSnapshot {
    pub(crate) fn loading() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

type Callback = Arc<dyn Fn(AuthEvent, &SessionSnapshot) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback>,
}

impl Listeners {
    pub(crate) fn len(&self) -> usize {
        self.callbacks.len()
    }
}

/// Registry shared between the store and its subscriptions.
pub(crate) type SharedListeners = Arc<Mutex<Listeners>>;

pub(crate) fn register<F>(listeners: &SharedListeners, callback: F) -> Subscription
where
    F: Fn(AuthEvent, &SessionSnapshot) + Send + Sync + 'static,
{
    let mut guard = listeners
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let id = guard.next_id;
    guard.next_id += 1;
    guard.callbacks.insert(id, Arc::new(callback));
    Subscription {
        id,
        listeners: Arc::downgrade(listeners),
    }
}

/// Calls every registered callback. Callbacks run outside the lock, so a
/// callback may subscribe or unsubscribe.
pub(crate) fn notify(listeners: &SharedListeners, event: AuthEvent, snapshot: &SessionSnapshot) {
    let callbacks: Vec<Callback> = listeners
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .callbacks
        .values()
        .cloned()
        .collect();
    for callback in callbacks {
        callback(event, snapshot);
    }
}

/// Handle for a registered session-change callback.
///
/// Unsubscribes when dropped; call [`Subscription::unsubscribe`] to make
/// teardown explicit.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .callbacks
                .remove(&self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            user: None,
            loading: false,
        }
    }

    #[test]
    fn test_notify_reaches_subscribers() {
        let listeners = SharedListeners::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _sub = register(&listeners, move |event, _| {
            assert_eq!(event, AuthEvent::SignedOut);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        notify(&listeners, AuthEvent::SignedOut, &snapshot());
        notify(&listeners, AuthEvent::SignedOut, &snapshot());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let listeners = SharedListeners::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = register(&listeners, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(listeners.lock().unwrap().len(), 1);

        sub.unsubscribe();
        assert_eq!(listeners.lock().unwrap().len(), 0);

        notify(&listeners, AuthEvent::SignedIn, &snapshot());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscription_outliving_registry_is_harmless() {
        let listeners = SharedListeners::default();
        let sub = register(&listeners, |_, _| {});
        drop(listeners);
        drop(sub);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(AuthEvent::TokenRefreshed.to_string(), "TOKEN_REFRESHED");
        assert_eq!(AuthEvent::InitialSession.to_string(), "INITIAL_SESSION");
    }
}

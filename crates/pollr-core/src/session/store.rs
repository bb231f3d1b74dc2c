//! The session store: single owner of the signed-in session.
//!
//! Screens read a [`SessionSnapshot`] (via [`SessionStore::snapshot`] or a
//! watch receiver) and register callbacks for [`AuthEvent`]s. The store
//! persists tokens through [`SessionStorage`] and keeps the access token
//! fresh with a background ticker that runs only while the app is active.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::events::{self, AuthEvent, SessionSnapshot, SharedListeners, Subscription};
use super::storage::{SessionStorage, StoredSession};
use crate::backend::{Backend, BackendError, SignUpResponse};
use crate::config::AuthConfig;
use crate::model::UserProfile;
use crate::validation;

pub const MSG_UNEXPECTED: &str = "An unexpected error occurred";

/// Failure of a session operation. Never fatal: the caller shows it and the
/// user may retry.
#[derive(Debug)]
pub enum AuthError {
    /// Rejected locally, before any network call
    Validation(&'static str),
    /// Wrong email or password
    InvalidCredentials(String),
    /// No response from the backend
    Network(String),
    /// Any other backend error, with the backend's message
    Backend(BackendError),
    /// The operation needs a signed-in user
    NotSignedIn,
    /// Anything else (e.g. local storage failure)
    Unexpected(anyhow::Error),
}

impl AuthError {
    fn from_backend(err: BackendError) -> Self {
        if err.is_invalid_credentials() {
            AuthError::InvalidCredentials(err.message)
        } else if err.is_network() {
            AuthError::Network(err.message)
        } else {
            AuthError::Backend(err)
        }
    }

    /// Text suitable for an alert body.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(msg) => (*msg).to_string(),
            AuthError::InvalidCredentials(msg) | AuthError::Network(msg) => msg.clone(),
            AuthError::Backend(err) => err.message.clone(),
            AuthError::NotSignedIn => "You are not signed in".to_string(),
            AuthError::Unexpected(_) => MSG_UNEXPECTED.to_string(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Unexpected(err) => write!(f, "{MSG_UNEXPECTED}: {err:#}"),
            other => f.write_str(&other.user_message()),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// The two successful sign-up outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// A live session was created immediately
    SignedIn(UserProfile),
    /// The account exists but the email must be confirmed first
    ConfirmationPending,
}

impl SignUpOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SignUpOutcome::SignedIn(_) => "Signed up and logged in successfully!",
            SignUpOutcome::ConfirmationPending => {
                "Please check your email for the confirmation link"
            }
        }
    }
}

/// Coarse application lifecycle, used to pause background refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Active,
    Background,
}

/// Refresh timing, usually taken from `[auth]` in the config.
#[derive(Debug, Clone, Copy)]
pub struct RefreshOptions {
    pub auto_refresh: bool,
    pub margin: Duration,
    pub tick: Duration,
}

impl From<&AuthConfig> for RefreshOptions {
    fn from(config: &AuthConfig) -> Self {
        Self {
            auto_refresh: config.auto_refresh,
            margin: config.refresh_margin(),
            tick: config.tick(),
        }
    }
}

impl Default for RefreshOptions {
    fn default() -> Self {
        (&AuthConfig::default()).into()
    }
}

/// The current session and a counter bumped on every change. Async
/// operations remember the generation they started from and drop their
/// result if it moved in the meantime.
#[derive(Default)]
struct Slot {
    session: Option<StoredSession>,
    generation: u64,
}

struct Inner {
    backend: Backend,
    storage: SessionStorage,
    options: RefreshOptions,
    slot: Mutex<Slot>,
    snapshot: watch::Sender<SessionSnapshot>,
    listeners: SharedListeners,
    refresher: Mutex<Option<CancellationToken>>,
}

/// Shared handle to the session. Clones refer to the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates a store in the loading state. Call [`Self::initialize`] next.
    pub fn new(backend: Backend, storage: SessionStorage, options: RefreshOptions) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::loading());
        Self {
            inner: Arc::new(Inner {
                backend,
                storage,
                options,
                slot: Mutex::new(Slot::default()),
                snapshot,
                listeners: SharedListeners::default(),
                refresher: Mutex::new(None),
            }),
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.inner.backend
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Receiver that observes every snapshot change.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.snapshot().user
    }

    /// Current access token, if signed in. Never log the result.
    pub fn access_token(&self) -> Option<String> {
        self.current().map(|s| s.access_token)
    }

    /// Registers a callback for session changes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(AuthEvent, &SessionSnapshot) + Send + Sync + 'static,
    {
        events::register(&self.inner.listeners, callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> Option<StoredSession> {
        self.lock_slot().session.clone()
    }

    /// The session together with the generation it was read at.
    fn current_versioned(&self) -> (Option<StoredSession>, u64) {
        let slot = self.lock_slot();
        (slot.session.clone(), slot.generation)
    }

    /// Replaces the session unconditionally.
    fn apply(&self, session: Option<StoredSession>, event: AuthEvent) {
        self.commit(None, session, event);
    }

    /// Replaces the in-memory session, persists it, publishes the new
    /// snapshot and notifies subscribers.
    ///
    /// With `expected`, nothing happens unless the session is still at that
    /// generation; returns false for such a stale write.
    fn commit(
        &self,
        expected: Option<u64>,
        session: Option<StoredSession>,
        event: AuthEvent,
    ) -> bool {
        let snapshot = {
            let mut slot = self.lock_slot();
            if let Some(expected) = expected
                && slot.generation != expected
            {
                tracing::debug!(%event, "session changed meanwhile, dropping update");
                return false;
            }

            let storage_result = match &session {
                Some(s) => self.inner.storage.save(s),
                None => self.inner.storage.clear().map(|_| ()),
            };
            if let Err(err) = storage_result {
                tracing::warn!(error = %format!("{err:#}"), "failed to persist session");
            }

            let snapshot = SessionSnapshot {
                user: session.as_ref().map(|s| s.user.clone()),
                loading: false,
            };
            slot.session = session;
            slot.generation += 1;
            // published under the lock so snapshots follow generation order
            self.inner.snapshot.send_replace(snapshot.clone());
            snapshot
        };

        tracing::info!(%event, signed_in = snapshot.user.is_some(), "session changed");
        events::notify(&self.inner.listeners, event, &snapshot);
        true
    }

    /// Resolves the persisted session, refreshing it if it is about to
    /// expire. A corrupt or rejected session resolves to "no user"; when the
    /// backend is unreachable or failing, the stored session is kept.
    pub async fn initialize(&self) -> SessionSnapshot {
        let (_, generation) = self.current_versioned();
        let stored = match self.inner.storage.load() {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "discarding unreadable session");
                None
            }
        };

        let resolved = match stored {
            Some(session) if session.expires_within(self.inner.options.margin) => {
                match self
                    .inner
                    .backend
                    .auth()
                    .refresh(&session.refresh_token)
                    .await
                {
                    Ok(grant) => Some(StoredSession::from_grant(grant)),
                    Err(err) if err.is_rejection() => {
                        tracing::info!(error = %err, "stored session rejected");
                        None
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "could not refresh stored session, keeping it");
                        Some(session)
                    }
                }
            }
            other => other,
        };

        // a sign-in that finished first wins over the stored session
        self.commit(Some(generation), resolved, AuthEvent::InitialSession);
        self.snapshot()
    }

    /// # Errors
    /// `Validation` for empty fields, `InvalidCredentials`, `Network`, or
    /// `Backend` with the backend's message.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<UserProfile> {
        validation::validate_sign_in(email, password).map_err(AuthError::Validation)?;

        let grant = self
            .inner
            .backend
            .auth()
            .sign_in_with_password(email.trim(), password)
            .await
            .map_err(AuthError::from_backend)?;

        let session = StoredSession::from_grant(grant);
        let user = session.user.clone();
        self.apply(Some(session), AuthEvent::SignedIn);
        Ok(user)
    }

    /// # Errors
    /// `Validation` for empty fields or a short password (no network call),
    /// otherwise the backend's error.
    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        validation::validate_sign_up(email, password).map_err(AuthError::Validation)?;

        let response = self
            .inner
            .backend
            .auth()
            .sign_up(email.trim(), password)
            .await
            .map_err(AuthError::from_backend)?;

        match response {
            SignUpResponse::Session(grant) => {
                let session = StoredSession::from_grant(grant);
                let user = session.user.clone();
                self.apply(Some(session), AuthEvent::SignedIn);
                Ok(SignUpOutcome::SignedIn(user))
            }
            SignUpResponse::ConfirmationPending(_) => Ok(SignUpOutcome::ConfirmationPending),
        }
    }

    /// Revokes the remote session (best effort) and clears local state.
    pub async fn sign_out(&self) {
        if let Some(session) = self.current()
            && let Err(err) = self
                .inner
                .backend
                .auth()
                .sign_out(&session.access_token)
                .await
        {
            tracing::warn!(error = %err, "remote sign-out failed; clearing local session");
        }
        self.apply(None, AuthEvent::SignedOut);
    }

    /// # Errors
    /// `Validation` for a blank email, otherwise the backend's error.
    pub async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> AuthResult<()> {
        validation::validate_reset_email(email).map_err(AuthError::Validation)?;
        self.inner
            .backend
            .auth()
            .recover(email.trim(), redirect_to)
            .await
            .map_err(AuthError::from_backend)?;
        events::notify(
            &self.inner.listeners,
            AuthEvent::PasswordRecovery,
            &self.snapshot(),
        );
        Ok(())
    }

    /// # Errors
    /// `Validation` unless both fields match and are long enough (no
    /// network call), `NotSignedIn`, or the backend's error.
    pub async fn update_password(&self, password: &str, confirm: &str) -> AuthResult<()> {
        validation::validate_new_password(password, confirm).map_err(AuthError::Validation)?;

        let (session, generation) = self.current_versioned();
        let mut session = session.ok_or(AuthError::NotSignedIn)?;
        let user = self
            .inner
            .backend
            .auth()
            .update_password(&session.access_token, password)
            .await
            .map_err(AuthError::from_backend)?;

        session.user = user.into();
        self.commit(Some(generation), Some(session), AuthEvent::UserUpdated);
        Ok(())
    }

    /// Re-reads the user from the auth service so that changes made
    /// elsewhere show up. A revoked access token signs the user out locally;
    /// a changed profile is stored and announced as `UserUpdated`.
    ///
    /// # Errors
    /// `NotSignedIn`, `Network`, or the backend's error.
    pub async fn reload_user(&self) -> AuthResult<UserProfile> {
        let (session, generation) = self.current_versioned();
        let mut session = session.ok_or(AuthError::NotSignedIn)?;
        match self
            .inner
            .backend
            .auth()
            .get_user(&session.access_token)
            .await
        {
            Ok(user) => {
                let user = UserProfile::from(user);
                if user != session.user {
                    session.user = user.clone();
                    self.commit(Some(generation), Some(session), AuthEvent::UserUpdated);
                }
                Ok(user)
            }
            Err(err) if err.is_rejection() => {
                tracing::info!(error = %err, "access token revoked");
                self.commit(Some(generation), None, AuthEvent::SignedOut);
                Err(AuthError::from_backend(err))
            }
            Err(err) => Err(AuthError::from_backend(err)),
        }
    }

    /// Exchanges the refresh token for a new access token. A rejected
    /// refresh token signs the user out locally. If the session changed
    /// while the request was in flight (sign-out, sign-in, another refresh),
    /// the result is dropped.
    ///
    /// # Errors
    /// `NotSignedIn`, `Network`, or the backend's error.
    pub async fn refresh_session(&self) -> AuthResult<()> {
        let (session, generation) = self.current_versioned();
        let session = session.ok_or(AuthError::NotSignedIn)?;
        match self
            .inner
            .backend
            .auth()
            .refresh(&session.refresh_token)
            .await
        {
            Ok(grant) => {
                self.commit(
                    Some(generation),
                    Some(StoredSession::from_grant(grant)),
                    AuthEvent::TokenRefreshed,
                );
                Ok(())
            }
            Err(err) if err.is_rejection() => {
                self.commit(Some(generation), None, AuthEvent::SignedOut);
                Err(AuthError::from_backend(err))
            }
            Err(err) => Err(AuthError::from_backend(err)),
        }
    }

    fn needs_refresh(&self) -> bool {
        self.current()
            .is_some_and(|s| s.expires_within(self.inner.options.margin))
    }

    /// Starts or stops background refresh as the app changes state.
    pub fn set_app_state(&self, state: AppState) {
        match state {
            AppState::Active => self.start_auto_refresh(),
            AppState::Background => self.stop_auto_refresh(),
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.inner
            .refresher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Spawns the refresh ticker on the current tokio runtime. No-op when
    /// already running or disabled in config.
    pub fn start_auto_refresh(&self) {
        if !self.inner.options.auto_refresh {
            return;
        }
        let mut slot = self
            .inner
            .refresher
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let weak = Arc::downgrade(&self.inner);
        let tick = self.inner.options.tick;
        tokio::spawn(refresh_loop(weak, tick, cancel.clone()));
        *slot = Some(cancel);
        tracing::debug!("auto refresh started");
    }

    pub fn stop_auto_refresh(&self) {
        let cancel = self
            .inner
            .refresher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(cancel) = cancel {
            cancel.cancel();
            tracing::debug!("auto refresh stopped");
        }
    }
}

async fn refresh_loop(inner: Weak<Inner>, tick: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(tick);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let store = SessionStore { inner };
        if store.needs_refresh()
            && let Err(err) = store.refresh_session().await
        {
            tracing::warn!(error = %err, "background token refresh failed");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(cancel) = self
            .refresher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            cancel.cancel();
        }
    }
}

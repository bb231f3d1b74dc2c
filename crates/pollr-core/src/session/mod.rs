//! Authenticated session: storage, change notifications, and the store that
//! owns both.

pub mod events;
pub mod storage;
mod store;

pub use self::events::{AuthEvent, SessionSnapshot, Subscription};
pub use self::storage::{SessionStorage, StoredSession, mask_token};
pub use self::store::{
    AppState, AuthError, AuthResult, MSG_UNEXPECTED, RefreshOptions, SessionStore, SignUpOutcome,
};

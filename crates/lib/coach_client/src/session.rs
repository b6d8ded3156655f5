//! Session state shared by the client and its interceptors.
//!
//! ```text
//! Anonymous ──begin──▶ Authenticating ──establish──▶ Authenticated
//!     ▲                      │                            │
//!     └──────fail────────────┘◀──────end / invalidate─────┘
//! ```
//!
//! A token and a user only exist together, inside `Authenticated`.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use coach_core::models::User;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated { token: String, user: User },
}

impl SessionState {
    fn label(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated { .. } => "authenticated",
        }
    }
}

/// Process-wide session, mutated only through the named transitions below.
#[derive(Debug, Default)]
pub struct SessionStore {
    state: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        match &*self.read() {
            SessionState::Authenticated { token, .. } => Some(token.clone()),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<User> {
        match &*self.read() {
            SessionState::Authenticated { user, .. } => Some(user.clone()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(&*self.read(), SessionState::Authenticated { .. })
    }

    /// Start a login, registration or token validation.
    ///
    /// Returns the token of the session being replaced, if any.
    pub fn begin_authentication(&self) -> Option<String> {
        let previous = self.transition(SessionState::Authenticating);
        match previous {
            SessionState::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }

    /// The backend accepted `token` for `user`.
    pub fn establish(&self, token: String, user: User) {
        self.transition(SessionState::Authenticated { token, user });
    }

    /// An authentication attempt failed. No-op unless one was in progress.
    pub fn fail_authentication(&self) -> bool {
        let mut state = self.write();
        if *state != SessionState::Authenticating {
            return false;
        }
        *state = SessionState::Anonymous;
        debug!(from = "authenticating", to = "anonymous", "session transition");
        true
    }

    /// Explicit logout. Returns whether a session was active.
    pub fn end(&self) -> bool {
        let previous = self.transition(SessionState::Anonymous);
        matches!(previous, SessionState::Authenticated { .. })
    }

    /// A request carrying `token` was rejected with 401.
    ///
    /// Only the first rejection of the current token ends the session; later
    /// ones, and stale tokens from a replaced session, return `false`.
    pub fn invalidate(&self, token: &str) -> bool {
        let mut state = self.write();
        let current = matches!(
            &*state,
            SessionState::Authenticated { token: current, .. } if current == token
        );
        if !current {
            return false;
        }
        *state = SessionState::Anonymous;
        debug!(from = "authenticated", to = "anonymous", "session invalidated");
        true
    }

    fn transition(&self, next: SessionState) -> SessionState {
        let mut state = self.write();
        debug!(from = state.label(), to = next.label(), "session transition");
        std::mem::replace(&mut *state, next)
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

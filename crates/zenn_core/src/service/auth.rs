//! Authentication collaborator seam.
//!
//! The core never authenticates anyone; it only asks who is signed in.

use crate::model::task::UserId;
use parking_lot::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Session restoration still in progress.
    Loading,
    Anonymous,
    Authenticated(UserId),
}

pub trait AuthProvider {
    fn auth_state(&self) -> AuthState;
}

/// In-process auth state, switched explicitly by the host application.
#[derive(Debug)]
pub struct StaticAuth {
    state: RwLock<AuthState>,
}

impl StaticAuth {
    pub fn new(state: AuthState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn signed_in(user_id: impl Into<UserId>) -> Self {
        Self::new(AuthState::Authenticated(user_id.into()))
    }

    pub fn anonymous() -> Self {
        Self::new(AuthState::Anonymous)
    }

    pub fn set(&self, state: AuthState) {
        *self.state.write() = state;
    }
}

impl AuthProvider for StaticAuth {
    fn auth_state(&self) -> AuthState {
        self.state.read().clone()
    }
}

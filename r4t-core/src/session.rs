//! Identity boundary
//!
//! The core only ever reads the current identity; establishing or refreshing
//! it belongs to whoever implements [`IdentityProvider`].

use uuid::Uuid;

use crate::models::User;
use crate::roles::Role;

/// The authenticated actor for the duration of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

impl From<&User> for Session {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.role)
    }
}

/// Supplies the current `(user, role)` pair, or `None` when nobody is signed in
pub trait IdentityProvider {
    fn current_session(&self) -> Option<Session>;

    /// Role of the current session, for feeding the guard
    fn current_role(&self) -> Option<Role> {
        self.current_session().map(|s| s.role)
    }
}

impl IdentityProvider for Option<Session> {
    fn current_session(&self) -> Option<Session> {
        *self
    }
}

impl IdentityProvider for Session {
    fn current_session(&self) -> Option<Session> {
        Some(*self)
    }
}

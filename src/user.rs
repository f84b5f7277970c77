//! User records and the lookup capability the core consumes.
//! Used by: token::service, store, registration, command.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Anything a verification token can be minted for.
pub trait UserIdentity {
    fn identifier(&self) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub email_verified: bool,
    /// Allowed to change other accounts, e.g. to activate them.
    pub can_change_users: bool,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            is_active: false,
            email_verified: false,
            can_change_users: false,
        }
    }

    pub fn verified(mut self) -> Self {
        self.email_verified = true;
        self
    }

    pub fn with_user_admin(mut self) -> Self {
        self.can_change_users = true;
        self
    }
}

impl UserIdentity for User {
    fn identifier(&self) -> Option<&str> {
        if self.username.is_empty() {
            None
        } else {
            Some(&self.username)
        }
    }
}

impl UserIdentity for str {
    fn identifier(&self) -> Option<&str> {
        Some(self)
    }
}

pub trait UserStore: Send + Sync {
    fn insert(&self, user: &User) -> Result<()>;
    fn find(&self, username: &str) -> Result<Option<User>>;
    fn all(&self) -> Result<Vec<User>>;
    /// Returns `false` when no such account exists.
    fn set_active(&self, username: &str, active: bool) -> Result<bool>;
    /// Marks the email verified and, when `activate` is set, the account
    /// active, in one update. An already active account stays active.
    fn confirm_email(&self, username: &str, activate: bool) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_inactive_and_unverified() {
        let user = User::new("django", "django@localhost");
        assert!(!user.is_active);
        assert!(!user.email_verified);
        assert!(!user.can_change_users);
    }

    #[test]
    fn builders_set_flags() {
        let user = User::new("django", "django@localhost").verified().with_user_admin();
        assert!(user.email_verified);
        assert!(user.can_change_users);
    }

    #[test]
    fn identifier_is_username() {
        assert_eq!(User::new("foo", "foo@localhost").identifier(), Some("foo"));
        assert_eq!(User::new("", "foo@localhost").identifier(), None);
    }

    #[test]
    fn plain_username_is_an_identity() {
        assert_eq!("foo".identifier(), Some("foo"));
    }
}

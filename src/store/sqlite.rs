//! SQLite-backed user store.
//! Used by: state, command, registration.

use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{lock_err, Result};
use crate::user::{User, UserStore};

pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 0,
                email_verified INTEGER NOT NULL DEFAULT 0,
                can_change_users INTEGER NOT NULL DEFAULT 0
            )",
        )?;
        tracing::debug!(path, "user store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn update_flag(&self, sql: &str, username: &str, value: bool) -> Result<bool> {
        let conn = self.conn.lock().map_err(lock_err("users"))?;
        let changed = conn.execute(sql, (value, username))?;
        Ok(changed > 0)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        username: row.get(0)?,
        email: row.get(1)?,
        is_active: row.get(2)?,
        email_verified: row.get(3)?,
        can_change_users: row.get(4)?,
    })
}

impl UserStore for SqliteUserStore {
    fn insert(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock().map_err(lock_err("users"))?;
        conn.execute(
            "INSERT INTO users (username, email, is_active, email_verified, can_change_users)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                &user.username,
                &user.email,
                user.is_active,
                user.email_verified,
                user.can_change_users,
            ),
        )?;
        Ok(())
    }

    fn find(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().map_err(lock_err("users"))?;
        let user = conn
            .query_row(
                "SELECT username, email, is_active, email_verified, can_change_users
                 FROM users WHERE username = ?1",
                [username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn all(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock().map_err(lock_err("users"))?;
        let mut stmt = conn.prepare(
            "SELECT username, email, is_active, email_verified, can_change_users
             FROM users ORDER BY username",
        )?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn set_active(&self, username: &str, active: bool) -> Result<bool> {
        self.update_flag(
            "UPDATE users SET is_active = ?1 WHERE username = ?2",
            username,
            active,
        )
    }

    fn confirm_email(&self, username: &str, activate: bool) -> Result<bool> {
        self.update_flag(
            "UPDATE users SET email_verified = 1, is_active = (is_active OR ?1)
             WHERE username = ?2",
            username,
            activate,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_find_user() -> Result<()> {
        let store = SqliteUserStore::open_in_memory()?;
        let user = User::new("django", "django@localhost").verified();
        store.insert(&user)?;
        assert_eq!(store.find("django")?, Some(user));
        Ok(())
    }

    #[test]
    fn find_unknown_returns_none() -> Result<()> {
        let store = SqliteUserStore::open_in_memory()?;
        assert_eq!(store.find("ghost")?, None);
        Ok(())
    }

    #[test]
    fn all_is_sorted_by_username() -> Result<()> {
        let store = SqliteUserStore::open_in_memory()?;
        store.insert(&User::new("foo", "foo@localhost"))?;
        store.insert(&User::new("bar", "bar@localhost"))?;
        store.insert(&User::new("django", "django@localhost"))?;
        let names: Vec<_> = store.all()?.into_iter().map(|u| u.username).collect();
        assert_eq!(names, ["bar", "django", "foo"]);
        Ok(())
    }

    #[test]
    fn duplicate_username_rejected_by_db() -> Result<()> {
        let store = SqliteUserStore::open_in_memory()?;
        store.insert(&User::new("foo", "foo@localhost"))?;
        let result = store.insert(&User::new("foo", "other@localhost"));
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn set_active_toggles_flag() -> Result<()> {
        let store = SqliteUserStore::open_in_memory()?;
        store.insert(&User::new("foo", "foo@localhost"))?;
        assert!(store.set_active("foo", true)?);
        assert!(store.find("foo")?.map(|u| u.is_active).unwrap_or(false));
        assert!(store.set_active("foo", false)?);
        assert!(!store.find("foo")?.map(|u| u.is_active).unwrap_or(true));
        Ok(())
    }

    #[test]
    fn confirm_email_sets_both_flags_at_once() -> Result<()> {
        let store = SqliteUserStore::open_in_memory()?;
        store.insert(&User::new("foo", "foo@localhost"))?;
        assert!(store.confirm_email("foo", true)?);
        let user = store.find("foo")?.ok_or(crate::error::Error::Crypto)?;
        assert!(user.is_active);
        assert!(user.email_verified);
        Ok(())
    }

    #[test]
    fn confirm_email_without_activation_leaves_account_inactive() -> Result<()> {
        let store = SqliteUserStore::open_in_memory()?;
        store.insert(&User::new("foo", "foo@localhost"))?;
        assert!(store.confirm_email("foo", false)?);
        let user = store.find("foo")?.ok_or(crate::error::Error::Crypto)?;
        assert!(!user.is_active);
        assert!(user.email_verified);
        Ok(())
    }

    #[test]
    fn confirm_email_never_deactivates() -> Result<()> {
        let store = SqliteUserStore::open_in_memory()?;
        let mut user = User::new("foo", "foo@localhost");
        user.is_active = true;
        store.insert(&user)?;
        assert!(store.confirm_email("foo", false)?);
        assert!(store.find("foo")?.map(|u| u.is_active).unwrap_or(false));
        Ok(())
    }

    #[test]
    fn updates_on_unknown_user_report_false() -> Result<()> {
        let store = SqliteUserStore::open_in_memory()?;
        assert!(!store.set_active("ghost", true)?);
        assert!(!store.confirm_email("ghost", true)?);
        Ok(())
    }
}

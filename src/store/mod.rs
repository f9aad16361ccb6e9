//! Backing store seam.
//!
//! A [`UserStore`] hands out one [`UserSession`] per verification call. The
//! session owns its connection: closing it (or dropping it on any other exit
//! path) releases the connection.

pub mod decode;
pub mod dsn;
pub mod sql;

pub use dsn::{Driver, Dsn};
pub use sql::SqlStore;

use crate::error::AuthError;
use std::{future::Future, pin::Pin};

/// Column holding the one-way password hash.
pub const PASSWORD_COLUMN: &str = "password";

/// Column holding the failed-attempt counter.
pub const ATTEMPTS_COLUMN: &str = "login_attempts";

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AuthError>> + Send + 'a>>;

/// A user row as read from the store, columns in select order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRecord {
    columns: Vec<(String, Option<String>)>,
}

impl UserRecord {
    #[must_use]
    pub fn new(columns: Vec<(String, Option<String>)>) -> Self {
        Self { columns }
    }

    #[must_use]
    pub fn columns(&self) -> &[(String, Option<String>)] {
        &self.columns
    }

    /// Value of a column, `None` when absent or SQL `NULL`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .and_then(|(_, value)| value.as_deref())
    }

    #[must_use]
    pub fn password_hash(&self) -> Option<&str> {
        self.get(PASSWORD_COLUMN)
    }
}

impl<N, V> FromIterator<(N, Option<V>)> for UserRecord
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, Option<V>)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.map(Into::into)))
                .collect(),
        )
    }
}

/// Source of per-request sessions.
pub trait UserStore: Send + Sync {
    type Session: UserSession + Send;

    /// Open a session. Connection and session-initialisation failures map to
    /// [`AuthError::Connection`].
    fn open(&self) -> StoreFuture<'_, Self::Session>;
}

/// Operations available on an open session.
pub trait UserSession {
    /// Rows whose username column equals `username` and whose attempt
    /// counter is below `max_attempts`.
    fn find_unlocked<'a>(
        &'a mut self,
        username: &'a str,
        max_attempts: i64,
    ) -> StoreFuture<'a, Vec<UserRecord>>;

    /// Add one to the attempt counter. Returns the number of rows touched.
    fn increment_attempts<'a>(&'a mut self, username: &'a str) -> StoreFuture<'a, u64>;

    /// Set the attempt counter back to zero. Returns the number of rows touched.
    fn reset_attempts<'a>(&'a mut self, username: &'a str) -> StoreFuture<'a, u64>;

    /// Release the connection gracefully.
    fn close(self) -> StoreFuture<'static, ()>;
}

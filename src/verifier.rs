//! Login verification.
//!
//! Flow for one call:
//! 1) Open a session on the store (one connection per call).
//! 2) Fetch rows for the username whose `login_attempts` is below the limit.
//!    No rows: unknown user or locked account, reported the same way.
//! 3) Verify the password against the stored hash.
//! 4) Mismatch: bump the counter. Match: reset it. Both updates are
//!    best-effort; a failure is logged and the outcome stands.
//! 5) Project the rows into an [`AttributeSet`].

use crate::{
    attributes::AttributeSet,
    config::SourceConfig,
    error::AuthError,
    password,
    store::{SqlStore, StoreFuture, UserSession, UserStore},
};
use secrecy::SecretString;
use tracing::{error, info, instrument, warn};
use ulid::Ulid;

/// What a host (HTTP adapter, CLI) needs from an authentication source.
pub trait AuthSource: Send + Sync {
    fn auth_id(&self) -> &str;

    fn authenticate<'a>(
        &'a self,
        username: &'a str,
        password: &'a SecretString,
    ) -> StoreFuture<'a, AttributeSet>;

    /// Open and release a session without touching any row.
    fn ping(&self) -> StoreFuture<'_, ()>;
}

pub struct CredentialVerifier<S> {
    auth_id: String,
    max_attempts: i64,
    store: S,
}

impl CredentialVerifier<SqlStore> {
    /// Build a verifier backed by the SQL store described by `config`.
    ///
    /// # Errors
    /// Returns [`AuthError::Configuration`] if the driver rejects the DSN.
    pub fn from_config(config: &SourceConfig) -> Result<Self, AuthError> {
        Ok(Self::new(
            config.auth_id(),
            config.max_attempts(),
            SqlStore::new(config)?,
        ))
    }
}

impl<S: UserStore> CredentialVerifier<S> {
    #[must_use]
    pub fn new(auth_id: &str, max_attempts: i64, store: S) -> Self {
        Self {
            auth_id: auth_id.to_string(),
            max_attempts,
            store,
        }
    }

    #[must_use]
    pub fn auth_id(&self) -> &str {
        &self.auth_id
    }

    #[must_use]
    pub const fn max_attempts(&self) -> i64 {
        self.max_attempts
    }

    /// Verify a username/password pair and return the user's attributes.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] for an unknown user, a locked account
    /// or a wrong password. [`AuthError::Connection`] and
    /// [`AuthError::Query`] when the store fails.
    #[instrument(skip_all, fields(auth_id = %self.auth_id, attempt = %Ulid::new()))]
    pub async fn verify(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<AttributeSet, AuthError> {
        let mut session = self.store.open().await?;

        let outcome = self.check(&mut session, username, password).await;

        if let Err(e) = session.close().await {
            warn!("{}: {e}", self.auth_id);
        }

        outcome
    }

    async fn check(
        &self,
        session: &mut S::Session,
        username: &str,
        password: &SecretString,
    ) -> Result<AttributeSet, AuthError> {
        let records = session.find_unlocked(username, self.max_attempts).await?;

        info!("{}: Got {} rows from database", self.auth_id, records.len());

        let Some(record) = records.first() else {
            warn!(
                username,
                "{}: No rows in result set. Unknown username or too many failed attempts",
                self.auth_id
            );
            return Err(AuthError::InvalidCredentials);
        };

        if records.len() > 1 {
            warn!(
                username,
                "{}: {} rows share this username, checking the first",
                self.auth_id,
                records.len()
            );
        }

        let matched = match record.password_hash() {
            Some(hash) => password::verify(password, hash),
            None => {
                warn!("{}: row has no password hash", self.auth_id);
                false
            }
        };

        if !matched {
            match session.increment_attempts(username).await {
                Ok(rows) => info!("{}: login_attempts incremented on {rows} row(s)", self.auth_id),
                Err(e) => error!("{}: failed to record failed attempt: {e}", self.auth_id),
            }

            warn!(username, "{}: Wrong password", self.auth_id);
            return Err(AuthError::InvalidCredentials);
        }

        if let Err(e) = session.reset_attempts(username).await {
            error!("{}: failed to reset login_attempts: {e}", self.auth_id);
        }

        let attributes = AttributeSet::from_records(&records);

        info!(
            "{}: Attributes: {}",
            self.auth_id,
            attributes.names().collect::<Vec<_>>().join(",")
        );

        Ok(attributes)
    }

    /// Clear the failed-attempt counter of a user, locked or not.
    ///
    /// # Errors
    /// Returns an error if the store cannot be reached or the update fails.
    #[instrument(skip_all, fields(auth_id = %self.auth_id))]
    pub async fn unlock(&self, username: &str) -> Result<u64, AuthError> {
        let mut session = self.store.open().await?;

        let outcome = session.reset_attempts(username).await;

        if let Err(e) = session.close().await {
            warn!("{}: {e}", self.auth_id);
        }

        outcome
    }
}

impl<S> AuthSource for CredentialVerifier<S>
where
    S: UserStore,
{
    fn auth_id(&self) -> &str {
        &self.auth_id
    }

    fn authenticate<'a>(
        &'a self,
        username: &'a str,
        password: &'a SecretString,
    ) -> StoreFuture<'a, AttributeSet> {
        Box::pin(self.verify(username, password))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let session = self.store.open().await?;
            session.close().await
        })
    }
}

use thiserror::Error;

/// Failure kinds returned by an authentication source.
///
/// Only [`AuthError::InvalidCredentials`] is meant to reach the person typing
/// the password; everything else is an operator problem.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Configuration(String),

    #[error("{auth_id}: failed to connect to '{dsn}'")]
    Connection {
        auth_id: String,
        dsn: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{auth_id}: failed to {stage}")]
    Query {
        auth_id: String,
        stage: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("wrong username or password")]
    InvalidCredentials,
}

impl AuthError {
    /// True for errors that abort the request and should not be presented as
    /// a credential problem.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidCredentials)
    }

    pub(crate) fn query(auth_id: &str, stage: &'static str, source: sqlx::Error) -> Self {
        Self::Query {
            auth_id: auth_id.to_string(),
            stage,
            source,
        }
    }
}

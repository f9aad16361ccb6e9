//! sqlx-backed user store for PostgreSQL, MySQL/MariaDB and SQLite.

use crate::{
    config::SourceConfig,
    error::AuthError,
    store::{
        decode::{self, ColumnText},
        Driver, Dsn, StoreFuture, UserRecord, UserSession, UserStore, ATTEMPTS_COLUMN,
    },
};
use secrecy::ExposeSecret;
use sqlx::{
    mysql::{MySqlConnectOptions, MySqlConnection},
    postgres::{PgConnectOptions, PgConnection},
    sqlite::{SqliteConnectOptions, SqliteConnection},
    Connection,
};
use std::{borrow::Cow, fmt, str::FromStr, sync::Arc};
use tracing::{debug, info_span, Instrument};

/// The three statements the verifier needs, rendered for one driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statements {
    pub select: String,
    pub increment: String,
    pub reset: String,
}

impl Statements {
    /// `table` and `uid_field` must already be validated identifiers.
    #[must_use]
    pub fn new(driver: Driver, table: &str, uid_field: &str) -> Self {
        let table = driver.quote_ident(table);
        let uid = driver.quote_ident(uid_field);
        let attempts = driver.quote_ident(ATTEMPTS_COLUMN);
        let (p1, p2) = (driver.placeholder(1), driver.placeholder(2));

        Self {
            select: format!("SELECT * FROM {table} WHERE {uid} = {p1} AND {attempts} < {p2}"),
            increment: format!(
                "UPDATE {table} SET {attempts} = {attempts} + 1 WHERE {uid} = {p1}"
            ),
            reset: format!("UPDATE {table} SET {attempts} = 0 WHERE {uid} = {p1}"),
        }
    }
}

enum Target {
    Postgres(PgConnectOptions),
    MySql(MySqlConnectOptions),
    Sqlite(SqliteConnectOptions),
}

/// Opens a fresh connection for every session; nothing is pooled.
pub struct SqlStore {
    auth_id: Arc<str>,
    dsn: String,
    driver: Driver,
    target: Target,
    statements: Arc<Statements>,
}

impl SqlStore {
    /// Prepare connect options and statements from a validated configuration.
    ///
    /// # Errors
    /// Returns [`AuthError::Configuration`] if the driver rejects the DSN or
    /// one of the pass-through options.
    pub fn new(config: &SourceConfig) -> Result<Self, AuthError> {
        let auth_id = config.auth_id();
        let invalid =
            |e: sqlx::Error| AuthError::Configuration(format!("{auth_id}: invalid DSN: {e}"));

        let target = match config.dsn() {
            Dsn::Server { driver, url } => {
                let mut url = url.clone();
                if !config.options().is_empty() {
                    url.query_pairs_mut().extend_pairs(config.options());
                }

                let username = config.username();
                let password = config.password().expose_secret();

                match driver {
                    Driver::Postgres => {
                        let mut options = PgConnectOptions::from_str(url.as_str()).map_err(invalid)?;
                        if !username.is_empty() {
                            options = options.username(username);
                        }
                        if !password.is_empty() {
                            options = options.password(password);
                        }
                        Target::Postgres(options)
                    }
                    Driver::MySql => {
                        let mut options =
                            MySqlConnectOptions::from_str(url.as_str()).map_err(invalid)?;
                        if !username.is_empty() {
                            options = options.username(username);
                        }
                        if !password.is_empty() {
                            options = options.password(password);
                        }
                        Target::MySql(options)
                    }
                    Driver::Sqlite => {
                        return Err(AuthError::Configuration(format!(
                            "{auth_id}: sqlite DSNs must use the sqlite: form"
                        )));
                    }
                }
            }

            Dsn::Sqlite { url } => {
                let options = config.options().iter().fold(
                    SqliteConnectOptions::from_str(url).map_err(invalid)?,
                    |options, (key, value)| {
                        options.pragma(Cow::Owned(key.clone()), Cow::Owned(value.clone()))
                    },
                );
                Target::Sqlite(options)
            }
        };

        let driver = config.dsn().driver();

        Ok(Self {
            auth_id: Arc::from(auth_id),
            dsn: config.dsn().redacted(),
            driver,
            target,
            statements: Arc::new(Statements::new(driver, config.table(), config.uid_field())),
        })
    }

    #[must_use]
    pub const fn driver(&self) -> Driver {
        self.driver
    }

    #[must_use]
    pub fn statements(&self) -> &Statements {
        &self.statements
    }

    fn connection_error(&self, source: sqlx::Error) -> AuthError {
        AuthError::Connection {
            auth_id: self.auth_id.to_string(),
            dsn: self.dsn.clone(),
            source,
        }
    }

    async fn connect(&self) -> Result<SessionConnection, AuthError> {
        let mut conn = match &self.target {
            Target::Postgres(options) => PgConnection::connect_with(options)
                .await
                .map(SessionConnection::Postgres),
            Target::MySql(options) => MySqlConnection::connect_with(options)
                .await
                .map(SessionConnection::MySql),
            Target::Sqlite(options) => SqliteConnection::connect_with(options)
                .await
                .map(SessionConnection::Sqlite),
        }
        .map_err(|e| self.connection_error(e))?;

        if let Some(init) = self.driver.session_init() {
            let result = match &mut conn {
                SessionConnection::Postgres(c) => sqlx::Executor::execute(c, sqlx::raw_sql(init)).await.map(drop),
                SessionConnection::MySql(c) => sqlx::Executor::execute(c, sqlx::raw_sql(init)).await.map(drop),
                SessionConnection::Sqlite(c) => sqlx::Executor::execute(c, sqlx::raw_sql(init)).await.map(drop),
            };
            result.map_err(|e| self.connection_error(e))?;
        }

        Ok(conn)
    }
}

impl fmt::Debug for SqlStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlStore")
            .field("auth_id", &self.auth_id)
            .field("dsn", &self.dsn)
            .field("statements", &self.statements)
            .finish_non_exhaustive()
    }
}

impl UserStore for SqlStore {
    type Session = SqlSession;

    fn open(&self) -> StoreFuture<'_, SqlSession> {
        Box::pin(async move {
            let span = info_span!("db.connect", db.system = self.driver.system());
            let conn = self.connect().instrument(span).await?;

            debug!("{}: connected to {}", self.auth_id, self.dsn);

            Ok(SqlSession {
                auth_id: Arc::clone(&self.auth_id),
                driver: self.driver,
                conn,
                statements: Arc::clone(&self.statements),
            })
        })
    }
}

enum SessionConnection {
    Postgres(PgConnection),
    MySql(MySqlConnection),
    Sqlite(SqliteConnection),
}

/// One connection, alive for one verification.
pub struct SqlSession {
    auth_id: Arc<str>,
    driver: Driver,
    conn: SessionConnection,
    statements: Arc<Statements>,
}

fn to_records<R: ColumnText>(rows: &[R]) -> Result<Vec<UserRecord>, sqlx::Error> {
    rows.iter()
        .map(|row| decode::columns(row).map(UserRecord::new))
        .collect()
}

impl SqlSession {
    async fn update(&mut self, query: &str, username: &str) -> Result<u64, AuthError> {
        let span = info_span!(
            "db.query",
            db.system = self.driver.system(),
            db.operation = "UPDATE",
            db.statement = query
        );

        let result = match &mut self.conn {
            SessionConnection::Postgres(c) => sqlx::query(query)
                .bind(username)
                .execute(c)
                .instrument(span)
                .await
                .map(|r| r.rows_affected()),
            SessionConnection::MySql(c) => sqlx::query(query)
                .bind(username)
                .execute(c)
                .instrument(span)
                .await
                .map(|r| r.rows_affected()),
            SessionConnection::Sqlite(c) => sqlx::query(query)
                .bind(username)
                .execute(c)
                .instrument(span)
                .await
                .map(|r| r.rows_affected()),
        };

        result.map_err(|e| AuthError::query(&self.auth_id, "execute update", e))
    }
}

impl UserSession for SqlSession {
    fn find_unlocked<'a>(
        &'a mut self,
        username: &'a str,
        max_attempts: i64,
    ) -> StoreFuture<'a, Vec<UserRecord>> {
        Box::pin(async move {
            let statements = Arc::clone(&self.statements);
            let query = statements.select.as_str();
            let span = info_span!(
                "db.query",
                db.system = self.driver.system(),
                db.operation = "SELECT",
                db.statement = query
            );

            let auth_id = &self.auth_id;
            let executed = |e| AuthError::query(auth_id, "execute query", e);
            let fetched = |e| AuthError::query(auth_id, "fetch result set", e);

            match &mut self.conn {
                SessionConnection::Postgres(c) => {
                    let rows = sqlx::query(query)
                        .bind(username)
                        .bind(max_attempts)
                        .fetch_all(c)
                        .instrument(span)
                        .await
                        .map_err(executed)?;
                    to_records(&rows).map_err(fetched)
                }
                SessionConnection::MySql(c) => {
                    let rows = sqlx::query(query)
                        .bind(username)
                        .bind(max_attempts)
                        .fetch_all(c)
                        .instrument(span)
                        .await
                        .map_err(executed)?;
                    to_records(&rows).map_err(fetched)
                }
                SessionConnection::Sqlite(c) => {
                    let rows = sqlx::query(query)
                        .bind(username)
                        .bind(max_attempts)
                        .fetch_all(c)
                        .instrument(span)
                        .await
                        .map_err(executed)?;
                    to_records(&rows).map_err(fetched)
                }
            }
        })
    }

    fn increment_attempts<'a>(&'a mut self, username: &'a str) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let statements = Arc::clone(&self.statements);
            self.update(&statements.increment, username).await
        })
    }

    fn reset_attempts<'a>(&'a mut self, username: &'a str) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let statements = Arc::clone(&self.statements);
            self.update(&statements.reset, username).await
        })
    }

    fn close(self) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            let result = match self.conn {
                SessionConnection::Postgres(c) => c.close().await,
                SessionConnection::MySql(c) => c.close().await,
                SessionConnection::Sqlite(c) => c.close().await,
            };

            result.map_err(|e| AuthError::query(&self.auth_id, "close connection", e))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(dsn: &str) -> SourceConfig {
        let map = json!({
            "dsn": dsn,
            "username": "laravel",
            "password": "secret",
            "uidfield": "username",
            "options": { "application_name": "sqlauth" },
        });
        let serde_json::Value::Object(map) = map else {
            panic!("expected object");
        };
        SourceConfig::from_map("laravel-db", &map).unwrap()
    }

    #[test]
    fn statements_per_driver() {
        let pg = Statements::new(Driver::Postgres, "users", "username");
        assert_eq!(
            pg.select,
            r#"SELECT * FROM "users" WHERE "username" = $1 AND "login_attempts" < $2"#
        );
        assert_eq!(
            pg.increment,
            r#"UPDATE "users" SET "login_attempts" = "login_attempts" + 1 WHERE "username" = $1"#
        );
        assert_eq!(
            pg.reset,
            r#"UPDATE "users" SET "login_attempts" = 0 WHERE "username" = $1"#
        );

        let mysql = Statements::new(Driver::MySql, "users", "email");
        assert_eq!(
            mysql.select,
            "SELECT * FROM `users` WHERE `email` = ? AND `login_attempts` < ?"
        );
    }

    #[test]
    fn store_from_config() {
        let store = SqlStore::new(&config("pgsql:host=localhost;dbname=users")).unwrap();
        assert_eq!(store.driver(), Driver::Postgres);
        assert!(store.statements().select.contains("$2"));

        let store = SqlStore::new(&config("mysql:host=localhost;dbname=users")).unwrap();
        assert_eq!(store.driver(), Driver::MySql);

        let debug = format!("{store:?}");
        assert!(!debug.contains("secret"));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        let store = SqlStore::new(&config("sqlite:/nonexistent-dir/missing.db?mode=ro")).unwrap();
        match store.open().await {
            Err(AuthError::Connection { auth_id, dsn, .. }) => {
                assert_eq!(auth_id, "laravel-db");
                assert!(dsn.starts_with("sqlite://"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("connection should fail"),
        }
    }
}

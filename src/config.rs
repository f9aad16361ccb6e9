//! Authentication source configuration.
//!
//! A source is described by a JSON object:
//!
//! ```json
//! {
//!     "dsn": "mysql:host=localhost;dbname=laravel",
//!     "username": "laravel",
//!     "password": "secret",
//!     "uidfield": "username",
//!     "options": { "ssl-mode": "required" }
//! }
//! ```
//!
//! `table` (default `users`) and `max_attempts` (default `6`) are optional.
//! Everything is validated here, before any connection is attempted.

use crate::{error::AuthError, store::Dsn};
use regex::Regex;
use secrecy::SecretString;
use serde_json::{Map, Value};
use std::{collections::BTreeMap, fmt};

pub const DEFAULT_TABLE: &str = "users";
pub const DEFAULT_MAX_ATTEMPTS: i64 = 6;

const REQUIRED: [&str; 4] = ["dsn", "username", "password", "uidfield"];

#[derive(Clone)]
pub struct SourceConfig {
    auth_id: String,
    dsn: Dsn,
    username: String,
    password: SecretString,
    uid_field: String,
    table: String,
    max_attempts: i64,
    options: BTreeMap<String, String>,
}

impl SourceConfig {
    /// Build a configuration from a source definition.
    ///
    /// # Errors
    /// Returns [`AuthError::Configuration`] if a required attribute is missing
    /// or not a string, if an optional attribute has the wrong shape, or if
    /// the DSN or identifiers are invalid.
    pub fn from_map(auth_id: &str, config: &Map<String, Value>) -> Result<Self, AuthError> {
        for param in REQUIRED {
            match config.get(param) {
                None => {
                    return Err(AuthError::Configuration(format!(
                        "Missing required attribute '{param}' for authentication source {auth_id}"
                    )));
                }
                Some(Value::String(_)) => {}
                Some(other) => {
                    return Err(AuthError::Configuration(format!(
                        "Expected parameter '{param}' for authentication source {auth_id} to be a string. Instead it was: {other}"
                    )));
                }
            }
        }

        // Presence and type were checked above.
        let text = |key: &str| {
            config
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let dsn = Dsn::parse(&text("dsn")).map_err(|e| {
            AuthError::Configuration(format!("{auth_id}: {e}"))
        })?;

        let uid_field = text("uidfield");
        if !valid_identifier(&uid_field) {
            return Err(AuthError::Configuration(format!(
                "{auth_id}: 'uidfield' must be a plain column name, got '{uid_field}'"
            )));
        }

        let table = match config.get("table") {
            None => DEFAULT_TABLE.to_string(),
            Some(Value::String(table)) if valid_table(table) => table.clone(),
            Some(other) => {
                return Err(AuthError::Configuration(format!(
                    "{auth_id}: 'table' must be a table name, got {other}"
                )));
            }
        };

        let max_attempts = match config.get("max_attempts") {
            None => DEFAULT_MAX_ATTEMPTS,
            Some(value) => value.as_i64().filter(|n| *n > 0).ok_or_else(|| {
                AuthError::Configuration(format!(
                    "{auth_id}: 'max_attempts' must be a positive integer, got {value}"
                ))
            })?,
        };

        let options = match config.get("options") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(options)) => parse_options(auth_id, options)?,
            Some(other) => {
                return Err(AuthError::Configuration(format!(
                    "{auth_id}: 'options' must be an object, got {other}"
                )));
            }
        };

        Ok(Self {
            auth_id: auth_id.to_string(),
            dsn,
            username: text("username"),
            password: SecretString::from(text("password")),
            uid_field,
            table,
            max_attempts,
            options,
        })
    }

    #[must_use]
    pub fn auth_id(&self) -> &str {
        &self.auth_id
    }

    #[must_use]
    pub const fn dsn(&self) -> &Dsn {
        &self.dsn
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub const fn password(&self) -> &SecretString {
        &self.password
    }

    #[must_use]
    pub fn uid_field(&self) -> &str {
        &self.uid_field
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn max_attempts(&self) -> i64 {
        self.max_attempts
    }

    /// Driver parameters passed through to the connection as-is.
    #[must_use]
    pub const fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("auth_id", &self.auth_id)
            .field("dsn", &self.dsn.redacted())
            .field("username", &self.username)
            .field("password", &"***")
            .field("uid_field", &self.uid_field)
            .field("table", &self.table)
            .field("max_attempts", &self.max_attempts)
            .field("options", &self.options)
            .finish()
    }
}

fn parse_options(
    auth_id: &str,
    options: &Map<String, Value>,
) -> Result<BTreeMap<String, String>, AuthError> {
    options
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(AuthError::Configuration(format!(
                        "{auth_id}: option '{key}' must be a scalar, got {other}"
                    )));
                }
            };
            Ok((key.clone(), value))
        })
        .collect()
}

/// Column names end up inside SQL text, so only plain identifiers pass.
#[must_use]
pub fn valid_identifier(ident: &str) -> bool {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").map_or(false, |re| re.is_match(ident))
}

/// Table names may be schema qualified.
#[must_use]
pub fn valid_table(table: &str) -> bool {
    let mut parts = table.split('.');
    let valid = parts.by_ref().take(2).all(valid_identifier);
    valid && parts.next().is_none()
}

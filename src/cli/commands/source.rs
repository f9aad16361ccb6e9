//! Arguments describing the authentication source.
//!
//! A JSON file given with `--config` is read first; flags and `SQLAUTH_*`
//! variables override its keys. The merged object is validated by
//! [`SourceConfig::from_map`], so the CLI and embedding hosts share the same
//! rules and messages.

use crate::config::SourceConfig;
use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::{Map, Value};
use std::{fmt, fs};

pub const ARG_CONFIG: &str = "config";
pub const ARG_AUTH_ID: &str = "auth-id";
pub const ARG_DSN: &str = "dsn";
pub const ARG_DB_USERNAME: &str = "db-username";
pub const ARG_DB_PASSWORD: &str = "db-password";
pub const ARG_UIDFIELD: &str = "uidfield";
pub const ARG_TABLE: &str = "table";
pub const ARG_MAX_ATTEMPTS: &str = "max-attempts";
pub const ARG_DB_OPTION: &str = "db-option";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CONFIG)
                .short('c')
                .long("config")
                .help("JSON file with the source settings (dsn, username, password, uidfield, options)")
                .env("SQLAUTH_CONFIG")
                .global(true),
        )
        .arg(
            Arg::new(ARG_AUTH_ID)
                .long("auth-id")
                .help("Name of this authentication source, used in logs and errors")
                .env("SQLAUTH_AUTH_ID")
                .default_value("sqlauth")
                .global(true),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Database connection string, URL (postgres://, mysql://, sqlite:) or PDO style (mysql:host=..;dbname=..)")
                .env("SQLAUTH_DSN")
                .global(true),
        )
        .arg(
            Arg::new(ARG_DB_USERNAME)
                .long("db-username")
                .help("Database user (ignored for SQLite)")
                .env("SQLAUTH_DB_USERNAME")
                .global(true),
        )
        .arg(
            Arg::new(ARG_DB_PASSWORD)
                .long("db-password")
                .help("Database password (ignored for SQLite)")
                .env("SQLAUTH_DB_PASSWORD")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_UIDFIELD)
                .long("uidfield")
                .help("Column holding the login name")
                .env("SQLAUTH_UIDFIELD")
                .global(true),
        )
        .arg(
            Arg::new(ARG_TABLE)
                .long("table")
                .help("Users table, optionally schema qualified [default: users]")
                .env("SQLAUTH_TABLE")
                .global(true),
        )
        .arg(
            Arg::new(ARG_MAX_ATTEMPTS)
                .long("max-attempts")
                .help("Failed logins after which an account is locked [default: 6]")
                .env("SQLAUTH_MAX_ATTEMPTS")
                .value_parser(clap::value_parser!(i64).range(1..))
                .global(true),
        )
        .arg(
            Arg::new(ARG_DB_OPTION)
                .long("db-option")
                .help("Driver option as key=value, repeatable")
                .action(ArgAction::Append)
                .value_parser(parse_option)
                .global(true),
        )
}

fn parse_option(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[derive(Clone)]
pub struct Options {
    pub auth_id: String,
    pub settings: Map<String, Value>,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("auth_id", &self.auth_id)
            .field("settings", &self.settings.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Options {
    /// Merge the config file (if any) and the flags into one settings object.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or is not a JSON
    /// object.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let mut settings = match matches.get_one::<String>(ARG_CONFIG) {
            Some(path) => read_config(path)?,
            None => Map::new(),
        };

        let auth_id = matches
            .get_one::<String>(ARG_AUTH_ID)
            .cloned()
            .unwrap_or_else(|| "sqlauth".to_string());

        for (arg, key) in [
            (ARG_DSN, "dsn"),
            (ARG_DB_USERNAME, "username"),
            (ARG_DB_PASSWORD, "password"),
            (ARG_UIDFIELD, "uidfield"),
            (ARG_TABLE, "table"),
        ] {
            if let Some(value) = matches.get_one::<String>(arg) {
                settings.insert(key.to_string(), Value::String(value.clone()));
            }
        }

        if let Some(max) = matches.get_one::<i64>(ARG_MAX_ATTEMPTS) {
            settings.insert("max_attempts".to_string(), Value::from(*max));
        }

        if let Some(pairs) = matches.get_many::<(String, String)>(ARG_DB_OPTION) {
            let options = settings
                .entry("options")
                .or_insert_with(|| Value::Object(Map::new()));
            let Value::Object(options) = options else {
                return Err(anyhow!("'options' in the config file must be an object"));
            };
            for (key, value) in pairs {
                options.insert(key.clone(), Value::String(value.clone()));
            }
        }

        // Credentials are rarely needed for SQLite; default them so the
        // required-key check only fires for what the user actually forgot.
        for key in ["username", "password"] {
            settings
                .entry(key)
                .or_insert_with(|| Value::String(String::new()));
        }

        Ok(Self { auth_id, settings })
    }

    /// Validate the merged settings.
    ///
    /// # Errors
    /// Returns the configuration error for the first invalid key.
    pub fn source_config(&self) -> Result<SourceConfig> {
        Ok(SourceConfig::from_map(&self.auth_id, &self.settings)?)
    }
}

fn read_config(path: &str) -> Result<Map<String, Value>> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read config file: {path}"))?;
    let value: Value =
        serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in config file: {path}"))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!(
            "Config file {path} must hold a JSON object, found: {other}"
        )),
    }
}

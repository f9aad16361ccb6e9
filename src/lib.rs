//! # sqlauth (SQL-backed authentication source)
//!
//! Validates a username/password pair against a relational `users` table and
//! returns the user's attributes.
//!
//! ## Verification
//!
//! - **Lookup:** one parameterized `SELECT` on the configured username column,
//!   restricted to rows whose `login_attempts` is below the lockout threshold
//!   (default 6).
//! - **Password:** the stored hash decides the primitive (bcrypt `$2y$`/`$2b$`,
//!   Argon2 PHC strings); unknown formats never match.
//! - **Lockout:** a mismatch increments `login_attempts`, a match resets it.
//!   Unknown users, locked accounts and wrong passwords all surface as the
//!   same `InvalidCredentials` error so accounts cannot be enumerated.
//! - **Attributes:** every non-null column except `password`,
//!   `remember_token`, `login_attempts` and `updated_at`, as distinct string
//!   values.
//!
//! ## Stores
//!
//! PostgreSQL, MySQL/MariaDB and SQLite through `sqlx`. Each verification opens
//! and releases its own connection. DSNs can be PDO style
//! (`mysql:host=db;dbname=app`) or URLs (`postgres://db/app`).
//!
//! ## Hosts
//!
//! The library surface is [`CredentialVerifier::verify`], also reachable through
//! the object-safe [`AuthSource`] trait. The `sqlauth` binary
//! wraps it in a CLI and an HTTP adapter (`POST /login`).

pub mod api;
pub mod attributes;
pub mod cli;
pub mod config;
pub mod error;
pub mod password;
pub mod store;
pub mod verifier;

pub use attributes::AttributeSet;
pub use config::SourceConfig;
pub use error::AuthError;
pub use verifier::{AuthSource, CredentialVerifier};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

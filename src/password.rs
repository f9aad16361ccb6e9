//! Password hash verification.
//!
//! The algorithm is read from the stored hash itself, so rows hashed with
//! bcrypt and rows rehashed with Argon2 can live in the same table. Both
//! primitives compare in constant time.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use bcrypt::Version;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

/// Lowest cost accepted by bcrypt, only sensible for tests.
pub const MIN_COST: u32 = 4;

/// Laravel's default bcrypt cost.
pub const DEFAULT_COST: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    Bcrypt,
    Argon2,
    Unknown,
}

impl HashScheme {
    #[must_use]
    pub fn detect(hash: &str) -> Self {
        const BCRYPT: [&str; 4] = ["$2a$", "$2b$", "$2x$", "$2y$"];
        const ARGON2: [&str; 3] = ["$argon2i$", "$argon2d$", "$argon2id$"];

        if BCRYPT.iter().any(|prefix| hash.starts_with(prefix)) {
            Self::Bcrypt
        } else if ARGON2.iter().any(|prefix| hash.starts_with(prefix)) {
            Self::Argon2
        } else {
            Self::Unknown
        }
    }
}

/// Check a password against a stored hash.
///
/// Malformed or unrecognised hashes never match.
#[must_use]
pub fn verify(password: &SecretString, hash: &str) -> bool {
    let password = password.expose_secret();

    match HashScheme::detect(hash) {
        HashScheme::Bcrypt => bcrypt::verify(password, hash).unwrap_or_else(|e| {
            warn!("malformed bcrypt hash: {e}");
            false
        }),

        HashScheme::Argon2 => match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                warn!("malformed argon2 hash: {e}");
                false
            }
        },

        HashScheme::Unknown => {
            warn!("unrecognised password hash format");
            false
        }
    }
}

/// Hash a password the way Laravel does (`$2y$` bcrypt).
///
/// # Errors
/// Returns an error if the cost is outside bcrypt's range.
pub fn hash(password: &SecretString, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash_with_result(password.expose_secret(), cost)
        .map(|parts| parts.format_for_version(Version::TwoY))
}

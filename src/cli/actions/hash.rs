use super::password_or_line;
use crate::password;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::io;

#[derive(Debug)]
pub struct Args {
    pub password: Option<SecretString>,
    pub cost: u32,
}

/// Print a `$2y$` bcrypt hash of the password.
/// # Errors
/// Returns an error if no password is given or the cost is out of range.
pub fn execute(args: Args) -> Result<()> {
    let password = password_or_line(args.password, io::stdin().lock())?;

    let hashed = password::hash(&password, args.cost).context("Failed to hash password")?;

    println!("{hashed}");

    Ok(())
}

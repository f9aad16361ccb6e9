pub mod hash;
pub mod server;
pub mod unlock;
pub mod verify;

// The match over actions lives in run.rs.
mod run;

use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::io::BufRead;

#[derive(Debug)]
pub enum Action {
    Verify(verify::Args),
    Unlock(unlock::Args),
    Hash(hash::Args),
    Server(server::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> Result<()> {
        run::execute(self).await
    }
}

/// Use the given password or read one line from `input`.
fn password_or_line(password: Option<SecretString>, input: impl BufRead) -> Result<SecretString> {
    if let Some(password) = password {
        return Ok(password);
    }

    let line = input
        .lines()
        .next()
        .ok_or_else(|| anyhow!("No password given on stdin"))?
        .context("Failed to read password from stdin")?;

    Ok(SecretString::from(line.trim_end_matches('\r').to_string()))
}

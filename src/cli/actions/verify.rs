use super::password_or_line;
use crate::{cli::commands::source, verifier::CredentialVerifier};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::io;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub source: source::Options,
    pub username: String,
    pub password: Option<SecretString>,
}

/// Verify the pair and print the attributes as JSON on stdout.
/// # Errors
/// Returns an error if the configuration is invalid, the credentials are
/// rejected or the database fails.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.source.source_config()?;
    debug!("{config:?}");

    let password = password_or_line(args.password, io::stdin().lock())?;

    let verifier = CredentialVerifier::from_config(&config)?;
    let attributes = verifier.verify(&args.username, &password).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&attributes).context("Failed to encode attributes")?
    );

    Ok(())
}

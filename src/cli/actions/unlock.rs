use crate::{cli::commands::source, verifier::CredentialVerifier};
use anyhow::Result;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub source: source::Options,
    pub username: String,
}

/// Reset `login_attempts` for the user.
/// # Errors
/// Returns an error if the configuration is invalid or the update fails.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.source.source_config()?;
    let verifier = CredentialVerifier::from_config(&config)?;

    let rows = verifier.unlock(&args.username).await?;

    info!("{}: login_attempts reset on {rows} row(s)", verifier.auth_id());
    println!("{rows}");

    Ok(())
}

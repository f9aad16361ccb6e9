use crate::{api, cli::commands::source, verifier::CredentialVerifier};
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub source: source::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.source.source_config()?;
    debug!("{config:?}");

    let verifier = CredentialVerifier::from_config(&config)?;

    api::serve(args.port, Arc::new(verifier)).await
}

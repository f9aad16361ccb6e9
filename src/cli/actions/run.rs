use super::{hash, server, unlock, verify, Action};
use anyhow::Result;

pub(super) async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Verify(args) => verify::execute(args).await,
        Action::Unlock(args) => unlock::execute(args).await,
        Action::Hash(args) => hash::execute(args),
        Action::Server(args) => server::execute(args).await,
    }
}

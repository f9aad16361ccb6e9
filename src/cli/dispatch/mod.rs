//! Map parsed arguments to an [`Action`].

use crate::cli::{
    actions::{hash, server, unlock, verify, Action},
    commands::{
        source, ARG_COST, ARG_PASSWORD, ARG_PORT, ARG_USER, CMD_HASH, CMD_SERVE, CMD_UNLOCK,
        CMD_VERIFY,
    },
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or the config file is unusable.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let (name, sub) = matches.subcommand().context("missing subcommand")?;

    let username = || -> Result<String> {
        sub.get_one::<String>(ARG_USER)
            .cloned()
            .context("missing required argument: --user")
    };
    let password = || {
        sub.get_one::<String>(ARG_PASSWORD)
            .map(|p| SecretString::from(p.clone()))
    };

    match name {
        CMD_VERIFY => Ok(Action::Verify(verify::Args {
            source: source::Options::parse(sub)?,
            username: username()?,
            password: password(),
        })),

        CMD_UNLOCK => Ok(Action::Unlock(unlock::Args {
            source: source::Options::parse(sub)?,
            username: username()?,
        })),

        CMD_HASH => Ok(Action::Hash(hash::Args {
            password: password(),
            cost: sub
                .get_one::<u32>(ARG_COST)
                .copied()
                .context("missing argument: --cost")?,
        })),

        CMD_SERVE => Ok(Action::Server(server::Args {
            port: sub
                .get_one::<u16>(ARG_PORT)
                .copied()
                .context("missing argument: --port")?,
            source: source::Options::parse(sub)?,
        })),

        other => Err(anyhow!("unknown subcommand: {other}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn verify_action() {
        let matches = commands::new().get_matches_from([
            "sqlauth",
            "--dsn",
            "sqlite::memory:",
            "verify",
            "-u",
            "alice",
            "-p",
            "correct",
        ]);

        let Action::Verify(args) = handler(&matches).unwrap() else {
            panic!("expected verify");
        };
        assert_eq!(args.username, "alice");
        assert_eq!(
            args.password.as_ref().map(|p| p.expose_secret().to_string()),
            Some("correct".to_string())
        );
        assert_eq!(args.source.settings["dsn"], "sqlite::memory:");
    }

    #[test]
    fn hash_action_without_password() {
        let matches = commands::new().get_matches_from(["sqlauth", "hash", "--cost", "4"]);

        let Action::Hash(args) = handler(&matches).unwrap() else {
            panic!("expected hash");
        };
        assert!(args.password.is_none());
        assert_eq!(args.cost, 4);
    }

    #[test]
    fn hash_action_default_cost() {
        let matches = commands::new().get_matches_from(["sqlauth", "hash", "-p", "secret"]);

        let Action::Hash(args) = handler(&matches).unwrap() else {
            panic!("expected hash");
        };
        assert_eq!(args.cost, crate::password::DEFAULT_COST);
    }

    #[test]
    fn serve_action() {
        temp_env::with_vars_unset(["SQLAUTH_PORT"], || {
            let matches = commands::new().get_matches_from([
                "sqlauth",
                "serve",
                "--dsn",
                "postgres://db/app",
                "--uidfield",
                "email",
            ]);

            let Action::Server(args) = handler(&matches).unwrap() else {
                panic!("expected serve");
            };
            assert_eq!(args.port, 8080);
            assert_eq!(args.source.settings["uidfield"], "email");
        });
    }

    #[test]
    fn unlock_action() {
        let matches = commands::new().get_matches_from([
            "sqlauth",
            "unlock",
            "--user",
            "bob",
            "--dsn",
            "sqlite::memory:",
        ]);

        let Action::Unlock(args) = handler(&matches).unwrap() else {
            panic!("expected unlock");
        };
        assert_eq!(args.username, "bob");
    }
}

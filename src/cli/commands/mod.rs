use crate::password::MIN_COST;
use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub mod logging;
pub mod source;

pub const CMD_VERIFY: &str = "verify";
pub const CMD_UNLOCK: &str = "unlock";
pub const CMD_HASH: &str = "hash";
pub const CMD_SERVE: &str = "serve";

pub const ARG_USER: &str = "user";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_COST: &str = "cost";
pub const ARG_PORT: &str = "port";

fn user_arg() -> Arg {
    Arg::new(ARG_USER)
        .short('u')
        .long("user")
        .help("Login name to look up in the uidfield column")
        .required(true)
}

fn password_arg() -> Arg {
    Arg::new(ARG_PASSWORD)
        .short('p')
        .long("password")
        .help("Password to check, read from stdin when omitted")
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("sqlauth")
        .about("SQL-backed username/password authentication")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CMD_VERIFY)
                .about("Check a username/password pair and print the user's attributes as JSON")
                .arg(user_arg())
                .arg(password_arg()),
        )
        .subcommand(
            Command::new(CMD_UNLOCK)
                .about("Reset the failed login counter of a user")
                .arg(user_arg()),
        )
        .subcommand(
            Command::new(CMD_HASH)
                .about("Print a $2y$ bcrypt hash suitable for the password column")
                .arg(password_arg().help("Password to hash, read from stdin when omitted"))
                .arg(
                    Arg::new(ARG_COST)
                        .long("cost")
                        .help("bcrypt cost")
                        .default_value("10")
                        .value_parser(clap::value_parser!(u32).range(i64::from(MIN_COST)..=31)),
                ),
        )
        .subcommand(
            Command::new(CMD_SERVE)
                .about("Serve POST /login over HTTP")
                .arg(
                    Arg::new(ARG_PORT)
                        .short('p')
                        .long("port")
                        .help("Port to listen on")
                        .default_value("8080")
                        .env("SQLAUTH_PORT")
                        .value_parser(clap::value_parser!(u16)),
                ),
        );

    let command = source::with_args(command);
    logging::with_args(command)
}

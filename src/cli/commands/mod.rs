pub mod keys;
pub mod logging;
pub mod session;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Accept only `postgres://` or `postgresql://` connection strings.
fn validator_dsn(dsn: &str) -> Result<String, String> {
    let url = url::Url::parse(dsn).map_err(|err| format!("invalid DSN: {err}"))?;
    match url.scheme() {
        "postgres" | "postgresql" => Ok(dsn.to_string()),
        other => Err(format!("unsupported DSN scheme: {other}")),
    }
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("sesame")
        .about("Token admission and session cookie gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("SESAME_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string for the user store")
                .env("SESAME_DSN")
                .value_parser(validator_dsn)
                .required(true),
        );

    let command = keys::with_args(command);
    let command = session::with_args(command);
    logging::with_args(command)
}

//! Map validated CLI arguments to the action to run.

use crate::auth::KeyMaterialSource;
use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{keys, session};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let key_opts = keys::Options::parse(matches)?;
    let session_opts = session::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        keys: KeyMaterialSource {
            private_key_path: key_opts.private_key_path,
            public_key_path: key_opts.public_key_path,
            shared_secret: key_opts.shared_secret,
        },
        auth_cookie: session_opts.auth_cookie,
        cookie_same_site: session_opts.cookie_same_site,
        permission_timeout: session_opts.permission_timeout,
    }))
}

use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

use crate::auth::{SameSite, policy::DEFAULT_AUTH_COOKIE};

pub const ARG_AUTH_COOKIE: &str = "auth-cookie";
pub const ARG_COOKIE_SAME_SITE: &str = "cookie-same-site";
pub const ARG_PERMISSION_TIMEOUT: &str = "permission-timeout";

#[derive(Debug)]
pub struct Options {
    pub auth_cookie: String,
    pub cookie_same_site: SameSite,
    pub permission_timeout: Duration,
}

impl Options {
    /// # Errors
    /// Returns an error if a value is missing or cannot be parsed.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let auth_cookie = matches
            .get_one::<String>(ARG_AUTH_COOKIE)
            .cloned()
            .context("missing argument: --auth-cookie")?;
        if auth_cookie.trim().is_empty() {
            return Err(anyhow!("--auth-cookie must not be empty"));
        }

        let cookie_same_site = matches
            .get_one::<String>(ARG_COOKIE_SAME_SITE)
            .map_or(Ok(SameSite::None), |value| value.parse::<SameSite>())
            .map_err(|err| anyhow!("invalid --cookie-same-site: {err}"))?;

        let permission_timeout = matches
            .get_one::<u64>(ARG_PERMISSION_TIMEOUT)
            .copied()
            .map(Duration::from_millis)
            .context("missing argument: --permission-timeout")?;

        Ok(Self {
            auth_cookie,
            cookie_same_site,
            permission_timeout,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTH_COOKIE)
                .long(ARG_AUTH_COOKIE)
                .help("Name of the cookie carrying the session token")
                .env("SESAME_AUTH_COOKIE")
                .default_value(DEFAULT_AUTH_COOKIE),
        )
        .arg(
            Arg::new(ARG_COOKIE_SAME_SITE)
                .long(ARG_COOKIE_SAME_SITE)
                .help("SameSite attribute used when extending the session cookie")
                .env("SESAME_COOKIE_SAME_SITE")
                .value_parser(["none", "lax", "strict"])
                .ignore_case(true)
                .default_value("none"),
        )
        .arg(
            Arg::new(ARG_PERMISSION_TIMEOUT)
                .long(ARG_PERMISSION_TIMEOUT)
                .help("Admin permission lookup timeout in milliseconds")
                .env("SESAME_PERMISSION_TIMEOUT_MS")
                .default_value("2000")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::path::PathBuf;

pub const ARG_JWT_PRIVATE_KEY: &str = "jwt-private-key";
pub const ARG_JWT_PUBLIC_KEY: &str = "jwt-public-key";
pub const ARG_JWT_SECRET: &str = "jwt-secret";

#[derive(Debug)]
pub struct Options {
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub shared_secret: SecretString,
}

impl Options {
    /// # Errors
    /// Returns an error if a key argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let private_key_path = matches
            .get_one::<PathBuf>(ARG_JWT_PRIVATE_KEY)
            .cloned()
            .context("missing required argument: --jwt-private-key")?;
        let public_key_path = matches
            .get_one::<PathBuf>(ARG_JWT_PUBLIC_KEY)
            .cloned()
            .context("missing required argument: --jwt-public-key")?;
        let shared_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .map(|secret| SecretString::from(secret.clone()))
            .context("missing required argument: --jwt-secret")?;

        Ok(Self {
            private_key_path,
            public_key_path,
            shared_secret,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_PRIVATE_KEY)
                .long(ARG_JWT_PRIVATE_KEY)
                .help("Path to the RSA private key (PEM) for the asymmetric scheme")
                .env("SESAME_JWT_PRIVATE_KEY")
                .value_parser(clap::value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new(ARG_JWT_PUBLIC_KEY)
                .long(ARG_JWT_PUBLIC_KEY)
                .help("Path to the RSA public key (PEM) for the asymmetric scheme")
                .env("SESAME_JWT_PUBLIC_KEY")
                .value_parser(clap::value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Shared secret for the symmetric scheme")
                .env("SESAME_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
}

use crate::{
    auth::{CookiePolicy, KeyMaterial, KeyMaterialSource, SameSite, Scheme},
    sesame,
};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub keys: KeyMaterialSource,
    pub auth_cookie: String,
    pub cookie_same_site: SameSite,
    pub permission_timeout: Duration,
}

/// Execute the server action.
/// # Errors
/// Returns an error if key material cannot be loaded, the database is
/// unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let keys = KeyMaterial::load(&args.keys).context("Failed to load key material")?;

    let cookie_policy = CookiePolicy {
        cookie_name: args.auth_cookie,
        scheme: Scheme::Asymmetric,
        extend_same_site: args.cookie_same_site,
    };

    debug!(?cookie_policy, permission_timeout = ?args.permission_timeout, "starting server");

    sesame::new(
        args.port,
        &args.dsn,
        keys,
        cookie_policy,
        args.permission_timeout,
    )
    .await
}

//! Admin flag lookup, backed by the user store.
//!
//! The flag is re-read on every admin-route request; nothing is cached so a
//! revoked privilege takes effect on the next request.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;

#[async_trait]
pub trait PermissionResolver: Send + Sync {
    /// Return whether `subject` holds admin rights.
    async fn is_admin(&self, subject: &str) -> Result<bool>;
}

/// Resolver reading the `is_admin` column of the `users` table.
#[derive(Clone, Debug)]
pub struct PgPermissionResolver {
    pool: PgPool,
}

impl PgPermissionResolver {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionResolver for PgPermissionResolver {
    async fn is_admin(&self, subject: &str) -> Result<bool> {
        let query = r"
            SELECT is_admin
            FROM users
            WHERE email = $1
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(subject)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup admin permission")?;

        admin_flag(row.map(|row| row.try_get::<Option<bool>, _>("is_admin")))
    }
}

/// Unknown users and a NULL flag hold no privilege; a column that cannot be
/// decoded is a lookup failure.
fn admin_flag(column: Option<Result<Option<bool>, sqlx::Error>>) -> Result<bool> {
    match column {
        None | Some(Ok(None)) => Ok(false),
        Some(Ok(Some(is_admin))) => Ok(is_admin),
        Some(Err(err)) => Err(err).context("failed to decode is_admin"),
    }
}

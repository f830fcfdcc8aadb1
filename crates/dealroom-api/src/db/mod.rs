//! # Database Persistence Layer
//!
//! Optional Postgres persistence via SQLx. When `DATABASE_URL` is set, deal
//! room snapshots and audit entries are written to Postgres and the
//! in-memory stores are hydrated from it on startup. When absent, the API
//! runs in in-memory-only mode (development and tests).
//!
//! Writes happen on spawned tasks after the in-memory commit. A failed write
//! is logged and never fails the request that caused it.

pub mod audit;
pub mod deals;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect and run the embedded migrations.
///
/// Returns `None` when no URL is configured.
pub async fn init_pool(url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = url else {
        tracing::warn!(
            "DATABASE_URL not set, running in-memory only mode. \
             Deals will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;
    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

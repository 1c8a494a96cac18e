//! PostgreSQL bootstrap for tiffind (feature `postgres`).
//!
//! Connects a `PgStore` from `DATABASE_URL`. The schema itself ships
//! as `tiffin-store/schema.sql`; apply it with psql before first run.

use std::env;

use tiffin_store::PgStore;

use crate::error::{ServiceError, ServiceResult};

/// Connect a `PgStore` using the `DATABASE_URL` environment variable.
pub async fn connect_store() -> ServiceResult<PgStore> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| ServiceError::Config("DATABASE_URL is required for postgres mode".to_string()))?;

    let pool = sqlx::PgPool::connect(&database_url)
        .await
        .map_err(|e| ServiceError::Config(format!("Failed to connect to PostgreSQL: {e}")))?;

    tracing::info!("Connected to PostgreSQL");

    Ok(PgStore::new(pool))
}

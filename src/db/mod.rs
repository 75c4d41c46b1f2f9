pub mod campers;
pub mod import_jobs;
pub mod lookups;

#[cfg(test)]
pub mod testing;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to database")?;

    info!("Connected to database");
    Ok(pool)
}

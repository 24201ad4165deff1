//! # Campusdesk DB
//!
//! Database pool, migrations and the Postgres implementation of
//! [`EnrollmentStore`](campusdesk_enrollment::EnrollmentStore).
//!
//! # Example
//!
//! ```ignore
//! use campusdesk_db::{PgEnrollmentStore, init_db_pool, run_migrations};
//!
//! let pool = init_db_pool(10).await?;
//! run_migrations(&pool).await?;
//! let store = PgEnrollmentStore::new(pool);
//! ```

use std::env;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

pub mod store;

pub use store::PgEnrollmentStore;

// Re-export PgPool for convenience
pub use sqlx::PgPool;

/// Connects to the database named by `DATABASE_URL`.
///
/// The returned pool is cheaply cloneable and should be created once at
/// startup and shared through application state.
pub async fn init_db_pool(max_connections: u32) -> anyhow::Result<PgPool> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    info!(max_connections, "Database pool ready");
    Ok(pool)
}

/// Applies the migrations embedded from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(())
}

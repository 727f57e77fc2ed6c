//! Persistence for the Folio wiki.
//!
//! - [`models`] -- row structs and write DTOs.
//! - [`repositories`] -- zero-sized sqlx repositories, one per table group.
//! - [`store`] -- the [`store::WikiStore`] trait and its Postgres implementation.
//! - [`memory`] -- an in-process store for development and tests.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod repositories;
pub mod store;

pub use memory::MemoryWikiStore;
pub use store::{PgWikiStore, StoreError, StoreResult, WikiStore};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

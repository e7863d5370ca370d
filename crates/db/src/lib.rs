//! PostgreSQL persistence for community-share entities.
//!
//! Connection pool and migrations live here, along with the [`Session`]
//! unit-of-work abstraction and the session-level entity operations in
//! [`ops`]. Rows are read and written through each type's accessor table, so
//! any [`cshare_core::entity::Serializable`] type with a matching table can be
//! persisted.

pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod ops;
pub mod session;
pub mod sql;

use sqlx::postgres::PgPoolOptions;

pub use config::DbConfig;
pub use error::{DbError, DbResult};
pub use ops::{admin_add, admin_deserialize, admin_edit, delete, list};
pub use session::{PgSession, Session};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from configuration.
pub async fn create_pool(config: &DbConfig) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    tracing::info!(
        max_connections = config.max_connections,
        "Database connection pool created"
    );
    Ok(pool)
}

/// Round-trip a trivial query to verify connectivity.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

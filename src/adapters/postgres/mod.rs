//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresMessageStore` - Message reads and transactional writes
//! - `connect` - Pool construction from [`DatabaseConfig`]

mod message_store;

pub use message_store::PostgresMessageStore;

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::domain::foundation::DomainError;

/// Opens a connection pool and optionally applies migrations.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DomainError> {
    let options = PgConnectOptions::from_str(&config.url)
        .map_err(|e| DomainError::database("Invalid database URL", e))?
        .application_name(&config.application_name);

    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .connect_with(options)
        .await
        .map_err(|e| DomainError::database("Failed to connect to database", e))?;

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DomainError::database("Failed to run migrations", e))?;
        tracing::info!("Database migrations applied");
    }

    Ok(pool)
}

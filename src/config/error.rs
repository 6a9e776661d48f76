//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Timeout must be greater than zero: {0}")]
    ZeroTimeout(&'static str),

    #[error("Queue capacity must be greater than zero")]
    ZeroCapacity,

    #[error("Backoff multiplier must be at least 1.0")]
    InvalidBackoffMultiplier,

    #[error("Base backoff exceeds the backoff ceiling")]
    BackoffExceedsCeiling,

    #[error("Premium credit ceiling is below the standard ceiling")]
    InvalidCreditTiers,

    #[error("Invalid log filter directive: {0}")]
    InvalidLogFilter(String),
}

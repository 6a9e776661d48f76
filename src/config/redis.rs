//! Redis configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Redis configuration for the worker pool broker
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Lifetime the worker pool gives a reply key, in seconds
    #[serde(default = "default_reply_ttl")]
    pub reply_ttl_secs: u64,

    /// Prefix for task list and reply keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl RedisConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get reply key lifetime as Duration
    pub fn reply_ttl(&self) -> Duration {
        Duration::from_secs(self.reply_ttl_secs)
    }

    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout("timeout_secs"));
        }
        if self.reply_ttl_secs == 0 {
            return Err(ValidationError::ZeroTimeout("reply_ttl_secs"));
        }
        if self.key_prefix.trim().is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_KEY_PREFIX"));
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_timeout(),
            reply_ttl_secs: default_reply_ttl(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_timeout() -> u64 {
    5
}

fn default_reply_ttl() -> u64 {
    300
}

fn default_key_prefix() -> String {
    "chatline".to_string()
}

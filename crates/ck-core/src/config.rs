//! Configuration types and loading

use serde::{Deserialize, Serialize};

/// Query engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Largest `take` a paged lookup accepts
    pub max_page_size: u64,
    /// Page size UI collaborators should start from
    pub default_page_size: u64,
    /// Whether queries created by a repository auto-include navigations
    pub auto_include: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_page_size: 1000,
            default_page_size: 20,
            auto_include: false,
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl QueryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("CRUDKIT_MAX_PAGE_SIZE") {
            config.max_page_size = parse_positive("CRUDKIT_MAX_PAGE_SIZE", &value)?;
        }
        if let Some(value) = lookup("CRUDKIT_DEFAULT_PAGE_SIZE") {
            config.default_page_size = parse_positive("CRUDKIT_DEFAULT_PAGE_SIZE", &value)?;
        }
        if let Some(value) = lookup("CRUDKIT_AUTO_INCLUDE") {
            config.auto_include = matches!(value.as_str(), "true" | "1" | "yes");
        }

        if config.default_page_size > config.max_page_size {
            return Err(ConfigError::InvalidValue {
                key: "CRUDKIT_DEFAULT_PAGE_SIZE".to_string(),
                message: format!(
                    "{} exceeds the maximum page size {}",
                    config.default_page_size, config.max_page_size
                ),
            });
        }

        tracing::debug!(
            max_page_size = config.max_page_size,
            default_page_size = config.default_page_size,
            auto_include = config.auto_include,
            "Loaded query configuration"
        );

        Ok(config)
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a positive integer, got '{}'", value),
        }),
    }
}

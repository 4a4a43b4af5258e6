//! Engine configuration.
//!
//! Tunable limits for search, hierarchy walks and field validation.
//! Configuration is loaded from environment variables with defaults that
//! match the stock deployment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Limits applied by the governance services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Result limit for user search when the caller passes none.
    pub default_search_limit: usize,

    /// Upper bound a caller-supplied search limit is clamped to.
    pub max_search_limit: usize,

    /// Longest ancestor path walked before the data is declared corrupt.
    pub max_hierarchy_depth: usize,

    /// Maximum length of organization, profile, role and permission names.
    pub name_max_len: usize,

    /// Maximum length of an organization abbreviation.
    pub abbreviation_max_len: usize,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            default_search_limit: 10,
            max_search_limit: 50,
            max_hierarchy_depth: 64,
            name_max_len: 255,
            abbreviation_max_len: 50,
        }
    }
}

impl GovernanceConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GOVERNANCE_SEARCH_LIMIT`: default user search limit (default: 10)
    /// - `GOVERNANCE_MAX_SEARCH_LIMIT`: search limit ceiling (default: 50)
    /// - `GOVERNANCE_MAX_HIERARCHY_DEPTH`: ancestor walk bound (default: 64)
    /// - `GOVERNANCE_NAME_MAX_LEN`: name length limit (default: 255)
    /// - `GOVERNANCE_ABBREVIATION_MAX_LEN`: abbreviation length limit (default: 50)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            default_search_limit: env_usize("GOVERNANCE_SEARCH_LIMIT")
                .unwrap_or(default.default_search_limit),
            max_search_limit: env_usize("GOVERNANCE_MAX_SEARCH_LIMIT")
                .unwrap_or(default.max_search_limit),
            max_hierarchy_depth: env_usize("GOVERNANCE_MAX_HIERARCHY_DEPTH")
                .unwrap_or(default.max_hierarchy_depth),
            name_max_len: env_usize("GOVERNANCE_NAME_MAX_LEN").unwrap_or(default.name_max_len),
            abbreviation_max_len: env_usize("GOVERNANCE_ABBREVIATION_MAX_LEN")
                .unwrap_or(default.abbreviation_max_len),
        }
    }

    /// Check that every limit is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("GOVERNANCE_SEARCH_LIMIT", self.default_search_limit),
            ("GOVERNANCE_MAX_SEARCH_LIMIT", self.max_search_limit),
            ("GOVERNANCE_MAX_HIERARCHY_DEPTH", self.max_hierarchy_depth),
            ("GOVERNANCE_NAME_MAX_LEN", self.name_max_len),
            ("GOVERNANCE_ABBREVIATION_MAX_LEN", self.abbreviation_max_len),
        ];
        for (key, value) in limits {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        if self.default_search_limit > self.max_search_limit {
            return Err(ConfigError::InvalidValue {
                key: "GOVERNANCE_SEARCH_LIMIT".to_string(),
                message: format!("exceeds the ceiling of {}", self.max_search_limit),
            });
        }
        Ok(())
    }

    /// Resolve a caller-supplied search limit against the configured bounds.
    pub fn search_limit(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(0) | None => self.default_search_limit,
            Some(n) => n.min(self.max_search_limit),
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

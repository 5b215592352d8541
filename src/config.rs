//! Controller and client configuration.
//!
//! Both structs deserialize from TOML with every field optional:
//!
//! ```toml
//! debounce_ms = 300
//! search_param = "q"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default quiet period before a search term is fetched.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Settings for one [`ResourceController`](crate::ResourceController).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Debounce window for search input, in milliseconds.
    pub debounce_ms: u64,
    /// Request parameter carrying the debounced search term.
    pub search_param: String,
    /// Request parameter carrying the sort column.
    pub sort_param: String,
    /// Request parameter carrying the sort direction.
    pub order_param: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            search_param: "search".to_string(),
            sort_param: "sort_by".to_string(),
            order_param: "sort_order".to_string(),
        }
    }
}

impl ControllerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Reject empty or clashing parameter names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("search_param", &self.search_param),
            ("sort_param", &self.sort_param),
            ("order_param", &self.order_param),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
            }
            if value == crate::key::PAGE_PARAM {
                return Err(ConfigError::Invalid(format!(
                    "{} must not be \"{}\"",
                    field,
                    crate::key::PAGE_PARAM
                )));
            }
        }
        if self.sort_param == self.order_param {
            return Err(ConfigError::Invalid(
                "sort_param and order_param must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for the HTTP transport.
#[cfg(feature = "http")]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root, e.g. `https://api.example.com/admin`.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Sent as `Authorization: Bearer <token>` when present.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

#[cfg(feature = "http")]
fn default_timeout_ms() -> u64 {
    30_000
}

#[cfg(feature = "http")]
impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: default_timeout_ms(),
            bearer_token: None,
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must be an http(s) URL, got {:?}",
                config.base_url
            )));
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

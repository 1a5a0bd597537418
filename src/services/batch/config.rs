//! Batch Node Configuration
//!
//! Serializable configuration for a batch node. Loadable from JSON or from a
//! TOML file, either as a bare table or under a `[batch]` section:
//!
//! ```toml
//! [batch]
//! name = "DocumentReviewer"
//! max_concurrency = 3
//! cancel_on_failure = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

use super::types::DEFAULT_NODE_NAME;

/// Configuration for a batch node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchNodeConfig {
    /// Node name used in logs and callbacks
    #[serde(default = "default_name")]
    pub name: String,
    /// 0 runs items one at a time; N > 0 runs at most N items at once
    #[serde(default, alias = "max_concurrency")]
    pub max_concurrency: usize,
    /// Cancel in-flight siblings once an item fails
    #[serde(default, alias = "cancel_on_failure")]
    pub cancel_on_failure: bool,
}

fn default_name() -> String {
    DEFAULT_NODE_NAME.to_string()
}

impl Default for BatchNodeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_concurrency: 0,
            cancel_on_failure: false,
        }
    }
}

impl BatchNodeConfig {
    /// Create a sequential configuration with the given name.
    ///
    /// An empty name falls back to the default node name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: if name.is_empty() { default_name() } else { name },
            ..Self::default()
        }
    }

    /// Builder: set the concurrency bound.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Builder: cancel siblings on the first failure.
    pub fn with_cancel_on_failure(mut self, enabled: bool) -> Self {
        self.cancel_on_failure = enabled;
        self
    }

    /// Whether items run strictly one after another.
    pub fn is_sequential(&self) -> bool {
        self.max_concurrency == 0
    }

    /// Check the configuration for values that cannot be normalized.
    pub fn validate(&self) -> AppResult<()> {
        if !self.name.is_empty() && self.name.trim().is_empty() {
            return Err(AppError::validation(
                "Batch node name must not be whitespace only",
            ));
        }
        Ok(())
    }

    /// Parse a TOML document, reading the `[batch]` table when present.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let table: toml::Table = toml::from_str(content)
            .map_err(|e| AppError::config(format!("Invalid batch config TOML: {}", e)))?;

        let section = match table.get("batch") {
            Some(toml::Value::Table(batch)) => batch.clone(),
            Some(_) => return Err(AppError::config("`batch` must be a table")),
            None => table,
        };

        let mut config: BatchNodeConfig = toml::Value::Table(section)
            .try_into()
            .map_err(|e| AppError::config(format!("Invalid batch config: {}", e)))?;
        if config.name.is_empty() {
            config.name = default_name();
        }
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }
}

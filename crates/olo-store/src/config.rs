//! Store configuration
//!
//! Deserialized from the `[store]` section of the application config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Key namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "olo-ui";

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Redis URL; when unset or unreachable the memory backend is used
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Prefix for every Redis key the application owns
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// JSON snapshot file for the memory backend
    #[serde(default)]
    pub snapshot_file: Option<PathBuf>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            namespace: default_namespace(),
            snapshot_file: None,
        }
    }
}

impl StoreConfig {
    /// Configured Redis URL, ignoring blank values
    #[must_use]
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

//! # Registry Configuration
//!
//! ```toml
//! max_concurrent = 4
//! hot_reload = true
//! hot_reload_interval_ms = 1000
//! worker_stack_size = 1048576
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ResourceError, ResourceResult};

/// Settings of a [`ResourceRegistry`](crate::ResourceRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Maximum number of asynchronous loads running at once.
    pub max_concurrent: usize,
    /// Whether the hot-reload sweep runs during `tick`.
    pub hot_reload: bool,
    /// Minimum wall time between two hot-reload sweeps.
    pub hot_reload_interval_ms: u64,
    /// Stack size of load worker threads (platform default if unset).
    pub worker_stack_size: Option<usize>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            hot_reload: false,
            hot_reload_interval_ms: 1000,
            worker_stack_size: None,
        }
    }
}

impl RegistryConfig {
    /// Configuration for asset-editing sessions: hot-reload on.
    #[must_use]
    pub fn development() -> Self {
        Self {
            hot_reload: true,
            ..Self::default()
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidConfig`] on parse or validation failure.
    pub fn from_toml_str(source: &str) -> ResourceResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| ResourceError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidConfig`] if the file cannot be read or is invalid.
    pub fn from_toml_file(path: impl AsRef<Path>) -> ResourceResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ResourceError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidConfig`] if `max_concurrent` is zero.
    pub fn validate(&self) -> ResourceResult<()> {
        if self.max_concurrent == 0 {
            return Err(ResourceError::InvalidConfig(
                "max_concurrent must be greater than zero".into(),
            ));
        }
        if self.worker_stack_size == Some(0) {
            return Err(ResourceError::InvalidConfig(
                "worker_stack_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// [`hot_reload_interval_ms`](Self::hot_reload_interval_ms) as a duration.
    #[inline]
    #[must_use]
    pub const fn hot_reload_interval(&self) -> Duration {
        Duration::from_millis(self.hot_reload_interval_ms)
    }
}

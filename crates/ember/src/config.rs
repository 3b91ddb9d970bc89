//! # Engine Configuration
//!
//! One TOML document configures the whole engine:
//!
//! ```toml
//! [world]
//! max_entities = 10000
//!
//! [resources]
//! max_concurrent = 4
//! hot_reload = true
//!
//! [frame]
//! max_delta_ms = 100
//! slow_frame_ms = 33
//! ```
//!
//! Every section and key is optional.

use std::path::Path;
use std::time::Duration;

use ember_core::WorldConfig;
use ember_resources::RegistryConfig;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Frame timing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameLoopConfig {
    /// Upper bound on the delta passed to systems, so a stall does not
    /// produce one huge step.
    pub max_delta_ms: u64,
    /// Frames longer than this are logged as slow.
    pub slow_frame_ms: u64,
}

impl Default for FrameLoopConfig {
    fn default() -> Self {
        Self {
            max_delta_ms: 100,
            slow_frame_ms: 33,
        }
    }
}

impl FrameLoopConfig {
    /// [`max_delta_ms`](Self::max_delta_ms) as a duration.
    #[inline]
    #[must_use]
    pub const fn max_delta(&self) -> Duration {
        Duration::from_millis(self.max_delta_ms)
    }

    /// [`slow_frame_ms`](Self::slow_frame_ms) as a duration.
    #[inline]
    #[must_use]
    pub const fn slow_frame(&self) -> Duration {
        Duration::from_millis(self.slow_frame_ms)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `max_delta_ms` is zero.
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_delta_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "max_delta_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration of a [`FrameLoop`](crate::FrameLoop) and what it drives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// World sizing.
    pub world: WorldConfig,
    /// Resource registry settings.
    pub resources: RegistryConfig,
    /// Frame timing.
    pub frame: FrameLoopConfig,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] on parse failure, or the
    /// section's own error on validation failure.
    pub fn from_toml_str(source: &str) -> EngineResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Same as [`from_toml_str`](Self::from_toml_str), plus
    /// [`EngineError::InvalidConfig`] if the file cannot be read.
    pub fn from_toml_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EngineError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// The first section error found.
    pub fn validate(&self) -> EngineResult<()> {
        self.world.validate()?;
        self.resources.validate()?;
        self.frame.validate()
    }
}

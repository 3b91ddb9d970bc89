//! # World Configuration
//!
//! ```toml
//! max_entities = 10000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ecs::MAX_ENTITIES;
use crate::error::{EcsError, EcsResult};

/// Sizing of a [`World`](crate::World).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Maximum number of live entities; also the capacity of every store.
    pub max_entities: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_entities: MAX_ENTITIES,
        }
    }
}

impl WorldConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on parse or validation failure.
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or is invalid.
    pub fn from_toml_file(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EcsError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if `max_entities` is zero or
    /// collides with the null entity id.
    pub fn validate(&self) -> EcsResult<()> {
        if self.max_entities == 0 {
            return Err(EcsError::InvalidConfig(
                "max_entities must be greater than zero".into(),
            ));
        }
        if self.max_entities >= u32::MAX as usize {
            return Err(EcsError::InvalidConfig(format!(
                "max_entities must be below {}",
                u32::MAX
            )));
        }
        Ok(())
    }
}

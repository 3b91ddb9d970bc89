//! # Engine Error Types

use ember_core::EcsError;
use ember_resources::ResourceError;
use thiserror::Error;

/// Errors raised while assembling an engine from configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// World construction failed.
    #[error("world: {0}")]
    Ecs(#[from] EcsError),

    /// Registry construction failed.
    #[error("resources: {0}")]
    Resource(#[from] ResourceError),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for engine assembly.
pub type EngineResult<T> = Result<T, EngineError>;

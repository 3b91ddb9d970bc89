//! # Resource Error Types
//!
//! All errors that can occur while loading or managing resources.

use thiserror::Error;

/// Errors that can occur in the resource registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The path does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Reading the file failed.
    #[error("failed to read {path}: {message}")]
    Io {
        /// The path being read.
        path: String,
        /// The underlying I/O error.
        message: String,
    },

    /// The loader could not make sense of the file's contents.
    #[error("{loader} rejected {path}: {reason}")]
    Rejected {
        /// Name of the loader.
        loader: String,
        /// The path being loaded.
        path: String,
        /// Why the content was rejected.
        reason: String,
    },

    /// The handle does not name a live resource.
    #[error("invalid resource handle {0}")]
    InvalidHandle(u32),

    /// The load was cancelled by an unload before it finished.
    #[error("load cancelled")]
    Cancelled,

    /// A worker thread could not be started or died mid-load.
    #[error("load worker failed: {0}")]
    Worker(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ResourceError {
    /// Wraps an I/O error for `path`, mapping "not found" to [`ResourceError::NotFound`].
    pub(crate) fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.display().to_string())
        } else {
            Self::Io {
                path: path.display().to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

//! # Resource Loaders
//!
//! A loader turns a file into typed data. The registry picks the first
//! registered loader whose extensions match the path; [`RawLoader`] is the
//! fallback for everything else.

use std::any::{type_name, Any};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{ResourceError, ResourceResult};
use crate::fs::FileSystem;

/// Typed payload produced by a loader.
#[derive(Clone)]
pub struct LoadedResource {
    /// The data, downcast by consumers.
    pub data: Arc<dyn Any + Send + Sync>,
    /// Approximate size in bytes.
    pub size_bytes: usize,
}

impl LoadedResource {
    /// Wraps a value.
    pub fn new<T: Any + Send + Sync>(value: T, size_bytes: usize) -> Self {
        Self {
            data: Arc::new(value),
            size_bytes,
        }
    }
}

impl fmt::Debug for LoadedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedResource")
            .field("size_bytes", &self.size_bytes)
            .finish_non_exhaustive()
    }
}

/// Converts files into typed data.
///
/// Loaders run on worker threads for asynchronous loads, so they must be
/// `Send + Sync` and must not call back into the registry.
pub trait ResourceLoader: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Extensions handled, without the dot. Empty means any.
    fn extensions(&self) -> &[&str];

    /// Loads `path` through `fs`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`] if the file is missing, unreadable, or
    /// its content is rejected.
    fn load(&self, path: &Path, fs: &dyn FileSystem) -> ResourceResult<LoadedResource>;

    /// Releases data produced by [`load`](Self::load).
    fn unload(&self, _resource: LoadedResource) {}

    /// Whether this loader handles `path` (case-insensitive on the extension).
    fn supports(&self, path: &Path) -> bool {
        let extensions = self.extensions();
        if extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                extensions
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(extension))
            })
    }
}

/// Reads `path` through `fs`, mapping I/O errors.
///
/// # Errors
///
/// [`ResourceError::NotFound`] or [`ResourceError::Io`].
pub fn read_bytes(path: &Path, fs: &dyn FileSystem) -> ResourceResult<Vec<u8>> {
    fs.read(path).map_err(|err| ResourceError::io(path, &err))
}

/// Loads any file as its raw bytes (`Vec<u8>`).
#[derive(Debug, Default, Clone, Copy)]
pub struct RawLoader;

impl ResourceLoader for RawLoader {
    fn name(&self) -> &str {
        "raw"
    }

    fn extensions(&self) -> &[&str] {
        &[]
    }

    fn load(&self, path: &Path, fs: &dyn FileSystem) -> ResourceResult<LoadedResource> {
        let bytes = read_bytes(path, fs)?;
        let size = bytes.len();
        Ok(LoadedResource::new(bytes, size))
    }
}

/// Parses `toml` and `cfg` files into a [`toml::Table`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlLoader;

impl ResourceLoader for TomlLoader {
    fn name(&self) -> &str {
        "toml"
    }

    fn extensions(&self) -> &[&str] {
        &["toml", "cfg"]
    }

    fn load(&self, path: &Path, fs: &dyn FileSystem) -> ResourceResult<LoadedResource> {
        let bytes = read_bytes(path, fs)?;
        let size = bytes.len();
        let rejected = |reason: String| ResourceError::Rejected {
            loader: self.name().to_owned(),
            path: path.display().to_string(),
            reason,
        };

        let text = String::from_utf8(bytes).map_err(|e| rejected(e.to_string()))?;
        let table: toml::Table = text.parse().map_err(|e: toml::de::Error| rejected(e.to_string()))?;
        Ok(LoadedResource::new(table, size))
    }
}

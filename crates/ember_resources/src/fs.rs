//! # Filesystem Collaborator
//!
//! The registry only needs four operations from the filesystem. Loaders
//! receive the same collaborator, so a registry backed by
//! [`MemoryFileSystem`] never touches the disk.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;

/// Filesystem operations used by the registry and its loaders.
pub trait FileSystem: Send + Sync {
    /// Reads the whole file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Checks whether the file exists.
    fn exists(&self, path: &Path) -> bool;

    /// Last modification time.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Canonical form of the path, used as the registry's dedup key.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// The process filesystem via [`std::fs`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}

#[derive(Clone)]
struct MemoryFile {
    data: Arc<[u8]>,
    modified: SystemTime,
}

/// An in-memory filesystem with settable modification times.
///
/// Paths are normalised lexically: relative paths are rooted at `/`, and
/// `.` and `..` are resolved.
///
/// # Example
///
/// ```rust,ignore
/// let fs = Arc::new(MemoryFileSystem::new());
/// fs.insert("/textures/grass.png", include_bytes!("grass.png").to_vec());
/// let registry = ResourceRegistry::with_file_system(RegistryConfig::default(), fs.clone())?;
/// ```
#[derive(Default)]
pub struct MemoryFileSystem {
    files: RwLock<HashMap<PathBuf, MemoryFile>>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a file, stamping it with the current time.
    pub fn insert(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) {
        self.insert_with_mtime(path, data, SystemTime::now());
    }

    /// Writes a file with an explicit modification time.
    pub fn insert_with_mtime(
        &self,
        path: impl AsRef<Path>,
        data: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) {
        let data: Vec<u8> = data.into();
        let file = MemoryFile {
            data: Arc::from(data),
            modified,
        };
        self.files.write().insert(normalize(path.as_ref()), file);
    }

    /// Overwrites a file's modification time.
    ///
    /// # Returns
    ///
    /// `false` if the file does not exist.
    pub fn set_modified(&self, path: impl AsRef<Path>, modified: SystemTime) -> bool {
        match self.files.write().get_mut(&normalize(path.as_ref())) {
            Some(file) => {
                file.modified = modified;
                true
            }
            None => false,
        }
    }

    /// Replaces a file's content and moves its modification time forward by `by`.
    ///
    /// # Returns
    ///
    /// `false` if the file does not exist.
    pub fn update(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>, by: Duration) -> bool {
        let data: Vec<u8> = data.into();
        match self.files.write().get_mut(&normalize(path.as_ref())) {
            Some(file) => {
                file.data = Arc::from(data);
                file.modified += by;
                true
            }
            None => false,
        }
    }

    /// Deletes a file.
    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        self.files.write().remove(&normalize(path.as_ref())).is_some()
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Returns `true` if there are no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    fn file(&self, path: &Path) -> io::Result<MemoryFile> {
        self.files
            .read()
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}

impl FileSystem for MemoryFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        Ok(self.file(path)?.data.to_vec())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(&normalize(path))
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        Ok(self.file(path)?.modified)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let normalized = normalize(path);
        if self.files.read().contains_key(&normalized) {
            Ok(normalized)
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
        }
    }
}

/// Lexical normalisation rooted at `/`.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    normalized
}

//! Where raw resource bytes come from.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::LoadError;

/// Byte source for resource loads.
///
/// Implementations are called from worker threads and must not assume the
/// calling thread.
pub trait AssetSource: Send + Sync {
    /// Reads the whole file at `path`.
    ///
    /// # Errors
    ///
    /// [`LoadError::NotFound`] if nothing exists at `path`,
    /// [`LoadError::Io`] for any other read failure.
    fn read(&self, path: &str) -> Result<Vec<u8>, LoadError>;

    /// `true` if `path` exists. The default just tries a read.
    fn exists(&self, path: &str) -> bool {
        self.read(path).is_ok()
    }
}

/// Reads assets from a directory on disk.
#[derive(Clone, Debug)]
pub struct FileSystemSource {
    root: PathBuf,
}

impl FileSystemSource {
    /// Creates a source rooted at `root`. Request paths are joined onto it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The asset root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl AssetSource for FileSystemSource {
    fn read(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        std::fs::read(self.resolve(path)).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound {
                path: path.to_owned(),
            },
            _ => LoadError::Io {
                path: path.to_owned(),
                reason: err.to_string(),
            },
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }
}

/// In-memory asset source for tests and generated content.
#[derive(Default)]
pub struct MemorySource {
    files: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl MemorySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files
            .write()
            .insert(path.into(), Arc::from(bytes.into()));
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_file(self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    /// Removes a file. Returns `true` if it existed.
    pub fn remove(&self, path: &str) -> bool {
        self.files.write().remove(path).is_some()
    }

    /// Number of stored files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// `true` if no files are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl AssetSource for MemorySource {
    fn read(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        self.files
            .read()
            .get(path)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| LoadError::NotFound {
                path: path.to_owned(),
            })
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }
}

// src/storage/mod.rs

pub mod fs;

use std::fmt;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;

pub use fs::FsObjectStore;

#[derive(Debug)]
pub enum StorageError {
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io { path, source } => {
                write!(f, "object store I/O error ({}): {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io { source, .. } => Some(source),
        }
    }
}

/// Authoritative blob storage for uploaded documents.
///
/// Abstracted behind a trait so the filesystem backend can be swapped for
/// a remote object store without touching the upload or delete flows.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write a blob at the given path, overwriting any existing one.
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Delete a blob. Deleting a missing blob succeeds.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Check whether a blob exists at the given path.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;
}

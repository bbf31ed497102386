// src/cache.rs

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

/// Cache failures. `NotFound` covers both a missing entry and a zero-length
/// one; either way the authoritative copy lives in the object store and the
/// user must re-upload.
#[derive(Debug)]
pub enum CacheError {
    NotFound {
        document_id: Uuid,
    },
    Io {
        path: PathBuf,
        source: io::Error,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NotFound { document_id } => write!(
                f,
                "document {} not found in local cache; delete and re-upload the document",
                document_id
            ),
            CacheError::Io { path, source } => {
                write!(f, "cache I/O error ({}): {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io { source, .. } => Some(source),
            CacheError::NotFound { .. } => None,
        }
    }
}

/// Local copy of uploaded document bytes, keyed by document id.
///
/// Purely derived state: the pipeline reads from here to avoid re-fetching
/// over the network, and the system stays correct if the cache is empty at
/// any point.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, document_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.pdf", document_id))
    }

    /// Writes an entry, overwriting any previous one for the same key.
    /// Callers on the upload path treat failures as non-fatal.
    pub async fn store(&self, document_id: Uuid, bytes: &[u8]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).await.map_err(|e| CacheError::Io {
            path: self.dir.clone(),
            source: e,
        })?;

        let path = self.entry_path(document_id);
        fs::write(&path, bytes)
            .await
            .map_err(|e| CacheError::Io { path, source: e })
    }

    /// Returns the raw bytes for a document, or `NotFound` when the entry
    /// is absent or empty.
    pub async fn retrieve(&self, document_id: Uuid) -> Result<Vec<u8>, CacheError> {
        let path = self.entry_path(document_id);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound { document_id });
            }
            Err(e) => return Err(CacheError::Io { path, source: e }),
        };

        if bytes.is_empty() {
            return Err(CacheError::NotFound { document_id });
        }

        Ok(bytes)
    }

    /// Removes an entry if present. Never fails the caller; unexpected
    /// errors are logged and swallowed.
    pub async fn evict(&self, document_id: Uuid) {
        let path = self.entry_path(document_id);
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Failed to evict cache entry {}: {}", path.display(), e);
            }
        }
    }
}

// src/storage/fs.rs

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::{ObjectStore, StorageError};

/// Filesystem object store rooted at a configured directory.
///
/// Blob paths are generated internally (`{user_id}/{document_id}.pdf`),
/// never taken from client input.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<(), StorageError> {
        let full_path = self.full_path(path);
        tracing::debug!(
            "Storing blob at {} ({} bytes)",
            full_path.display(),
            bytes.len()
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| StorageError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(&full_path, bytes).await.map_err(|e| StorageError::Io {
            path: full_path,
            source: e,
        })
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let full_path = self.full_path(path);
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io {
                path: full_path,
                source: e,
            }),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let full_path = self.full_path(path);
        fs::try_exists(&full_path).await.map_err(|e| StorageError::Io {
            path: full_path,
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_delete_exists_cycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsObjectStore::new(dir.path());

        store
            .put("u1/doc.pdf", b"bytes", "application/pdf")
            .await
            .expect("put");
        assert!(store.exists("u1/doc.pdf").await.expect("exists"));

        store.delete("u1/doc.pdf").await.expect("delete");
        assert!(!store.exists("u1/doc.pdf").await.expect("exists"));

        // Deleting a missing blob is not an error.
        store.delete("u1/doc.pdf").await.expect("delete");
    }
}

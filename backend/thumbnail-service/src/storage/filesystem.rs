use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::{is_safe_blob_name, BlobStore};
use crate::error::{StorageError, StorageResult};

/// Stores blobs as files inside a single directory
pub struct FileSystemBlobStore {
    directory: PathBuf,
}

impl FileSystemBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            directory: dir.into(),
        }
    }

    #[inline]
    fn format_path(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }
}

#[async_trait]
impl BlobStore for FileSystemBlobStore {
    async fn save(&self, data: Bytes, name: &str) -> StorageResult<()> {
        if !is_safe_blob_name(name) {
            return Err(StorageError::Rejected(format!("invalid blob name: {name:?}")));
        }

        let path = self.format_path(name);
        debug!(path = ?path, size = data.len(), "Storing blob");

        match tokio::fs::write(&path, &data).await {
            Ok(()) => Ok(()),
            Err(ref e) if e.kind() == ErrorKind::NotFound => {
                tokio::fs::create_dir_all(&self.directory).await?;
                tokio::fs::write(&path, data).await?;
                Ok(())
            }
            Err(other) => Err(other.into()),
        }
    }

    fn locate(&self, name: &str) -> String {
        self.format_path(name).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemBlobStore::new(dir.path().join("nested").join("uploads"));

        store
            .save(Bytes::from_static(b"hello"), "greeting.txt")
            .await
            .unwrap();

        let written = tokio::fs::read(store.locate("greeting.txt")).await.unwrap();
        assert_eq!(written, b"hello");
    }

    #[tokio::test]
    async fn test_save_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemBlobStore::new(dir.path());

        let result = store.save(Bytes::from_static(b"x"), "../escape.png").await;
        assert!(matches!(result, Err(StorageError::Rejected(_))));
    }
}

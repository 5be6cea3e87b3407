//! Blob storage for original uploads and generated thumbnails
//!
//! Blobs are addressed by name. The pipeline only ever writes; reading the
//! source of a thumbnail job goes through the path returned by `locate`.

mod filesystem;

pub use filesystem::FileSystemBlobStore;

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Persist `data` under `name`, replacing any previous blob with that name
    async fn save(&self, data: Bytes, name: &str) -> StorageResult<()>;

    /// Location a blob saved under `name` can be opened from
    fn locate(&self, name: &str) -> String;
}

/// Whether `name` is a plain file name that cannot escape the store
pub fn is_safe_blob_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_blob_names() {
        assert!(is_safe_blob_name("cat.jpg"));
        assert!(is_safe_blob_name("0b5a1c3e-2d3f-4b6a-9c1d-1e2f3a4b5c6d.png"));
        assert!(!is_safe_blob_name(""));
        assert!(!is_safe_blob_name(".."));
        assert!(!is_safe_blob_name("../etc/passwd"));
        assert!(!is_safe_blob_name("a\\b.png"));
    }
}

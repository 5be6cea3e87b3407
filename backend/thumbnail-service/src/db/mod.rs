//! Metadata store for original and thumbnail image records
//!
//! Originals and thumbnails live in two record kinds. A thumbnail refers to
//! its original through `original_id` (the original's `image_id`), so the two
//! are never correlated by insertion order.

mod image_repo;
mod memory;

pub use image_repo::PgImageRepository;
pub use memory::InMemoryImageRepository;

use crate::error::StorageResult;
use crate::models::{ImageMeta, ImageWithThumbnail};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    /// Insert an original upload record, returning its row id
    async fn insert_original(&self, image_id: Uuid, meta: &ImageMeta) -> StorageResult<i64>;

    /// Insert a thumbnail record, returning its row id
    ///
    /// `original_id` is `None` for jobs published without an image id; such
    /// thumbnails are stored but never joined to an original.
    async fn insert_thumbnail(
        &self,
        original_id: Option<Uuid>,
        meta: &ImageMeta,
    ) -> StorageResult<i64>;

    /// All originals that have a thumbnail
    async fn list_all(&self) -> StorageResult<Vec<ImageWithThumbnail>>;

    /// The original with row id `id`, if it has a thumbnail
    async fn list_by_id(&self, id: i64) -> StorageResult<Vec<ImageWithThumbnail>>;
}

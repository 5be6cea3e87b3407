use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::MetadataStore;
use crate::error::StorageResult;
use crate::models::{ImageMeta, ImageRecord, ImageWithThumbnail};

#[derive(Default)]
struct Tables {
    originals: Vec<(Uuid, ImageRecord)>,
    thumbnails: Vec<(Option<Uuid>, ImageRecord)>,
}

/// Process-local metadata store
///
/// Behaves like the PostgreSQL repository (auto-incrementing ids per record
/// kind, join on `original_id`) and is used by tests and local runs.
#[derive(Default)]
pub struct InMemoryImageRepository {
    tables: RwLock<Tables>,
}

impl InMemoryImageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn originals(&self) -> Vec<ImageRecord> {
        let tables = self.tables.read().await;
        tables.originals.iter().map(|(_, r)| r.clone()).collect()
    }

    pub async fn thumbnails(&self) -> Vec<ImageRecord> {
        let tables = self.tables.read().await;
        tables.thumbnails.iter().map(|(_, r)| r.clone()).collect()
    }

    /// Thumbnails recorded for the original with `image_id`
    pub async fn thumbnails_of(&self, image_id: Uuid) -> Vec<ImageRecord> {
        let tables = self.tables.read().await;
        tables
            .thumbnails
            .iter()
            .filter(|(original, _)| *original == Some(image_id))
            .map(|(_, r)| r.clone())
            .collect()
    }

    fn join(tables: &Tables, filter: impl Fn(&ImageRecord) -> bool) -> Vec<ImageWithThumbnail> {
        let mut joined = Vec::new();
        for (image_id, original) in tables.originals.iter().filter(|(_, r)| filter(r)) {
            for (_, thumb) in tables
                .thumbnails
                .iter()
                .filter(|(original_id, _)| *original_id == Some(*image_id))
            {
                joined.push(ImageWithThumbnail {
                    id: original.id,
                    image_id: *image_id,
                    name: original.name.clone(),
                    image_type: original.image_type.clone(),
                    width: original.width,
                    height: original.height,
                    thumbnail_name: thumb.name.clone(),
                    thumbnail_width: thumb.width,
                    thumbnail_height: thumb.height,
                });
            }
        }
        joined
    }
}

fn record(id: i64, meta: &ImageMeta) -> ImageRecord {
    ImageRecord {
        id,
        name: meta.name.clone(),
        image_type: meta.image_type.clone(),
        width: meta.width,
        height: meta.height,
    }
}

#[async_trait]
impl MetadataStore for InMemoryImageRepository {
    async fn insert_original(&self, image_id: Uuid, meta: &ImageMeta) -> StorageResult<i64> {
        let mut tables = self.tables.write().await;
        let id = tables.originals.len() as i64 + 1;
        tables.originals.push((image_id, record(id, meta)));
        Ok(id)
    }

    async fn insert_thumbnail(
        &self,
        original_id: Option<Uuid>,
        meta: &ImageMeta,
    ) -> StorageResult<i64> {
        let mut tables = self.tables.write().await;
        let id = tables.thumbnails.len() as i64 + 1;
        tables.thumbnails.push((original_id, record(id, meta)));
        Ok(id)
    }

    async fn list_all(&self) -> StorageResult<Vec<ImageWithThumbnail>> {
        let tables = self.tables.read().await;
        Ok(Self::join(&tables, |_| true))
    }

    async fn list_by_id(&self, id: i64) -> StorageResult<Vec<ImageWithThumbnail>> {
        let tables = self.tables.read().await;
        Ok(Self::join(&tables, |r| r.id == id))
    }
}

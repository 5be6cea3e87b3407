use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::MetadataStore;
use crate::error::{AppError, Result};
use crate::models::{collect_image_meta, ImageWithThumbnail, ThumbnailJob, UploadReceipt};
use crate::queue::JobPublisher;
use crate::storage::{is_safe_blob_name, BlobStore};

/// Upload path: store the original, record it, then publish a thumbnail job
pub struct UploadService {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    publisher: Arc<dyn JobPublisher>,
    subject: String,
}

impl UploadService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        publisher: Arc<dyn JobPublisher>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            blobs,
            metadata,
            publisher,
            subject: subject.into(),
        }
    }

    /// Accept an uploaded image
    ///
    /// `size` is the requested thumbnail bounding box; `None` leaves the
    /// choice to the pipeline default. `name` is recorded as given; the blob
    /// itself is stored under `original_blob_name`.
    pub async fn upload_photo(
        &self,
        name: &str,
        data: Bytes,
        size: Option<u32>,
    ) -> Result<UploadReceipt> {
        if !is_safe_blob_name(name) {
            return Err(AppError::BadRequest(format!("invalid file name: {name:?}")));
        }
        if data.is_empty() {
            return Err(AppError::BadRequest("empty upload".to_string()));
        }

        let probe = data.clone();
        let probe_name = name.to_string();
        let meta = tokio::task::spawn_blocking(move || collect_image_meta(&probe, &probe_name))
            .await
            .map_err(|e| AppError::Internal(format!("image probe panicked: {e}")))?
            .map_err(|e| AppError::BadRequest(format!("unsupported image: {e}")))?;

        let image_id = Uuid::new_v4();
        let blob_name = original_blob_name(image_id, name);
        self.blobs.save(data, &blob_name).await?;

        let id = self.metadata.insert_original(image_id, &meta).await?;

        let job = ThumbnailJob::new(self.blobs.locate(&blob_name), size.unwrap_or(0), image_id);
        if let Err(e) = self.publisher.publish(&self.subject, &job).await {
            warn!(image_id = %image_id, path = %job.path, error = %e, "Failed to publish thumbnail job");
            return Err(AppError::QueueError(e.to_string()));
        }

        info!(
            image_id = %image_id,
            name = %meta.name,
            image_type = %meta.image_type,
            width = meta.width,
            height = meta.height,
            "Original stored, thumbnail job published"
        );

        Ok(UploadReceipt { id, image_id, meta })
    }

    pub async fn list_all(&self) -> Result<Vec<ImageWithThumbnail>> {
        Ok(self.metadata.list_all().await?)
    }

    pub async fn list_by_id(&self, id: i64) -> Result<Vec<ImageWithThumbnail>> {
        Ok(self.metadata.list_by_id(id).await?)
    }
}

/// Blob name for an original upload
///
/// Prefixed with the image id, so it can neither collide with another upload
/// of the same name nor with a `<uuid>.png` thumbnail.
pub fn original_blob_name(image_id: Uuid, name: &str) -> String {
    format!("{image_id}-{name}")
}

//! Thumbnail job handler - one queue job per invocation
//!
//! Fetch (already acknowledged), read the original, resize, encode PNG,
//! store under a fresh name and record it. Every failure ends the invocation
//! and is logged; nothing is retried.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::processor::{ThumbnailProcessor, THUMBNAIL_TYPE};
use crate::db::MetadataStore;
use crate::error::JobError;
use crate::metrics::ThumbnailMetrics;
use crate::models::{ImageMeta, ThumbnailJob};
use crate::queue::JobConsumer;
use crate::storage::BlobStore;
use crate::worker::PoolTask;

/// A thumbnail that was stored and recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredThumbnail {
    pub id: i64,
    pub original_id: Option<Uuid>,
    pub meta: ImageMeta,
}

pub struct ThumbnailJobHandler {
    consumer: Arc<dyn JobConsumer>,
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    processor: Arc<ThumbnailProcessor>,
    default_size: u32,
    metrics: Option<ThumbnailMetrics>,
}

impl ThumbnailJobHandler {
    pub fn new(
        consumer: Arc<dyn JobConsumer>,
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        default_size: u32,
    ) -> Self {
        Self {
            consumer,
            blobs,
            metadata,
            processor: Arc::new(ThumbnailProcessor::new()),
            default_size,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ThumbnailMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Process at most one job
    ///
    /// `Ok(None)` means the queue had nothing for this pipeline.
    pub async fn process_next(&self) -> Result<Option<StoredThumbnail>, JobError> {
        let Some(job) = self.consumer.fetch_next().await? else {
            return Ok(None);
        };

        debug!(path = %job.path, size = job.size, image_id = ?job.image_id, "Job received");
        self.process(job).await.map(Some)
    }

    async fn process(&self, job: ThumbnailJob) -> Result<StoredThumbnail, JobError> {
        let original = tokio::fs::read(&job.path)
            .await
            .map_err(|e| JobError::Decode {
                path: job.path.clone(),
                reason: format!("cannot open source: {e}"),
            })?;

        let thumbnail = Arc::clone(&self.processor)
            .generate_async(
                job.path.clone(),
                Bytes::from(original),
                job.bounding_box(self.default_size),
            )
            .await?;

        let name = thumbnail_name();

        self.blobs
            .save(thumbnail.data, &name)
            .await
            .map_err(|e| persistence_error(&job, e))?;

        let meta = ImageMeta {
            name,
            image_type: THUMBNAIL_TYPE.to_string(),
            width: thumbnail.width,
            height: thumbnail.height,
        };

        let id = self
            .metadata
            .insert_thumbnail(job.image_id, &meta)
            .await
            .map_err(|e| persistence_error(&job, e))?;

        info!(
            path = %job.path,
            thumbnail = %meta.name,
            width = meta.width,
            height = meta.height,
            "Thumbnail stored"
        );

        Ok(StoredThumbnail {
            id,
            original_id: job.image_id,
            meta,
        })
    }
}

#[async_trait]
impl PoolTask for ThumbnailJobHandler {
    async fn run(&self) {
        match self.process_next().await {
            Ok(Some(_)) => {
                if let Some(metrics) = &self.metrics {
                    metrics.processed.inc();
                }
            }
            Ok(None) => {
                if let Some(metrics) = &self.metrics {
                    metrics.empty_polls.inc();
                }
            }
            Err(e) => {
                error!(
                    stage = e.stage(),
                    path = e.path().unwrap_or("-"),
                    error = %e,
                    "Thumbnail job failed"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.failed.with_label_values(&[e.stage()]).inc();
                }
            }
        }
    }
}

/// Fresh blob name for a thumbnail
pub fn thumbnail_name() -> String {
    format!("{}.{}", Uuid::new_v4(), THUMBNAIL_TYPE)
}

fn persistence_error(job: &ThumbnailJob, err: impl std::fmt::Display) -> JobError {
    JobError::Persistence {
        path: job.path.clone(),
        reason: err.to_string(),
    }
}

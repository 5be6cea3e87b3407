//! Thumbnail job queue
//!
//! The queue has work-queue semantics: each published job is delivered to
//! exactly one consumer of the group. A job is acknowledged as soon as it is
//! received, before the handler starts working on it. If processing fails
//! afterwards the job is gone; there is no redelivery and no dead-letter path.

mod memory;
mod redis_stream;
pub mod subject;

pub use memory::InMemoryJobQueue;
pub use redis_stream::RedisJobQueue;
pub use subject::SubjectFilter;

use crate::error::JobError;
use crate::models::ThumbnailJob;
use async_trait::async_trait;
use tracing::debug;

/// Pulls the next thumbnail job for this pipeline
///
/// Implementations must be safe to call from every worker concurrently.
#[async_trait]
pub trait JobConsumer: Send + Sync + 'static {
    /// Wait up to the implementation's fetch timeout for one job
    ///
    /// Returns `Ok(None)` when nothing arrived in time. The message has
    /// already been acknowledged when this returns `Ok(Some(_))` or a
    /// malformed-payload error.
    async fn fetch_next(&self) -> Result<Option<ThumbnailJob>, JobError>;
}

/// Publishes thumbnail jobs on the upload path
#[async_trait]
pub trait JobPublisher: Send + Sync + 'static {
    async fn publish(&self, subject: &str, job: &ThumbnailJob) -> Result<(), JobError>;
}

/// Turn an acknowledged delivery into a job
///
/// Deliveries outside `filter` are dropped and reported as "no job".
pub(crate) fn decode_delivery(
    filter: &SubjectFilter,
    subject: &str,
    payload: &[u8],
) -> Result<Option<ThumbnailJob>, JobError> {
    if !filter.matches(subject) {
        debug!(subject = %subject, filter = %filter, "Dropping message outside subject filter");
        return Ok(None);
    }

    let job: ThumbnailJob = serde_json::from_slice(payload)?;
    if job.path.trim().is_empty() {
        return Err(JobError::Queue("job payload has an empty path".to_string()));
    }

    Ok(Some(job))
}

pub(crate) fn encode_job(job: &ThumbnailJob) -> Result<Vec<u8>, JobError> {
    serde_json::to_vec(job).map_err(|e| JobError::Queue(format!("failed to encode job: {e}")))
}

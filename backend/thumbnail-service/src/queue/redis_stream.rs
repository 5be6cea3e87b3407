//! Redis Streams-backed job queue
//!
//! Jobs are stream entries with a `subject` and a JSON `payload` field. All
//! pipeline instances read through one consumer group, so each entry goes to
//! exactly one of them. `XREADGROUP ... BLOCK` provides the bounded wait and
//! the entry is `XACK`ed and `XDEL`ed right after it is read, so the stream
//! only holds jobs nobody has received yet.

use async_trait::async_trait;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info};

use super::{decode_delivery, encode_job, JobConsumer, JobPublisher, SubjectFilter};
use crate::config::QueueConfig;
use crate::error::JobError;
use crate::models::ThumbnailJob;

pub struct RedisJobQueue {
    client: redis::Client,
    stream: String,
    group: String,
    consumer: String,
    filter: SubjectFilter,
    block: Duration,
}

impl RedisJobQueue {
    /// Open the client and make sure the stream and consumer group exist
    pub async fn connect(config: &QueueConfig) -> Result<Self, JobError> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let filter = SubjectFilter::parse(&config.subject_filter)
            .map_err(|e| JobError::Queue(e.to_string()))?;

        let queue = Self {
            client,
            stream: config.stream.clone(),
            group: config.consumer_group.clone(),
            consumer: format!("{}-{}", config.consumer_group, std::process::id()),
            filter,
            block: config.fetch_timeout,
        };
        queue.ensure_consumer_group().await?;

        info!(
            stream = %queue.stream,
            group = %queue.group,
            consumer = %queue.consumer,
            filter = %queue.filter,
            "Job queue initialized"
        );

        Ok(queue)
    }

    async fn ensure_consumer_group(&self) -> Result<(), JobError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let created: redis::RedisResult<()> = conn
            .xgroup_create_mkstream(&self.stream, &self.group, "0")
            .await;

        match created {
            Ok(()) => {
                info!(stream = %self.stream, group = %self.group, "Consumer group created");
                Ok(())
            }
            Err(e) if is_busy_group_error(&e) => {
                debug!(stream = %self.stream, group = %self.group, "Consumer group already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// `BLOCK 0` waits forever, so the read timeout never drops below 1ms.
fn block_millis(timeout: Duration) -> usize {
    timeout.as_millis().clamp(1, usize::MAX as u128) as usize
}

fn is_busy_group_error(error: &redis::RedisError) -> bool {
    error.to_string().to_ascii_uppercase().contains("BUSYGROUP")
}

fn first_entry(reply: Option<StreamReadReply>) -> Option<StreamId> {
    reply?.keys.into_iter().next()?.ids.into_iter().next()
}

#[async_trait]
impl JobConsumer for RedisJobQueue {
    async fn fetch_next(&self) -> Result<Option<ThumbnailJob>, JobError> {
        // A blocking read holds its connection, so every fetch gets its own.
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(1)
            .block(block_millis(self.block));

        let reply: Option<StreamReadReply> = conn
            .xread_options(&[&self.stream], &[">"], &options)
            .await?;

        let Some(entry) = first_entry(reply) else {
            return Ok(None);
        };

        let _: i64 = conn.xack(&self.stream, &self.group, &[&entry.id]).await?;
        let _: i64 = conn.xdel(&self.stream, &[&entry.id]).await?;
        debug!(entry_id = %entry.id, "Job acknowledged and removed from stream");

        let subject: String = entry.get("subject").unwrap_or_default();
        let payload: Vec<u8> = entry.get("payload").ok_or_else(|| {
            JobError::Queue(format!("stream entry {} has no payload", entry.id))
        })?;

        decode_delivery(&self.filter, &subject, &payload)
    }
}

#[async_trait]
impl JobPublisher for RedisJobQueue {
    async fn publish(&self, subject: &str, job: &ThumbnailJob) -> Result<(), JobError> {
        let payload = encode_job(job)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let entry_id: String = conn
            .xadd(
                &self.stream,
                "*",
                &[("subject", subject.as_bytes()), ("payload", payload.as_slice())],
            )
            .await?;

        debug!(entry_id = %entry_id, subject = %subject, path = %job.path, "Job published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn queue_config(stream: &str) -> QueueConfig {
        QueueConfig {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream: stream.to_string(),
            consumer_group: "media_service_test".to_string(),
            publish_subject: "media.picture".to_string(),
            subject_filter: "media.>".to_string(),
            fetch_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_busy_group_detection() {
        let err = redis::RedisError::from((
            redis::ErrorKind::ExtensionError,
            "BUSYGROUP",
            "Consumer Group name already exists".to_string(),
        ));
        assert!(is_busy_group_error(&err));
    }

    #[test]
    fn test_block_time_is_never_zero() {
        assert_eq!(block_millis(Duration::ZERO), 1);
        assert_eq!(block_millis(Duration::from_micros(300)), 1);
        assert_eq!(block_millis(Duration::from_millis(1000)), 1000);
    }

    #[ignore = "Requires Redis"]
    #[tokio::test]
    async fn test_job_is_not_redelivered_after_ack() {
        let stream = format!("thumbnail-test-{}", Uuid::new_v4());
        let queue = RedisJobQueue::connect(&queue_config(&stream)).await.unwrap();

        let job = ThumbnailJob::new("uploads/cat.jpg", 100, Uuid::new_v4());
        queue.publish("media.picture", &job).await.unwrap();

        assert_eq!(queue.fetch_next().await.unwrap(), Some(job));

        let mut conn = queue.client.get_multiplexed_async_connection().await.unwrap();
        let remaining: usize = conn.xlen(&stream).await.unwrap();
        assert_eq!(remaining, 0);

        assert!(queue.fetch_next().await.unwrap().is_none());

        // A second pipeline instance in the same group sees nothing either.
        let other = RedisJobQueue::connect(&queue_config(&stream)).await.unwrap();
        assert!(other.fetch_next().await.unwrap().is_none());
    }
}

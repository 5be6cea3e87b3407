use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use super::{decode_delivery, encode_job, JobConsumer, JobPublisher, SubjectFilter};
use crate::error::JobError;
use crate::models::ThumbnailJob;

struct Delivery {
    subject: String,
    payload: Vec<u8>,
}

/// Process-local work queue
///
/// Each message is handed to exactly one `fetch_next` caller and removed
/// from the queue on receipt, mirroring ack-on-receipt of the broker queue.
pub struct InMemoryJobQueue {
    messages: Mutex<VecDeque<Delivery>>,
    available: Notify,
    filter: SubjectFilter,
    fetch_timeout: Duration,
    acknowledged: AtomicU64,
}

impl InMemoryJobQueue {
    pub fn new(filter: SubjectFilter, fetch_timeout: Duration) -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            filter,
            fetch_timeout,
            acknowledged: AtomicU64::new(0),
        }
    }

    /// Enqueue a raw payload, bypassing job encoding
    pub async fn publish_raw(&self, subject: &str, payload: impl Into<Vec<u8>>) {
        self.messages.lock().await.push_back(Delivery {
            subject: subject.to_string(),
            payload: payload.into(),
        });
        self.available.notify_one();
    }

    /// Messages not yet delivered to any consumer
    pub async fn pending(&self) -> usize {
        self.messages.lock().await.len()
    }

    /// Messages delivered (and therefore acknowledged) so far
    pub fn acknowledged(&self) -> u64 {
        self.acknowledged.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobConsumer for InMemoryJobQueue {
    async fn fetch_next(&self) -> Result<Option<ThumbnailJob>, JobError> {
        let deadline = Instant::now() + self.fetch_timeout;

        loop {
            let delivery = self.messages.lock().await.pop_front();
            if let Some(delivery) = delivery {
                self.acknowledged.fetch_add(1, Ordering::SeqCst);
                return decode_delivery(&self.filter, &delivery.subject, &delivery.payload);
            }

            if tokio::time::timeout_at(deadline, self.available.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }
}

#[async_trait]
impl JobPublisher for InMemoryJobQueue {
    async fn publish(&self, subject: &str, job: &ThumbnailJob) -> Result<(), JobError> {
        let payload = encode_job(job)?;
        self.publish_raw(subject, payload).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;

    fn queue(timeout_ms: u64) -> InMemoryJobQueue {
        InMemoryJobQueue::new(
            SubjectFilter::parse("media.>").unwrap(),
            Duration::from_millis(timeout_ms),
        )
    }

    #[tokio::test]
    async fn test_fetch_times_out_with_no_job() {
        let queue = queue(20);
        let started = Instant::now();
        assert!(queue.fetch_next().await.unwrap().is_none());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_each_job_is_delivered_once() {
        let queue = queue(20);
        let job = ThumbnailJob::new("uploads/cat.jpg", 100, Uuid::new_v4());
        queue.publish("media.picture", &job).await.unwrap();

        assert_eq!(queue.fetch_next().await.unwrap(), Some(job));
        assert!(queue.fetch_next().await.unwrap().is_none());
        assert_eq!(queue.acknowledged(), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_consumed() {
        let queue = queue(20);
        queue.publish_raw("media.picture", "{oops").await;

        assert!(queue.fetch_next().await.is_err());
        assert_eq!(queue.pending().await, 0);
        assert!(queue.fetch_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_waiting_consumer_is_woken_by_publish() {
        let queue = Arc::new(queue(2_000));
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.fetch_next().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let job = ThumbnailJob::new("uploads/late.png", 50, Uuid::new_v4());
        queue.publish("media.picture", &job).await.unwrap();

        let fetched = consumer.await.unwrap().unwrap();
        assert_eq!(fetched, Some(job));
    }
}

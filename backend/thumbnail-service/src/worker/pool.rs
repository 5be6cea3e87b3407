use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::worker::SharedState;
use super::{PoolTask, Worker, WorkerState};
use crate::config::WorkerConfig;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub size: usize,
    pub interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 5,
            interval: Duration::from_millis(200),
        }
    }
}

impl From<&WorkerConfig> for PoolConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            size: config.pool_size,
            interval: config.poll_interval,
        }
    }
}

/// Owns a fixed set of workers sharing one task
pub struct WorkerPool {
    cancel: CancellationToken,
    workers: Mutex<Vec<Worker>>,
    states: Vec<SharedState>,
}

impl WorkerPool {
    /// Start `config.size` workers, each on its own interval
    ///
    /// A size of zero is raised to one.
    pub fn start(config: PoolConfig, task: Arc<dyn PoolTask>) -> Self {
        let size = if config.size == 0 {
            warn!("Worker pool size 0 requested, starting 1 worker");
            1
        } else {
            config.size
        };

        let cancel = CancellationToken::new();
        let workers: Vec<Worker> = (0..size)
            .map(|id| Worker::start(id, Arc::clone(&task), config.interval, cancel.child_token()))
            .collect();
        let states = workers.iter().map(Worker::state_handle).collect();

        info!(
            workers = size,
            interval_ms = config.interval.as_millis() as u64,
            "Worker pool started"
        );

        Self {
            cancel,
            workers: Mutex::new(workers),
            states,
        }
    }

    /// Number of workers that have not yet stopped
    pub fn active_workers(&self) -> usize {
        self.states
            .iter()
            .filter(|state| state.get() != WorkerState::Stopped)
            .count()
    }

    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.states.iter().map(SharedState::get).collect()
    }

    /// Stop every worker and wait until all of them have stopped
    ///
    /// Running tasks finish first. Calling this again after it returned does
    /// nothing; a concurrent call waits for the first one.
    pub async fn shutdown(&self) {
        let mut workers = self.workers.lock().await;

        if self.cancel.is_cancelled() && self.active_workers() == 0 {
            return;
        }

        info!(workers = workers.len(), "Shutting down worker pool");
        self.cancel.cancel();

        join_all(workers.iter_mut().map(|worker| worker.join())).await;

        info!("Worker pool stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Concurrency {
        runs: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl PoolTask for Concurrency {
        async fn run(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(300)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config(size: usize) -> PoolConfig {
        PoolConfig {
            size,
            interval: Duration::from_millis(50),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_starts_requested_workers() {
        let pool = WorkerPool::start(config(5), Arc::new(Concurrency::default()));
        assert_eq!(pool.active_workers(), 5);
        assert_eq!(pool.worker_states().len(), 5);

        pool.shutdown().await;
        assert_eq!(pool.active_workers(), 0);
        assert!(pool
            .worker_states()
            .iter()
            .all(|state| *state == WorkerState::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_size_is_raised_to_one() {
        let pool = WorkerPool::start(config(0), Arc::new(Concurrency::default()));
        assert_eq!(pool.active_workers(), 1);
        pool.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_never_exceeds_pool_size() {
        let task = Arc::new(Concurrency::default());
        let pool = WorkerPool::start(config(3), task.clone());

        tokio::time::sleep(Duration::from_secs(2)).await;
        pool.shutdown().await;

        assert_eq!(task.max_in_flight.load(Ordering::SeqCst), 3);
        assert_eq!(task.in_flight.load(Ordering::SeqCst), 0);
        assert!(task.runs.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_is_idempotent() {
        let pool = Arc::new(WorkerPool::start(config(2), Arc::new(Concurrency::default())));
        tokio::time::sleep(Duration::from_millis(120)).await;

        let first = tokio::spawn({
            let pool = Arc::clone(&pool);
            async move { pool.shutdown().await }
        });
        let second = tokio::spawn({
            let pool = Arc::clone(&pool);
            async move { pool.shutdown().await }
        });

        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(pool.active_workers(), 0);

        pool.shutdown().await;
        assert_eq!(pool.active_workers(), 0);
    }
}

//! Fixed-size pool of timer-driven polling workers
//!
//! Every worker runs the same shared task on its own interval. Workers are
//! not handed work; they compete for it inside the task (for the thumbnail
//! pipeline, by pulling from the shared job queue).

mod pool;
#[allow(clippy::module_inception)]
mod worker;

pub use pool::{PoolConfig, WorkerPool};
pub use worker::{Worker, WorkerState};

use async_trait::async_trait;

/// Unit of work a worker runs on every tick
///
/// `run` must handle its own errors; nothing it does can stop the worker.
#[async_trait]
pub trait PoolTask: Send + Sync + 'static {
    async fn run(&self);
}

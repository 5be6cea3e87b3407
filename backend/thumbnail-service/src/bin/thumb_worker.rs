//! Thumbnail Worker - runs only the worker pool
//!
//! Pulls thumbnail jobs from the shared Redis stream and writes thumbnails
//! next to the originals. Several of these can run against one stream; the
//! consumer group hands each job to exactly one of them.
//!
//! Reads the same environment as the HTTP service (see `Config::from_env`).

use anyhow::Context;
use std::sync::Arc;
use thumbnail_service::db::PgImageRepository;
use thumbnail_service::metrics::ThumbnailMetrics;
use thumbnail_service::queue::RedisJobQueue;
use thumbnail_service::services::ThumbnailJobHandler;
use thumbnail_service::storage::FileSystemBlobStore;
use thumbnail_service::telemetry;
use thumbnail_service::worker::{PoolConfig, WorkerPool};
use thumbnail_service::Config;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    telemetry::init_tracing(&config.logging);

    info!(
        workers = config.worker.pool_size,
        stream = %config.queue.stream,
        group = %config.queue.consumer_group,
        "Starting Thumbnail Worker"
    );

    let metadata = PgImageRepository::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let queue = RedisJobQueue::connect(&config.queue)
        .await
        .context("Failed to initialize job queue")?;
    let blobs = FileSystemBlobStore::new(&config.storage.upload_dir);

    let handler = ThumbnailJobHandler::new(
        Arc::new(queue),
        Arc::new(blobs),
        Arc::new(metadata),
        config.worker.default_thumb_size,
    )
    .with_metrics(ThumbnailMetrics::new("thumb-worker"));

    let pool = WorkerPool::start(PoolConfig::from(&config.worker), Arc::new(handler));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl+c")?;
    info!("Shutdown signal received");

    pool.shutdown().await;

    info!("Thumbnail Worker stopped");
    Ok(())
}

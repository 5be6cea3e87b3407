/// Thumbnail Service - HTTP Server and thumbnail worker pool
///
/// Serves the upload and listing API and runs the worker pool that turns
/// queued jobs into thumbnails, in one process.
use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use thumbnail_service::db::PgImageRepository;
use thumbnail_service::handlers;
use thumbnail_service::metrics::ThumbnailMetrics;
use thumbnail_service::queue::RedisJobQueue;
use thumbnail_service::services::{ThumbnailJobHandler, UploadService};
use thumbnail_service::storage::FileSystemBlobStore;
use thumbnail_service::telemetry;
use thumbnail_service::worker::{PoolConfig, WorkerPool};
use thumbnail_service::Config;
use tracing::{error, info};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    telemetry::init_tracing(&config.logging);

    let http_bind_address = format!("{}:{}", config.app.host, config.app.port);
    info!(address = %http_bind_address, "Thumbnail Service starting");

    let metadata = Arc::new(
        PgImageRepository::connect(&config.database)
            .await
            .context("Failed to connect to database")?,
    );
    let queue = Arc::new(
        RedisJobQueue::connect(&config.queue)
            .await
            .context("Failed to initialize job queue")?,
    );
    let blobs = Arc::new(FileSystemBlobStore::new(&config.storage.upload_dir));

    let handler = ThumbnailJobHandler::new(
        queue.clone(),
        blobs.clone(),
        metadata.clone(),
        config.worker.default_thumb_size,
    )
    .with_metrics(ThumbnailMetrics::new("thumbnail-service"));
    let pool = WorkerPool::start(PoolConfig::from(&config.worker), Arc::new(handler));

    let upload_service = Arc::new(UploadService::new(
        blobs,
        metadata,
        queue,
        config.queue.publish_subject.clone(),
    ));
    let max_upload_bytes = config.app.max_upload_bytes;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(upload_service.clone()))
            .app_data(web::PayloadConfig::new(max_upload_bytes))
            .wrap(actix_middleware::Logger::default())
            .configure(handlers::configure)
    })
    .disable_signals()
    .bind(&http_bind_address)
    .with_context(|| format!("Failed to bind {http_bind_address}"))?
    .run();

    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl+c")?;
    info!("Shutdown signal received");

    server_handle.stop(true).await;
    match server_task.await {
        Ok(Ok(())) => info!("HTTP server stopped"),
        Ok(Err(e)) => error!(error = %e, "HTTP server error"),
        Err(e) => error!(error = %e, "HTTP server task failed"),
    }

    pool.shutdown().await;

    info!("Thumbnail Service stopped");
    Ok(())
}

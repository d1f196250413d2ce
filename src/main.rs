// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use fetchrs::config::settings::Settings;
use fetchrs::fetch::client::FetchClient;
use fetchrs::infrastructure::database::connection;
use fetchrs::infrastructure::observability::metrics::init_metrics;
use fetchrs::infrastructure::storage::create_store;
use fetchrs::queue::listener::Listener;
use fetchrs::queue::redis_queue::RedisQueue;
use fetchrs::reconcile::service::ReconcileService;
use fetchrs::utils::telemetry;
use fetchrs::workers::download_worker::DownloadWorker;
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

/// 主函数
///
/// 监听进程入口点，负责初始化所有长生命周期资源并启动监听循环
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting fetchrs...");

    // Initialize Prometheus Metrics
    init_metrics();

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Connect to database
    let db = Arc::new(connection::create_pool(&settings.database).await?);
    info!("Database connection established");

    // Run database migrations
    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. Initialize storage backend
    let store = create_store(&settings.storage)?;
    info!("Store backend initialized: {}", settings.storage.storage_type);

    // 5. Initialize components
    let fetch_client = FetchClient::new(&settings.http, store)?;
    let reconcile = Arc::new(ReconcileService::new(db));
    let queue = Arc::new(RedisQueue::new(&settings.redis.url)?);
    info!("Redis queue initialized");

    // 6. Start the listener loop
    let handler = DownloadWorker::new(
        fetch_client,
        reconcile,
        settings.listener.download_path.clone(),
    );
    let listener = Listener::new(
        queue,
        settings.listener.in_queue.clone(),
        settings.listener.out_queue.clone(),
        Duration::from_secs(settings.listener.poll_interval_secs),
        Duration::from_secs(settings.listener.dequeue_timeout_secs),
        handler,
    );

    let handle = tokio::spawn(async move { listener.listen().await });
    info!(
        "Listener running on queue {} -> {:?}",
        settings.listener.in_queue, settings.listener.out_queue
    );

    // 7. Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }

    handle.abort();
    info!("Listener shut down");
    Ok(())
}

//! seckill-server - flash-sale purchase API and order worker

use seckill_server::common::{cleanup_old_logs, init_logger_with_file};
use seckill_server::seckill::OrderWorker;
use seckill_server::{AppState, BackgroundTasks, Config, TaskKind, api};
use std::path::PathBuf;
use std::time::Duration;

const LOG_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    let config = Config::from_env();
    init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!(
        environment = %config.environment,
        backend = ?config.store_backend,
        "Starting seckill-server"
    );

    let state = AppState::new(config.clone()).await?;
    let mut tasks = BackgroundTasks::new();

    // Hot shops first, before traffic arrives
    if !config.warmup_shop_ids.is_empty() {
        let shops = state.shops.clone();
        let ids = config.warmup_shop_ids.clone();
        tasks.spawn("shop_cache_warmup", TaskKind::Warmup, async move {
            shops.warm(&ids).await;
        });
    }

    let worker = OrderWorker::new(
        state.queue.clone(),
        state.materializer.clone(),
        tasks.shutdown_token(),
    );
    tasks.spawn("order_worker", TaskKind::Worker, worker.run());

    if let Some(dir) = config.log_dir.clone() {
        let token = tasks.shutdown_token();
        tasks.spawn("log_cleanup", TaskKind::Periodic, async move {
            let dir = PathBuf::from(dir);
            let mut interval = tokio::time::interval(LOG_CLEANUP_INTERVAL);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = cleanup_old_logs(&dir) {
                            tracing::warn!(error = %e, "Log cleanup failed");
                        }
                    }
                }
            }
        });
    }
    tasks.log_summary();

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("seckill-server HTTP listening on {addr}");

    axum::serve(listener, api::build_app(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped, draining background work");
    tasks.shutdown(config.shutdown_timeout).await;
    state.rebuild_pool.close();
    if tokio::time::timeout(config.shutdown_timeout, state.rebuild_pool.wait())
        .await
        .is_err()
    {
        tracing::warn!(in_flight = state.rebuild_pool.in_flight(), "Cache rebuilds still running at exit");
    }

    tracing::info!("seckill-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

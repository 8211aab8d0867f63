//! reservation-server: restaurant table booking service
//!
//! Long-running service that:
//! - Answers availability queries and books tables (first fit by capacity)
//! - Rejects double bookings under row locks
//! - Sweeps table status around reservation windows

use std::time::Duration;

use reservation_server::scheduler::TableSweeper;
use reservation_server::tasks::{BackgroundTasks, TaskKind};
use reservation_server::{AppState, BoxError, Config, api, logger};

const TASK_HEALTH_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    logger::init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!(
        environment = %config.environment,
        lookahead_minutes = config.rules.lookahead_minutes,
        "Starting reservation-server"
    );

    let state = AppState::new(&config).await?;

    // Background tasks
    let mut tasks = BackgroundTasks::new();
    let sweeper = TableSweeper::new(
        state.clone(),
        tasks.shutdown_token(),
        config.sweep_interval_secs,
    );
    tasks.spawn("table_sweeper", TaskKind::Periodic, sweeper.run());
    tasks.log_summary();

    // HTTP server
    let app = api::build_app(state);
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("reservation-server HTTP listening on {addr}");

    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    let mut health = tokio::time::interval(TASK_HEALTH_INTERVAL);
    health.tick().await;
    loop {
        tokio::select! {
            res = &mut server => {
                res??;
                break;
            }
            _ = health.tick() => {
                let dead = tasks.check_health();
                if dead > 0 {
                    tracing::warn!(dead, total = tasks.len(), "Background tasks not running");
                }
            }
        }
    }

    tracing::info!("HTTP server stopped");
    tasks.shutdown().await;

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
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
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

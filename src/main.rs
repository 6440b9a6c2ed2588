use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use kpd_bot::bot::Bot;
use kpd_bot::channels::{Channel, TelegramChannel};
use kpd_bot::config::Config;
use kpd_bot::controller::Controller;
use kpd_bot::session::SessionStore;
use kpd_bot::store;
use kpd_bot::supervisor::supervise;
use kpd_bot::web::{self, StatusState};

/// Log to stderr, and to a daily-rolling file when `log_dir` is set.
/// The returned guard flushes the file writer on drop.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "kpd-bot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(file)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let config = Config::from_env();
    let _log_guard = init_tracing(config.as_ref().ok().and_then(|c| c.log_dir.as_deref()));
    let config = config.context("Failed to load configuration")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting productivity bot");

    // Storage failures are fatal: nothing else starts.
    let store = store::open(&config.storage)
        .await
        .context("Storage unavailable")?;
    store.ping().await.context("Storage unavailable")?;
    tracing::info!(backend = store.backend_name(), "Storage ready");

    // ── Status server ────────────────────────────────────────────────
    let listener = TcpListener::bind(("0.0.0.0", config.server.port))
        .await
        .with_context(|| format!("Failed to bind status port {}", config.server.port))?;
    let status = StatusState::new(Arc::clone(&store), config.server.bot_username.clone());
    tokio::spawn(async move {
        if let Err(e) = web::serve(listener, status).await {
            tracing::error!(error = %e, "Status server stopped");
        }
    });

    // ── Telegram bot ─────────────────────────────────────────────────
    let channel = Arc::new(TelegramChannel::from_config(&config.bot));
    if let Err(e) = channel.health_check().await {
        tracing::warn!(error = %e, "Telegram health check failed; polling anyway");
    }

    let controller = Arc::new(Controller::new(Arc::new(SessionStore::new()), store));
    let bot = Bot::new(controller, channel);

    tokio::select! {
        biased;
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received, shutting down...");
        }
        result = supervise(bot.channel_name(), &config.retry, || bot.run()) => {
            result.context("Telegram transport failed")?;
        }
    }

    if let Err(e) = bot.shutdown().await {
        tracing::warn!(error = %e, "Channel shutdown failed");
    }
    Ok(())
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dedup_bot::config::{BotConfig, UpdateMode};
use dedup_bot::handler::{MessageHandler, Notifier};
use dedup_bot::polling::Poller;
use dedup_bot::router::build_app_router;
use dedup_bot::state::AppState;
use dedup_bot::{background, webhook};
use dedup_telegram::BotApi;

/// How long background tasks get to finish after shutdown starts.
const TASK_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dedup_bot=debug,dedup_db=info,tower_http=info".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %format!("{e:#}"), "Failed to start bot");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // --- Configuration ---
    let config = BotConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        mode = config.mode.as_str(),
        backend = %config.database.backend(),
        "Loaded bot configuration"
    );

    // --- Database ---
    let pool = dedup_db::create_pool(&config.database)
        .await
        .context("Failed to connect to database")?;
    dedup_db::run_migrations(&pool)
        .await
        .context("Failed to initialize database schema")?;

    // --- Telegram ---
    let api = BotApi::with_base_url(config.token.clone(), config.telegram_api_url.clone())
        .context("Failed to build Telegram client")?;
    match api.get_me().await {
        Ok(me) => tracing::info!(bot_id = me.id, username = ?me.username, "Connected to Telegram"),
        Err(e) => tracing::warn!(error = %e, "Telegram connectivity check failed"),
    }

    let notifier: Arc<dyn Notifier> = Arc::new(api.clone());
    let handler = Arc::new(MessageHandler::new(
        pool.clone(),
        notifier,
        config.detection.clone(),
    ));
    tracing::info!("Bot initialized successfully");

    // --- Shutdown coordination ---
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    // --- Retention job ---
    let retention_handle = tokio::spawn(background::retention::run(
        pool.clone(),
        config.detection.retention_days,
        Duration::from_secs(config.retention_interval_secs),
        cancel.clone(),
    ));

    // --- HTTP server ---
    let config = Arc::new(config);
    let state = AppState {
        pool: pool.clone(),
        config: Arc::clone(&config),
        handler: Arc::clone(&handler),
    };
    let app = build_app_router(state);

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .with_context(|| format!("Invalid HOST address '{}'", config.server.host))?,
        config.server.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!(%addr, "Starting server");

    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_cancel.cancelled_owned())
            .await
    });

    // --- Update source ---
    let outcome = match &config.mode {
        UpdateMode::Webhook { .. } => match webhook::register(&api, &config).await {
            Ok(()) => {
                tracing::info!("Starting bot with webhook");
                cancel.cancelled().await;
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to register webhook")),
        },
        UpdateMode::Polling => {
            Poller::new(api.clone(), Arc::clone(&handler), config.poll_timeout_secs)
                .run(cancel.clone())
                .await
                .context("Polling stopped")
        }
    };

    // --- Graceful shutdown ---
    tracing::info!("Shutting down gracefully");
    cancel.cancel();

    match tokio::time::timeout(TASK_DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server error"),
        Ok(Err(e)) => tracing::error!(error = %e, "Server task panicked"),
        Err(_) => tracing::warn!("Server did not stop in time"),
        Ok(Ok(Ok(()))) => {}
    }
    background::drain("retention", retention_handle, TASK_DRAIN_TIMEOUT).await;

    pool.close().await;
    tracing::info!("Graceful shutdown complete");

    outcome
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the bot shuts
/// down cleanly whether stopped interactively or by a container runtime.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

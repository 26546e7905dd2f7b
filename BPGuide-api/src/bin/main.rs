use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use bp_guide_api::api::handlers::health::initialize_server_start_time;
use bp_guide_api::{create_app, AppState};
use bp_guide_data::database::{DatabaseConfig, DatabasePool};
use bp_guide_data::repository::{InMemoryRepository, ReadingStore, SqliteRepository};
use bp_guide_domain::config::{parse_env, AdviceConfig, MailConfig};
use bp_guide_domain::services::advice::{AdviceCache, OpenAiClient};
use bp_guide_domain::services::notifier::{HttpMailNotifier, LogNotifier, Notifier};

/// How often expired advice is swept from the cache
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// The main entry point for the BPGuide API server
///
/// This function:
/// 1. Initializes environment variables from .env file
/// 2. Sets up tracing for logging
/// 3. Opens the SQLite store, falling back to memory if it cannot
/// 4. Builds the advice pipeline and the notifier
/// 5. Starts the cache sweep and the Axum web application
/// 6. Handles graceful shutdown
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    if dotenv().is_err() {
        eprintln!("Warning: .env file not found or couldn't be read. Using environment variables.");
    }

    // Initialize tracing for structured logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_ansi(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stdout),
        )
        .with(env_filter)
        .init();

    info!("🚀 Starting BPGuide API server");

    let store = open_store();
    let advice_config = AdviceConfig::from_env().context("invalid advice configuration")?;
    let mail_config = MailConfig::from_env().context("invalid mail configuration")?;

    if advice_config.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; advice requests will return fallback text");
    }
    let client = OpenAiClient::new(
        advice_config.api_key.clone(),
        advice_config.model.clone(),
        advice_config.base_url.clone(),
        advice_config.inference_timeout,
    )
    .context("failed to build inference client")?;
    info!("Inference model: {}", client.model());

    let notifier = build_notifier(&mail_config)?;
    let state = AppState::new(store, Arc::new(client), notifier, &advice_config);

    info!(
        "Advice cache ttl={:?} capacity={}, inference spacing {:?}",
        state.advice.cache().ttl(),
        advice_config.cache_capacity,
        state.advice.limiter().min_interval()
    );
    spawn_cache_sweep(state.advice.cache().clone());
    initialize_server_start_time();

    let app = create_app(state);

    let port: u16 = parse_env("PORT", 3000).context("PORT must be a number")?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    // Serve the application with graceful shutdown support
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Open the SQLite store, or an in-memory one when the database is unusable
fn open_store() -> Arc<dyn ReadingStore> {
    let opened = DatabaseConfig::from_env().and_then(|config| DatabasePool::connect(&config));
    match opened {
        Ok(pool) => {
            info!("Using {}", pool.connection_info());
            Arc::new(SqliteRepository::new(pool))
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            warn!("Falling back to in-memory storage; data will not survive a restart");
            Arc::new(InMemoryRepository::new())
        }
    }
}

fn build_notifier(config: &MailConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match &config.relay_url {
        Some(url) => {
            info!("Reports will be sent through the mail relay at {}", url);
            let notifier = HttpMailNotifier::new(
                url.clone(),
                config.relay_token.clone(),
                config.from.clone(),
                config.timeout,
            )
            .context("failed to build mail notifier")?;
            Ok(Arc::new(notifier))
        }
        None => {
            warn!("MAIL_RELAY_URL is not set; reports will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Periodically drop expired advice so the cache does not hold dead entries
fn spawn_cache_sweep(cache: Arc<AdviceCache>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = cache.purge_expired();
            debug!("Advice cache sweep removed {} entries, {} remain", removed, cache.len());
        }
    });
}

/// Sets up a signal handler for graceful shutdown
///
/// Waits for either CTRL+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutting down server...");
}

//! Signal Engine Binary
//!
//! Starts the signal-to-order execution engine.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin signal-engine
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `ANGELONE_API_KEY`: SmartAPI application key
//!
//! ## Optional
//! - `HTTP_PORT`: HTTP server port (default: 8080)
//! - `DATABASE_PATH`: SQLite file path (default: signal-engine.db)
//! - `TOKEN_SERVICE_URL`: token service base URL (default: <http://localhost:8081>)
//! - `ANGELONE_BASE_URL`: broker API host override
//! - `ANGELONE_LOCAL_IP` / `ANGELONE_PUBLIC_IP` / `ANGELONE_MAC`: request headers
//! - `DISPATCH_WORKERS`: dispatch queue concurrency (default: 4)
//! - `RETRY_ATTEMPTS`: attempts per broker task (default: 2)
//! - `RETRY_DELAY_MS`: delay between attempts (default: 1000)
//! - `WINDOW_START` / `WINDOW_END`: intake window, HH:MM exchange time
//!   (default: 09:15 / 14:30)
//! - `RUST_LOG`: log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::NaiveTime;
use signal_engine::application::use_cases::{
    DispatchSignalUseCase, PostbackPipeline, ReconcileUseCase,
};
use signal_engine::domain::signal::TradingWindow;
use signal_engine::infrastructure::broker::angelone::{AngelOneBrokerAdapter, AngelOneConfig};
use signal_engine::infrastructure::http::{AppState, create_router};
use signal_engine::infrastructure::persistence::SqliteStore;
use signal_engine::infrastructure::queue::{QueueConfig, RetryPolicy, TaskQueue};
use signal_engine::infrastructure::token::{TokenServiceClient, TokenServiceConfig};
use tokio::net::TcpListener;
use tokio::signal;

/// Default HTTP server port.
const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default SQLite database file.
const DEFAULT_DATABASE_PATH: &str = "signal-engine.db";

/// Default token service endpoint.
const DEFAULT_TOKEN_SERVICE_URL: &str = "http://localhost:8081";

/// Default dispatch queue concurrency.
const DEFAULT_DISPATCH_WORKERS: usize = 4;

/// Parsed configuration from environment variables.
struct EngineConfig {
    http_port: u16,
    database_path: String,
    api_key: String,
    base_url: Option<String>,
    local_ip: Option<String>,
    public_ip: Option<String>,
    mac_address: Option<String>,
    token_service_url: String,
    dispatch_workers: usize,
    retry: RetryPolicy,
    window: TradingWindow,
}

/// Concrete type alias for the dispatch use case.
type ConcreteDispatchUseCase = DispatchSignalUseCase<
    AngelOneBrokerAdapter,
    TokenServiceClient,
    SqliteStore,
    SqliteStore,
    SqliteStore,
>;

/// Concrete type alias for the postback pipeline.
type ConcretePostbackPipeline =
    PostbackPipeline<AngelOneBrokerAdapter, TokenServiceClient, SqliteStore, SqliteStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    tracing::info!("Starting signal engine");

    let config = parse_config()?;
    log_config(&config);

    let store = Arc::new(
        SqliteStore::connect(&config.database_path)
            .await
            .context("opening order ledger")?,
    );
    let broker = create_broker(&config)?;
    let tokens = Arc::new(
        TokenServiceClient::new(TokenServiceConfig::new(config.token_service_url.clone()))
            .context("building token service client")?,
    );

    let (dispatch, postbacks) = create_pipelines(&config, &broker, &tokens, &store);

    let state = AppState {
        dispatch: Arc::clone(&dispatch),
        postbacks: postbacks.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let app = create_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    tracing::info!(%addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  POST /webhook/signal");
    tracing::info!("  POST /webhook/order-postback");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let in-flight broker work finish before the process exits; an entry
    // order placed but never recorded would orphan its bracket.
    tracing::info!("Draining task queues");
    dispatch.drained().await;
    postbacks.drained().await;

    tracing::info!("Signal engine stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Initialize the tracing subscriber with environment filter.
///
/// Uses static directive strings that are compile-time constants guaranteed to parse.
#[allow(clippy::expect_used)]
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "signal_engine=info"
                    .parse()
                    .expect("static directive 'signal_engine=info' is valid"),
            ),
        )
        .init();
}

/// Parse configuration from environment variables.
fn parse_config() -> anyhow::Result<EngineConfig> {
    let api_key = std::env::var("ANGELONE_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        bail!("ANGELONE_API_KEY environment variable is required");
    }

    let http_port: u16 = std::env::var("HTTP_PORT")
        .unwrap_or_else(|_| DEFAULT_HTTP_PORT.to_string())
        .parse()
        .unwrap_or(DEFAULT_HTTP_PORT);

    let database_path = std::env::var("DATABASE_PATH")
        .unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string());

    let token_service_url = std::env::var("TOKEN_SERVICE_URL")
        .unwrap_or_else(|_| DEFAULT_TOKEN_SERVICE_URL.to_string());

    let dispatch_workers: usize = std::env::var("DISPATCH_WORKERS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_DISPATCH_WORKERS)
        .max(1);

    let default_retry = RetryPolicy::default();
    let retry_attempts: u32 = std::env::var("RETRY_ATTEMPTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default_retry.max_attempts);
    let retry_delay_ms: u64 = std::env::var("RETRY_DELAY_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1000);
    let retry = RetryPolicy::fixed(retry_attempts, Duration::from_millis(retry_delay_ms));

    let default_window = TradingWindow::market_hours();
    let window = TradingWindow::new(
        parse_time_var("WINDOW_START").unwrap_or(default_window.start),
        parse_time_var("WINDOW_END").unwrap_or(default_window.end),
    );

    Ok(EngineConfig {
        http_port,
        database_path,
        api_key,
        base_url: std::env::var("ANGELONE_BASE_URL").ok(),
        local_ip: std::env::var("ANGELONE_LOCAL_IP").ok(),
        public_ip: std::env::var("ANGELONE_PUBLIC_IP").ok(),
        mac_address: std::env::var("ANGELONE_MAC").ok(),
        token_service_url,
        dispatch_workers,
        retry,
        window,
    })
}

/// Parse an `HH:MM` time from the named environment variable.
fn parse_time_var(name: &str) -> Option<NaiveTime> {
    let value = std::env::var(name).ok()?;
    match NaiveTime::parse_from_str(&value, "%H:%M") {
        Ok(time) => Some(time),
        Err(error) => {
            tracing::warn!(%name, %value, %error, "invalid time, using default");
            None
        }
    }
}

/// Log the parsed configuration. Secrets stay out of the log.
fn log_config(config: &EngineConfig) {
    tracing::info!(
        http_port = config.http_port,
        database_path = %config.database_path,
        token_service_url = %config.token_service_url,
        dispatch_workers = config.dispatch_workers,
        retry_attempts = config.retry.max_attempts,
        window_start = %config.window.start,
        window_end = %config.window.end,
        "Configuration loaded"
    );
}

/// Create the AngelOne broker adapter.
fn create_broker(config: &EngineConfig) -> anyhow::Result<Arc<AngelOneBrokerAdapter>> {
    let mut angel_config = AngelOneConfig::new(config.api_key.clone());
    if let Some(base_url) = &config.base_url {
        angel_config = angel_config.with_base_url(base_url.clone());
    }
    if let Some(local_ip) = &config.local_ip {
        angel_config.client_local_ip.clone_from(local_ip);
    }
    if let Some(public_ip) = &config.public_ip {
        angel_config.client_public_ip.clone_from(public_ip);
    }
    if let Some(mac) = &config.mac_address {
        angel_config.mac_address.clone_from(mac);
    }

    let broker =
        AngelOneBrokerAdapter::new(angel_config).context("building AngelOne adapter")?;
    tracing::info!("AngelOneBrokerAdapter initialized");
    Ok(Arc::new(broker))
}

/// Wire the dispatch use case and postback pipeline around the shared store.
fn create_pipelines(
    config: &EngineConfig,
    broker: &Arc<AngelOneBrokerAdapter>,
    tokens: &Arc<TokenServiceClient>,
    store: &Arc<SqliteStore>,
) -> (Arc<ConcreteDispatchUseCase>, ConcretePostbackPipeline) {
    let dispatch_queue = TaskQueue::new(
        "dispatch",
        QueueConfig {
            max_workers: config.dispatch_workers,
            retry: config.retry,
        },
    );
    let dispatch = Arc::new(DispatchSignalUseCase::new(
        Arc::clone(broker),
        Arc::clone(tokens),
        Arc::clone(store),
        Arc::clone(store),
        Arc::clone(store),
        dispatch_queue,
        config.window,
    ));

    let reconcile = Arc::new(ReconcileUseCase::new(
        Arc::clone(broker),
        Arc::clone(tokens),
        Arc::clone(store),
        Arc::clone(store),
    ));
    let postbacks = PostbackPipeline::new(reconcile, config.retry);

    (dispatch, postbacks)
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. Failure to install handlers
/// means the process cannot respond to termination signals, so failing fast at
/// startup beats an unresponsive process.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

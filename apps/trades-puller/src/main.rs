//! Trades Puller Binary
//!
//! Streams Poloniex trades to stdout as JSON until SIGINT or SIGTERM.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin trades-puller
//! ```
//!
//! # Environment Variables
//!
//! - `POLONIEX_HOST`: push API host (default: api2.poloniex.com)
//! - `TRADES_PULLER_PAIRS`: comma-separated pairs (default: all)
//! - `TRADES_PULLER_OUTPUT`: pretty | compact (default: pretty)
//! - `TRADES_PULLER_SHUTDOWN_TIMEOUT_SECS`: shutdown bound (default: 10)
//! - `TRADES_PULLER_RECEIVE_ERROR_PAUSE_MS`: pause after receive errors, must be > 0 (default: 250)
//! - `TRADES_PULLER_METRICS_PORT`: Prometheus port, 0 disables (default: 0)
//! - `OTEL_ENABLED`: enable OpenTelemetry export (default: false)
//! - `RUST_LOG`: log filter (default: trades_puller=info)

#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use trades_puller::infrastructure::telemetry;
use trades_puller::{
    MessageDecoder, Pair, PairRegistry, StdoutSink, StreamLoop, TradesPullerConfig, Transport,
    WebSocketTransport, init_metrics, subscribe_all,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    load_dotenv();

    let _telemetry_guard = telemetry::init()?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting trades puller");

    let config = TradesPullerConfig::from_env()?;
    log_config(&config);

    if config.metrics_port != 0 {
        init_metrics(config.metrics_port)?;
    }

    let registry = PairRegistry::poloniex().context("invalid Poloniex channel table")?;
    let registry = Arc::new(registry);

    let mut transport = WebSocketTransport::connect(&config.feed.host)
        .await
        .with_context(|| format!("failed to connect to {}", config.feed.host))?;

    if let Err(e) = subscribe_all(&mut transport, &registry, &config.feed.pairs).await {
        if let Err(close_err) = transport.close().await {
            tracing::error!(error = %close_err, "Failed shutting down transport");
        }
        return Err(e.into());
    }

    let shutdown_token = CancellationToken::new();
    let decoder = Arc::new(MessageDecoder::new(registry));
    let mut stream = StreamLoop::new(
        transport,
        decoder,
        StdoutSink::stdout(config.output),
        shutdown_token.clone(),
    )
    .with_settings(config.stream.clone())
    .spawn();

    await_shutdown(shutdown_token, config.shutdown_timeout).await;

    match tokio::time::timeout(config.shutdown_timeout, stream.completed()).await {
        Ok(Ok(report)) => {
            tracing::info!(
                clean = report.is_clean(),
                trades = report.stats.trades_emitted,
                "Trades puller stopped"
            );
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Stream loop ended abnormally");
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = config.shutdown_timeout.as_secs(),
                "Stream loop did not finish in time, aborting"
            );
            stream.abort();
        }
    }

    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &TradesPullerConfig) {
    let pairs: Vec<&str> = config.feed.pairs.iter().map(Pair::as_str).collect();
    tracing::info!(
        host = %config.feed.host,
        pairs = ?pairs,
        output = %config.output,
        metrics_port = config.metrics_port,
        "Configuration loaded"
    );
    tracing::debug!(
        shutdown_timeout_secs = config.shutdown_timeout.as_secs(),
        receive_error_pause_ms = config.stream.receive_error_pause.as_millis(),
        "Stream settings"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(_) => return,
        Err(e) => {
            if let Some(message) = dotenv_failure(Path::new(".env"), &e) {
                eprintln!("{message}");
                return;
            }
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                if let Err(e) = dotenvy::from_path(&env_path)
                    && let Some(message) = dotenv_failure(&env_path, &e)
                {
                    eprintln!("{message}");
                }
                return;
            }
            dir = parent;
        }
    }
}

/// Message for a `.env` file that exists but could not be loaded.
fn dotenv_failure(path: &Path, error: &dotenvy::Error) -> Option<String> {
    (!error.not_found()).then(|| format!("Failed to load {}: {error}", path.display()))
}

/// Wait for SIGINT or SIGTERM, then cancel the stream.
async fn await_shutdown(shutdown_token: CancellationToken, timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed installing Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed installing SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = timeout.as_secs(),
        "Graceful shutdown started"
    );
}

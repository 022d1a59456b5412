//! Prometheus Metrics Module
//!
//! # Metrics
//!
//! - `trades_puller_messages_received_total`
//! - `trades_puller_trades_emitted_total{pair, side}`
//! - `trades_puller_decode_errors_total{kind}`
//! - `trades_puller_receive_errors_total`
//! - `trades_puller_sink_errors_total`
//! - `trades_puller_decode_seconds`
//!
//! Recording functions are no-ops until a recorder is installed.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::domain::pair::Pair;
use crate::domain::trade::TradeSide;

const MESSAGES_RECEIVED: &str = "trades_puller_messages_received_total";
const TRADES_EMITTED: &str = "trades_puller_trades_emitted_total";
const DECODE_ERRORS: &str = "trades_puller_decode_errors_total";
const RECEIVE_ERRORS: &str = "trades_puller_receive_errors_total";
const SINK_ERRORS: &str = "trades_puller_sink_errors_total";
const DECODE_SECONDS: &str = "trades_puller_decode_seconds";

static INSTALLED: OnceLock<SocketAddr> = OnceLock::new();

/// Metrics exporter errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be built or installed.
    #[error("failed to install Prometheus exporter: {0}")]
    Install(#[from] BuildError),

    /// A recorder is already listening on another address.
    #[error("Prometheus exporter already listening on {0}")]
    AlreadyInstalled(SocketAddr),
}

/// Address the exporter listens on for a port.
#[must_use]
pub fn listen_addr(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

/// Install the Prometheus recorder with an HTTP listener on `port`.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns an error if the listener cannot be started, or if another
/// listener was installed earlier.
pub fn init_metrics(port: u16) -> Result<SocketAddr, MetricsError> {
    let addr = listen_addr(port);
    if let Some(existing) = INSTALLED.get() {
        return if *existing == addr {
            Ok(addr)
        } else {
            Err(MetricsError::AlreadyInstalled(*existing))
        };
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_metrics();
    let _ = INSTALLED.set(addr);

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(addr)
}

fn register_metrics() {
    describe_counter!(MESSAGES_RECEIVED, "Push messages received from Poloniex");
    describe_counter!(TRADES_EMITTED, "Trades handed to the output sink");
    describe_counter!(DECODE_ERRORS, "Messages discarded by the decoder, by kind");
    describe_counter!(RECEIVE_ERRORS, "Failed transport receives");
    describe_counter!(SINK_ERRORS, "Trades the output sink rejected");
    describe_histogram!(DECODE_SECONDS, "Time spent decoding one push message");
}

/// Record a received push message.
pub fn record_message_received() {
    counter!(MESSAGES_RECEIVED).increment(1);
}

/// Record a trade accepted by the sink.
pub fn record_trade_emitted(pair: Pair, side: TradeSide) {
    counter!(
        TRADES_EMITTED,
        "pair" => pair.as_str(),
        "side" => side.as_str()
    )
    .increment(1);
}

/// Record a decode failure.
pub fn record_decode_error(kind: &'static str) {
    counter!(DECODE_ERRORS, "kind" => kind).increment(1);
}

/// Record a failed receive.
pub fn record_receive_error() {
    counter!(RECEIVE_ERRORS).increment(1);
}

/// Record a sink failure.
pub fn record_sink_error() {
    counter!(SINK_ERRORS).increment(1);
}

/// Record decode duration for one message.
pub fn record_decode_duration(duration: Duration) {
    histogram!(DECODE_SECONDS).record(duration.as_secs_f64());
}

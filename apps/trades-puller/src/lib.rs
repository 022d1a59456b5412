#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::significant_drop_tightening
    )
)]

//! Trades Puller - Poloniex Trade Feed Decoder
//!
//! Connects to the Poloniex push API, subscribes to a fixed set of trading
//! pairs and turns each pushed trade into a `RecentTrade` JSON document.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: `pair`, `trade`
//! - **Application**: `ports` (`Transport`, `TradeSink`)
//! - **Infrastructure**:
//!   - `poloniex`: registry, decoder, subscriptions, WebSocket, stream loop
//!   - `output`: stdout and channel sinks
//!   - `config`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//! Poloniex WS ──► Transport ──► StreamLoop ──► MessageDecoder ──► TradeSink
//!                                   ▲
//!                        CancellationToken (SIGINT / SIGTERM)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Trade types with no exchange knowledge.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::pair::{Pair, UnknownPair};
pub use domain::trade::{RecentTrade, TradeError, TradeRecord, TradeSide};

// Ports
pub use application::ports::{SinkError, TradeSink, Transport, TransportError};

// Poloniex adapters
pub use infrastructure::poloniex::{
    DecodeError, MessageDecoder, PairRegistry, RegistryError, ShutdownReport, StreamError,
    StreamHandle, StreamLoop, StreamLoopSettings, StreamStats, SubscribeError, WebSocketTransport,
    subscribe_all,
};

// Sinks
pub use infrastructure::output::{ChannelSink, OutputFormat, StdoutSink};

// Config
pub use infrastructure::config::{ConfigError, FeedSettings, TradesPullerConfig};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};

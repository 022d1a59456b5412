//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations of the port interfaces defined in the
//! application layer, plus process-level concerns.

/// Poloniex push API adapters (registry, decoder, transport, stream loop).
pub mod poloniex;

/// Trade sinks (stdout JSON, in-process channel).
pub mod output;

/// Environment configuration.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Logging and OpenTelemetry tracing integration.
pub mod telemetry;

//! Port Interfaces
//!
//! Contracts between the stream loop and the outside world, following the
//! Hexagonal Architecture pattern.
//!
//! ## Driven Ports (Outbound)
//!
//! - `Transport`: message-oriented connection to the exchange
//! - `TradeSink`: destination for decoded trades

use async_trait::async_trait;

use crate::domain::trade::TradeRecord;

// =============================================================================
// Transport
// =============================================================================

/// Errors raised by a transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Underlying socket error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Peer sent a frame that is not valid UTF-8 text.
    #[error("received non UTF-8 payload")]
    NonUtf8,

    /// Connection is closed.
    #[error("connection closed")]
    Closed,
}

/// Message-oriented connection to the exchange.
///
/// Owned by exactly one stream loop, which closes it once on shutdown.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send {
    /// Send one text payload.
    async fn send(&mut self, payload: String) -> Result<(), TransportError>;

    /// Wait for the next inbound text message.
    async fn receive(&mut self) -> Result<String, TransportError>;

    /// Close the connection. Calling this more than once must be harmless.
    async fn close(&mut self) -> Result<(), TransportError>;
}

// =============================================================================
// Trade Sink
// =============================================================================

/// Errors raised by a trade sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Record could not be rendered.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Writing the rendered record failed.
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),

    /// Downstream consumer went away.
    #[error("sink closed")]
    Closed,
}

/// Destination for decoded trades.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeSink: Send {
    /// Hand one trade downstream.
    async fn emit(&mut self, trade: &TradeRecord) -> Result<(), SinkError>;
}

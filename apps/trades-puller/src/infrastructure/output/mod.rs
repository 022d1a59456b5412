//! Output Sinks
//!
//! `TradeSink` adapters:
//!
//! - `StdoutSink`: renders each trade as a `RecentTrade` JSON document
//! - `ChannelSink`: forwards trades to an in-process consumer

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::ports::{SinkError, TradeSink};
use crate::domain::trade::{RecentTrade, TradeRecord};

// =============================================================================
// Output Format
// =============================================================================

/// JSON rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Indented, one field per line.
    #[default]
    Pretty,
    /// One document per line.
    Compact,
}

impl OutputFormat {
    /// Get the format name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognised format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown output format: {0} (expected pretty or compact)")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

// =============================================================================
// Stdout Sink
// =============================================================================

/// Writes trades as JSON to a byte sink, stdout by default.
#[derive(Debug)]
pub struct StdoutSink<W = io::Stdout> {
    writer: W,
    format: OutputFormat,
}

impl StdoutSink {
    /// Create a sink over the process stdout.
    #[must_use]
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write> StdoutSink<W> {
    /// Create a sink over an arbitrary writer.
    pub const fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn render(&self, trade: &TradeRecord) -> Result<String, serde_json::Error> {
        let recent = RecentTrade::from(trade);
        match self.format {
            OutputFormat::Pretty => serde_json::to_string_pretty(&recent),
            OutputFormat::Compact => serde_json::to_string(&recent),
        }
    }
}

#[async_trait]
impl<W: Write + Send> TradeSink for StdoutSink<W> {
    async fn emit(&mut self, trade: &TradeRecord) -> Result<(), SinkError> {
        let rendered = self.render(trade)?;

        // Stdout takes its lock once per formatted write.
        writeln!(self.writer, "{rendered}")?;
        self.writer.flush()?;
        Ok(())
    }
}

// =============================================================================
// Channel Sink
// =============================================================================

/// Forwards trades into an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<TradeRecord>,
}

impl ChannelSink {
    /// Create a sink feeding `tx`.
    #[must_use]
    pub const fn new(tx: mpsc::Sender<TradeRecord>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl TradeSink for ChannelSink {
    async fn emit(&mut self, trade: &TradeRecord) -> Result<(), SinkError> {
        self.tx
            .send(trade.clone())
            .await
            .map_err(|_| SinkError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pair::Pair;
    use crate::domain::trade::TradeSide;
    use chrono::DateTime;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use test_case::test_case;
    use tokio_test::{assert_err, assert_ok};

    fn trade() -> TradeRecord {
        TradeRecord::new(
            "25960932",
            Pair::EthUsdt,
            TradeSide::Sell,
            Decimal::from_str("139.71000000").unwrap(),
            Decimal::from_str("0.00703296").unwrap(),
            DateTime::from_timestamp(1_552_877_119, 0).unwrap(),
        )
        .unwrap()
    }

    #[test_case("pretty", OutputFormat::Pretty)]
    #[test_case("COMPACT", OutputFormat::Compact)]
    #[test_case(" Pretty ", OutputFormat::Pretty)]
    fn parses_format(raw: &str, expected: OutputFormat) {
        assert_eq!(raw.parse::<OutputFormat>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_format() {
        assert_eq!(
            "yaml".parse::<OutputFormat>(),
            Err(UnknownFormat("yaml".to_string()))
        );
    }

    #[tokio::test]
    async fn pretty_output_is_indented_json() {
        let mut sink = StdoutSink::new(Vec::new(), OutputFormat::Pretty);
        sink.emit(&trade()).await.unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.starts_with("{\n  \"id\": \"25960932\""));
        assert!(out.ends_with("}\n"));

        let parsed: RecentTrade = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.pair, "ETH_USDT");
        assert_eq!(parsed.side, "SELL");
    }

    #[tokio::test]
    async fn compact_output_is_one_line_per_trade() {
        let mut sink = StdoutSink::new(Vec::new(), OutputFormat::Compact);
        assert_ok!(sink.emit(&trade()).await);
        assert_ok!(sink.emit(&trade()).await);

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""timestamp":"2019-03-18T02:45:19Z""#));
        assert!(lines[0].contains(r#""price":139.71,"amount":0.00703296"#));
    }

    #[tokio::test]
    async fn channel_sink_forwards_trades() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut sink = ChannelSink::new(tx);

        assert_ok!(sink.emit(&trade()).await);
        assert_eq!(rx.recv().await.unwrap(), trade());
    }

    #[tokio::test]
    async fn channel_sink_reports_dropped_receiver() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let mut sink = ChannelSink::new(tx);
        let err = assert_err!(sink.emit(&trade()).await);
        assert!(matches!(err, SinkError::Closed));
    }
}

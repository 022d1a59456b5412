//! Trade Stream Loop
//!
//! Drives one transport until cancelled: receive a push message, decode it,
//! forward every trade to the sink.
//!
//! # Lifecycle
//!
//! ```text
//!            cancel token fired
//! Running ─────────────────────────► Terminating
//!   │  ▲                               │
//!   │  │ receive / decode / emit       │ close transport (once)
//!   └──┘ errors are logged             │ send ShutdownReport
//!                                      ▼
//! ```
//!
//! Cancellation is checked between iterations only. A receive that is
//! already in flight completes (or fails) before shutdown begins.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::decoder::MessageDecoder;
use crate::application::ports::{TradeSink, Transport, TransportError};
use crate::domain::trade::TradeRecord;
use crate::infrastructure::metrics;

// =============================================================================
// Settings and Reports
// =============================================================================

/// Stream loop tuning.
#[derive(Debug, Clone)]
pub struct StreamLoopSettings {
    /// Pause after a receive error before trying again (zero disables).
    pub receive_error_pause: Duration,
}

impl Default for StreamLoopSettings {
    fn default() -> Self {
        Self {
            receive_error_pause: Duration::from_millis(250),
        }
    }
}

/// Counters for one loop lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Messages successfully received.
    pub messages_received: u64,
    /// Trades accepted by the sink.
    pub trades_emitted: u64,
    /// Failed receives.
    pub receive_errors: u64,
    /// Messages discarded by the decoder.
    pub decode_errors: u64,
    /// Trades the sink rejected.
    pub sink_errors: u64,
}

/// Outcome of a finished loop, sent on the completion channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Counters at shutdown.
    pub stats: StreamStats,
    /// Error raised while closing the transport, if any.
    pub close_error: Option<TransportError>,
}

impl ShutdownReport {
    /// Check if the transport closed without error.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.close_error.is_none()
    }
}

/// Errors observed by the owner of a spawned loop.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The loop task ended without sending its report.
    #[error("stream loop exited without reporting completion")]
    CompletionDropped,
}

// =============================================================================
// Stream Handle
// =============================================================================

/// Owner's side of a spawned stream loop.
#[derive(Debug)]
pub struct StreamHandle {
    completion: oneshot::Receiver<ShutdownReport>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Wait until the loop has closed its transport.
    ///
    /// # Errors
    ///
    /// Returns `CompletionDropped` if the loop task died before reporting.
    pub async fn completed(&mut self) -> Result<ShutdownReport, StreamError> {
        (&mut self.completion)
            .await
            .map_err(|_| StreamError::CompletionDropped)
    }

    /// Abort the loop task.
    pub fn abort(&self) {
        self.task.abort();
    }
}

// =============================================================================
// Stream Loop
// =============================================================================

/// Receive → decode → emit loop over an owned transport.
pub struct StreamLoop<T, S> {
    transport: T,
    decoder: Arc<MessageDecoder>,
    sink: S,
    cancel: CancellationToken,
    settings: StreamLoopSettings,
    stats: StreamStats,
}

impl<T, S> StreamLoop<T, S>
where
    T: Transport,
    S: TradeSink,
{
    /// Create a stream loop. The transport is closed when the loop ends.
    #[must_use]
    pub fn new(
        transport: T,
        decoder: Arc<MessageDecoder>,
        sink: S,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            decoder,
            sink,
            cancel,
            settings: StreamLoopSettings::default(),
            stats: StreamStats::default(),
        }
    }

    /// Replace the default settings.
    #[must_use]
    pub fn with_settings(mut self, settings: StreamLoopSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Run until cancelled, then close the transport.
    ///
    /// Consumes the loop, so the transport is closed exactly once.
    #[tracing::instrument(name = "stream_loop", skip_all)]
    pub async fn run(mut self) -> ShutdownReport {
        tracing::info!("Listening for trades");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            match self.transport.receive().await {
                Ok(msg) => self.handle_message(&msg).await,
                Err(e) => self.handle_receive_error(&e).await,
            }
        }

        self.shutdown().await
    }

    /// Run on a new task and hand back the completion signal.
    #[must_use]
    pub fn spawn(self) -> StreamHandle
    where
        T: 'static,
        S: 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let report = self.run().await;
            if tx.send(report).is_err() {
                tracing::warn!("Stream owner went away before shutdown completed");
            }
        });

        StreamHandle {
            completion: rx,
            task,
        }
    }

    async fn handle_message(&mut self, msg: &str) {
        self.stats.messages_received += 1;
        metrics::record_message_received();

        let started = Instant::now();
        let decoded = self.decoder.decode(msg);
        metrics::record_decode_duration(started.elapsed());

        match decoded {
            Ok(trades) => {
                for trade in &trades {
                    self.emit(trade).await;
                }
            }
            Err(e) => {
                self.stats.decode_errors += 1;
                metrics::record_decode_error(e.kind());
                tracing::error!(error = %e, kind = e.kind(), "Failed fetching trade fields");
            }
        }
    }

    async fn emit(&mut self, trade: &TradeRecord) {
        match self.sink.emit(trade).await {
            Ok(()) => {
                self.stats.trades_emitted += 1;
                metrics::record_trade_emitted(trade.pair(), trade.side());
                tracing::debug!(
                    id = trade.id(),
                    pair = %trade.pair(),
                    side = %trade.side(),
                    price = %trade.price(),
                    amount = %trade.amount(),
                    "Trade emitted"
                );
            }
            Err(e) => {
                self.stats.sink_errors += 1;
                metrics::record_sink_error();
                tracing::error!(error = %e, id = trade.id(), "Failed emitting trade");
            }
        }
    }

    async fn handle_receive_error(&mut self, err: &TransportError) {
        self.stats.receive_errors += 1;
        metrics::record_receive_error();
        tracing::error!(error = %err, "Failed receiving a message");

        let pause = self.settings.receive_error_pause;
        if pause.is_zero() {
            return;
        }

        tokio::select! {
            () = self.cancel.cancelled() => {}
            () = tokio::time::sleep(pause) => {}
        }
    }

    async fn shutdown(mut self) -> ShutdownReport {
        tracing::info!("Cancellation received, closing transport");

        let close_error = match self.transport.close().await {
            Ok(()) => {
                tracing::info!("Transport closed");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed shutting down transport");
                Some(e)
            }
        };

        tracing::info!(
            messages = self.stats.messages_received,
            trades = self.stats.trades_emitted,
            receive_errors = self.stats.receive_errors,
            decode_errors = self.stats.decode_errors,
            sink_errors = self.stats.sink_errors,
            "Stream loop stopped"
        );

        ShutdownReport {
            stats: self.stats,
            close_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::application::ports::{MockTradeSink, MockTransport, SinkError};
    use crate::domain::pair::Pair;
    use crate::infrastructure::output::ChannelSink;
    use crate::infrastructure::poloniex::registry::PairRegistry;
    use tokio::sync::mpsc;

    const BTC_TRADE: &str = r#"[121, 1, [["o", 1, "0.1", "2", "0"], ["t", "1", 1, "0.05", "0.5", 1552877119, "0"]]]"#;
    const ETH_TRADES: &str = r#"[149, 2, [["t", "2", 0, "112", "0.1", 1552877120, "0"],["t", "3", 1, "113", "0.2", 1552877121, "0"]]]"#;
    const BAD_SIDE: &str = r#"[121, 3, [["t", "4", 1, "1", "1", 1552877119], ["t", "5", 9, "1", "1", 1552877119]]]"#;

    fn decoder() -> Arc<MessageDecoder> {
        Arc::new(MessageDecoder::new(Arc::new(PairRegistry::poloniex().unwrap())))
    }

    fn no_pause() -> StreamLoopSettings {
        StreamLoopSettings {
            receive_error_pause: Duration::ZERO,
        }
    }

    /// Mock transport that replays `script` and fires `cancel` after the last
    /// entry has been handed out.
    fn scripted(
        script: Vec<Result<String, TransportError>>,
        cancel: &CancellationToken,
    ) -> MockTransport {
        let calls = script.len();
        let mut script = VecDeque::from(script);
        let token = cancel.clone();

        let mut transport = MockTransport::new();
        transport.expect_receive().times(calls).returning(move || {
            let next = script.pop_front().unwrap();
            if script.is_empty() {
                token.cancel();
            }
            next
        });
        transport
    }

    #[tokio::test]
    async fn cancelled_before_start_never_receives() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut transport = MockTransport::new();
        transport.expect_receive().never();
        transport.expect_close().times(1).returning(|| Ok(()));

        let report = StreamLoop::new(transport, decoder(), MockTradeSink::new(), cancel)
            .run()
            .await;

        assert!(report.is_clean());
        assert_eq!(report.stats, StreamStats::default());
    }

    #[tokio::test]
    async fn emits_trades_in_order_and_survives_errors() {
        let cancel = CancellationToken::new();
        let mut transport = scripted(
            vec![
                Ok(BTC_TRADE.to_string()),
                Err(TransportError::WebSocket("connection reset".to_string())),
                Ok(BAD_SIDE.to_string()),
                Ok("[1010]".to_string()),
                Ok(ETH_TRADES.to_string()),
            ],
            &cancel,
        );
        transport.expect_close().times(1).returning(|| Ok(()));

        let (tx, mut rx) = mpsc::channel(16);
        let report = StreamLoop::new(transport, decoder(), ChannelSink::new(tx), cancel)
            .with_settings(no_pause())
            .run()
            .await;

        let mut ids = Vec::new();
        while let Ok(trade) = rx.try_recv() {
            ids.push((trade.id().to_string(), trade.pair()));
        }
        assert_eq!(
            ids,
            vec![
                ("1".to_string(), Pair::BtcUsdt),
                ("2".to_string(), Pair::EthUsdt),
                ("3".to_string(), Pair::EthUsdt),
            ]
        );

        assert_eq!(
            report.stats,
            StreamStats {
                messages_received: 4,
                trades_emitted: 3,
                receive_errors: 1,
                decode_errors: 1,
                sink_errors: 0,
            }
        );
    }

    #[tokio::test]
    async fn close_error_is_reported_not_escalated() {
        let cancel = CancellationToken::new();
        let mut transport = scripted(vec![Ok("[1010]".to_string())], &cancel);
        transport
            .expect_close()
            .times(1)
            .returning(|| Err(TransportError::WebSocket("broken pipe".to_string())));

        let report = StreamLoop::new(transport, decoder(), MockTradeSink::new(), cancel)
            .run()
            .await;

        assert!(!report.is_clean());
        assert_eq!(
            report.close_error,
            Some(TransportError::WebSocket("broken pipe".to_string()))
        );
        assert_eq!(report.stats.messages_received, 1);
    }

    #[tokio::test]
    async fn sink_errors_do_not_stop_the_stream() {
        let cancel = CancellationToken::new();
        let mut transport = scripted(
            vec![Ok(ETH_TRADES.to_string()), Ok(BTC_TRADE.to_string())],
            &cancel,
        );
        transport.expect_close().times(1).returning(|| Ok(()));

        let mut sink = MockTradeSink::new();
        sink.expect_emit()
            .times(3)
            .returning(|trade| {
                if trade.id() == "2" {
                    Err(SinkError::Closed)
                } else {
                    Ok(())
                }
            });

        let report = StreamLoop::new(transport, decoder(), sink, cancel)
            .with_settings(no_pause())
            .run()
            .await;

        assert_eq!(report.stats.trades_emitted, 2);
        assert_eq!(report.stats.sink_errors, 1);
    }

    #[tokio::test]
    async fn error_pause_ends_on_cancellation() {
        let cancel = CancellationToken::new();
        let mut transport = scripted(vec![Err(TransportError::Closed)], &cancel);
        transport.expect_close().times(1).returning(|| Ok(()));

        let stream = StreamLoop::new(transport, decoder(), MockTradeSink::new(), cancel)
            .with_settings(StreamLoopSettings {
                receive_error_pause: Duration::from_secs(3600),
            });

        let report = tokio::time::timeout(Duration::from_secs(5), stream.run())
            .await
            .unwrap();
        assert_eq!(report.stats.receive_errors, 1);
    }

    #[tokio::test]
    async fn spawned_loop_signals_completion() {
        let cancel = CancellationToken::new();
        let mut transport = scripted(vec![Ok(BTC_TRADE.to_string())], &cancel);
        transport.expect_close().times(1).returning(|| Ok(()));

        let (tx, mut rx) = mpsc::channel(4);
        let mut handle = StreamLoop::new(transport, decoder(), ChannelSink::new(tx), cancel)
            .spawn();

        let report = handle.completed().await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.stats.trades_emitted, 1);
        assert_eq!(rx.recv().await.unwrap().id(), "1");
    }
}

//! WebSocket Transport
//!
//! `Transport` adapter over `tokio-tungstenite`.
//!
//! # Stream URL
//!
//! - Production: `wss://api2.poloniex.com/ws`
//!
//! The handshake carries an `Origin: https://<host>` header.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::ORIGIN;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use async_trait::async_trait;

use crate::application::ports::{Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build the push API URL for a host.
#[must_use]
pub fn stream_url(host: &str) -> String {
    format!("wss://{host}/ws")
}

/// Build the handshake origin for a host.
#[must_use]
pub fn origin_url(host: &str) -> String {
    format!("https://{host}")
}

/// WebSocket connection to the Poloniex push API.
pub struct WebSocketTransport {
    url: String,
    stream: WsStream,
    closed: bool,
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("url", &self.url)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl WebSocketTransport {
    /// Connect to the push API on `host`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if the handshake fails.
    pub async fn connect(host: &str) -> Result<Self, TransportError> {
        Self::connect_url(&stream_url(host), &origin_url(host)).await
    }

    /// Connect to an explicit URL with an explicit origin header.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if the request is invalid or the handshake
    /// fails.
    pub async fn connect_url(url: &str, origin: &str) -> Result<Self, TransportError> {
        tracing::info!(url, "Connecting to Poloniex push API");

        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let origin = HeaderValue::from_str(origin)
            .map_err(|e| TransportError::ConnectionFailed(format!("invalid origin: {e}")))?;
        request.headers_mut().insert(ORIGIN, origin);

        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        tracing::info!(url, "Connected");

        Ok(Self {
            url: url.to_string(),
            stream,
            closed: false,
        })
    }

    /// Check if the connection has been closed by either side.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

fn map_ws_error(err: tungstenite::Error) -> TransportError {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        other => TransportError::WebSocket(other.to_string()),
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, payload: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        self.stream
            .send(Message::Text(payload.into()))
            .await
            .map_err(map_ws_error)
    }

    async fn receive(&mut self) -> Result<String, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Binary(data))) => {
                    return String::from_utf8(data.to_vec()).map_err(|_| TransportError::NonUtf8);
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                    // Pongs are queued by tungstenite itself.
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Server sent close frame");
                    self.closed = true;
                    return Err(TransportError::Closed);
                }
                Some(Err(e)) => return Err(map_ws_error(e)),
                None => {
                    tracing::info!("WebSocket stream ended");
                    self.closed = true;
                    return Err(TransportError::Closed);
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match self.stream.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(TransportError::WebSocket(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn poloniex_urls() {
        assert_eq!(stream_url("api2.poloniex.com"), "wss://api2.poloniex.com/ws");
        assert_eq!(origin_url("api2.poloniex.com"), "https://api2.poloniex.com");
    }

    #[tokio::test]
    async fn invalid_url_fails_to_connect() {
        let err = WebSocketTransport::connect_url("not a url", "https://example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn exchanges_messages_with_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

            let first = ws.next().await.unwrap().unwrap();
            assert_eq!(
                first.into_text().unwrap().as_str(),
                r#"{"command":"subscribe","channel":"USDT_BTC"}"#
            );

            ws.send(Message::Ping(vec![1].into())).await.unwrap();
            ws.send(Message::Text("[1010]".to_string().into()))
                .await
                .unwrap();
            ws.send(Message::Binary(b"[121, 1, []]".to_vec().into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut transport =
            WebSocketTransport::connect_url(&format!("ws://{addr}"), "http://localhost")
                .await
                .unwrap();

        transport
            .send(r#"{"command":"subscribe","channel":"USDT_BTC"}"#.to_string())
            .await
            .unwrap();

        assert_eq!(transport.receive().await.unwrap(), "[1010]");
        assert_eq!(transport.receive().await.unwrap(), "[121, 1, []]");
        assert_eq!(transport.receive().await, Err(TransportError::Closed));
        assert!(transport.is_closed());

        assert_eq!(transport.close().await, Ok(()));
        assert_eq!(transport.close().await, Ok(()));
        assert_eq!(
            transport.send("late".to_string()).await,
            Err(TransportError::Closed)
        );

        drop(transport);
        server.await.unwrap();
    }
}

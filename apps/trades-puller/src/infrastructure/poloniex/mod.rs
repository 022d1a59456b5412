//! Poloniex Push API Adapters
//!
//! - **Registry**: pair ↔ subscription token ↔ channel id
//! - **Decoder**: push message → trade records
//! - **Messages**: subscribe commands
//! - **Transport**: WebSocket connection
//! - **Stream**: cancellation-aware receive loop

pub mod decoder;
pub mod messages;
pub mod registry;
pub mod side;
pub mod stream;
pub mod transport;

pub use decoder::{DecodeError, MessageDecoder};
pub use messages::{SubscribeCommand, SubscribeError, subscribe_all};
pub use registry::{PairRegistry, RegistryError};
pub use side::{SideCodec, SideError};
pub use stream::{
    ShutdownReport, StreamError, StreamHandle, StreamLoop, StreamLoopSettings, StreamStats,
};
pub use transport::{WebSocketTransport, origin_url, stream_url};

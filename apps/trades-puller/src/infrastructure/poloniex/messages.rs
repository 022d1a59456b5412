//! Poloniex Outbound Messages
//!
//! Subscription commands sent once at startup, one per pair.
//!
//! # Wire Format (JSON)
//! ```json
//! {"command": "subscribe", "channel": "USDT_BTC"}
//! ```

use serde::{Deserialize, Serialize};

use super::registry::{PairRegistry, RegistryError};
use crate::application::ports::{Transport, TransportError};
use crate::domain::pair::Pair;

/// Command name for channel subscription.
pub const SUBSCRIBE_COMMAND: &str = "subscribe";

/// Channel subscription request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeCommand {
    /// Always `subscribe`.
    pub command: String,
    /// Poloniex channel token, e.g. `USDT_BTC`.
    pub channel: String,
}

impl SubscribeCommand {
    /// Create a subscribe command for a channel token.
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            command: SUBSCRIBE_COMMAND.to_string(),
            channel: channel.into(),
        }
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Startup subscription failures. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    /// Pair has no subscription token.
    #[error("cannot subscribe: {0}")]
    Registry(#[from] RegistryError),

    /// Command could not be encoded.
    #[error("failed to serialize subscribe: {0}")]
    Encode(#[from] serde_json::Error),

    /// Command could not be sent.
    #[error("failed to send subscribe for {pair}: {source}")]
    Send {
        /// Pair being subscribed.
        pair: Pair,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
}

/// Send one subscribe command per pair, in order.
///
/// Stops at the first failure.
///
/// # Errors
///
/// Returns an error if a pair is not registered, or encoding or sending fails.
pub async fn subscribe_all<T>(
    transport: &mut T,
    registry: &PairRegistry,
    pairs: &[Pair],
) -> Result<(), SubscribeError>
where
    T: Transport + ?Sized,
{
    for &pair in pairs {
        let token = registry.subscription_token(pair)?;
        let json = SubscribeCommand::new(token).to_json()?;

        tracing::debug!(%pair, channel = token, "Sending subscribe request");

        transport
            .send(json)
            .await
            .map_err(|source| SubscribeError::Send { pair, source })?;

        tracing::info!(%pair, channel = token, "Subscribed");
    }

    Ok(())
}

//! Pair Registry
//!
//! Bidirectional mapping between the service's trading pairs and Poloniex's
//! native identifiers:
//!
//! - **Outbound**: pair → subscription token (`USDT_BTC`)
//! - **Inbound**: numeric channel id (`"121"`) → pair
//!
//! # Channel Table
//!
//! | Pair       | Token      | Channel |
//! |------------|------------|---------|
//! | `BTC_USDT` | `USDT_BTC` | 121     |
//! | `TRX_USDT` | `USDT_TRX` | 265     |
//! | `ETH_USDT` | `USDT_ETH` | 149     |

use std::collections::HashMap;

use crate::domain::pair::Pair;

/// Production rows: pair, subscription token, channel id.
const POLONIEX_CHANNELS: [(Pair, &str, &str); 3] = [
    (Pair::BtcUsdt, "USDT_BTC", "121"),
    (Pair::TrxUsdt, "USDT_TRX", "265"),
    (Pair::EthUsdt, "USDT_ETH", "149"),
];

/// Registry lookup and construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Inbound channel id is not mapped to any pair.
    #[error("undefined pair id: {0:?}")]
    UnknownChannel(String),

    /// Pair has no registered channel.
    #[error("pair not registered: {0:?}")]
    UnregisteredPair(Pair),

    /// The `Invalid` sentinel cannot be registered.
    #[error("cannot register the invalid pair sentinel")]
    SentinelPair,

    /// Pair appears twice.
    #[error("duplicate pair: {0}")]
    DuplicatePair(Pair),

    /// Channel id appears twice.
    #[error("duplicate channel id: {0}")]
    DuplicateChannel(String),

    /// Subscription token appears twice.
    #[error("duplicate subscription token: {0}")]
    DuplicateToken(String),
}

/// One registry row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    token: String,
    channel_id: String,
}

/// Immutable pair ↔ channel table.
///
/// Every registered pair maps to exactly one channel id and one token, and
/// vice versa.
#[derive(Debug, Clone)]
pub struct PairRegistry {
    order: Vec<Pair>,
    by_pair: HashMap<Pair, Entry>,
    by_channel: HashMap<String, Pair>,
}

impl PairRegistry {
    /// Build a registry from `(pair, subscription token, channel id)` rows.
    ///
    /// # Errors
    ///
    /// Returns an error if a row uses the sentinel pair or any pair, token
    /// or channel id repeats.
    pub fn new<'a, I>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (Pair, &'a str, &'a str)>,
    {
        let mut order = Vec::new();
        let mut by_pair = HashMap::new();
        let mut by_channel = HashMap::new();

        for (pair, token, channel_id) in entries {
            if !pair.is_valid() {
                return Err(RegistryError::SentinelPair);
            }
            if by_pair.contains_key(&pair) {
                return Err(RegistryError::DuplicatePair(pair));
            }
            if by_channel.contains_key(channel_id) {
                return Err(RegistryError::DuplicateChannel(channel_id.to_string()));
            }
            if by_pair.values().any(|e: &Entry| e.token == token) {
                return Err(RegistryError::DuplicateToken(token.to_string()));
            }

            order.push(pair);
            by_channel.insert(channel_id.to_string(), pair);
            by_pair.insert(
                pair,
                Entry {
                    token: token.to_string(),
                    channel_id: channel_id.to_string(),
                },
            );
        }

        Ok(Self {
            order,
            by_pair,
            by_channel,
        })
    }

    /// Registry with Poloniex's production channel table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table breaks the one-to-one mapping.
    pub fn poloniex() -> Result<Self, RegistryError> {
        Self::new(POLONIEX_CHANNELS)
    }

    /// Subscription token for a pair.
    ///
    /// # Errors
    ///
    /// Returns `UnregisteredPair` for the sentinel or a pair not in this
    /// registry.
    pub fn subscription_token(&self, pair: Pair) -> Result<&str, RegistryError> {
        self.by_pair
            .get(&pair)
            .map(|e| e.token.as_str())
            .ok_or(RegistryError::UnregisteredPair(pair))
    }

    /// Channel id Poloniex uses in push messages for a pair.
    ///
    /// # Errors
    ///
    /// Returns `UnregisteredPair` for the sentinel or a pair not in this
    /// registry.
    pub fn channel_id(&self, pair: Pair) -> Result<&str, RegistryError> {
        self.by_pair
            .get(&pair)
            .map(|e| e.channel_id.as_str())
            .ok_or(RegistryError::UnregisteredPair(pair))
    }

    /// Resolve the leading channel id of a push message.
    ///
    /// # Errors
    ///
    /// Returns `UnknownChannel` if the id is not registered.
    pub fn pair_from_channel_id(&self, id: &str) -> Result<Pair, RegistryError> {
        self.by_channel
            .get(id)
            .copied()
            .ok_or_else(|| RegistryError::UnknownChannel(id.to_string()))
    }

    /// Registered pairs in registration order.
    pub fn pairs(&self) -> impl Iterator<Item = Pair> + '_ {
        self.order.iter().copied()
    }

    /// Number of registered pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

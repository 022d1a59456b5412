//! Push Message Decoder
//!
//! Extracts trade executions from Poloniex price-aggregated book pushes.
//!
//! # Wire Format
//!
//! Push messages are not valid JSON at the top level. They carry a numeric
//! channel id, a sequence number and a list of heterogeneous entries:
//!
//! ```text
//! [ <channel-id>, <seq>, [ <entry>, <entry>, ... ] ]
//!
//! ["o", <side>, "<price>", "<size>", "<ts-ms>"]                      book update
//! ["t", "<id>", <side>, "<price>", "<amount>", <ts-secs>, "<ts-ms>"] trade
//! ```
//!
//! The decoder does a single left-to-right scan instead of parsing the
//! message as a document. Buffers cut mid-entry at either edge are expected:
//! a trade block with no closing bracket, or a closing bracket with no
//! opening marker, contributes nothing.
//!
//! Decoding is all-or-nothing per message. The first malformed trade entry
//! aborts the whole message.
//!
//! # References
//!
//! - [Price Aggregated Book](https://docs.poloniex.com/#price-aggregated-book)

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::registry::{PairRegistry, RegistryError};
use super::side::{SideCodec, SideError};
use crate::domain::trade::{TradeError, TradeRecord};

/// Entry type marker for trades.
const TRADE_MARKER: u8 = b't';

/// Closes the innermost entry.
const BLOCK_END: u8 = b']';

/// Separates fields and top-level elements.
const FIELD_DELIMITER: u8 = b',';

/// Distance from the trade marker to its first field: `t",`.
const TRADE_FIELDS_OFFSET: usize = 3;

/// Fields consumed from each trade block.
const TRADE_FIELD_COUNT: usize = 5;

/// Decode errors. Any of these discards the whole message.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Channel id could not be resolved.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Side marker was not `0` or `1`.
    #[error(transparent)]
    Side(#[from] SideError),

    /// Trade block had too few fields.
    #[error("trade block has {found} fields, expected at least {expected}", expected = TRADE_FIELD_COUNT)]
    FieldCount {
        /// Number of fields found.
        found: usize,
    },

    /// Price field is not a decimal number.
    #[error("invalid price {value:?}: {source}")]
    InvalidPrice {
        /// Raw field value.
        value: String,
        /// Parse failure.
        #[source]
        source: rust_decimal::Error,
    },

    /// Amount field is not a decimal number.
    #[error("invalid amount {value:?}: {source}")]
    InvalidAmount {
        /// Raw field value.
        value: String,
        /// Parse failure.
        #[source]
        source: rust_decimal::Error,
    },

    /// Timestamp field is not an integer.
    #[error("invalid timestamp {value:?}: {source}")]
    InvalidTimestamp {
        /// Raw field value.
        value: String,
        /// Parse failure.
        #[source]
        source: std::num::ParseIntError,
    },

    /// Timestamp does not fit a calendar date.
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),

    /// Trade block boundaries split a multi-byte character.
    #[error("malformed trade block at byte {offset}")]
    MalformedBlock {
        /// Byte offset of the block start.
        offset: usize,
    },

    /// Decoded fields violate trade invariants.
    #[error(transparent)]
    Trade(#[from] TradeError),
}

impl DecodeError {
    /// Stable label for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Registry(RegistryError::UnknownChannel(_)) => "unknown_channel",
            Self::Registry(_) => "registry",
            Self::Side(_) => "invalid_side",
            Self::FieldCount { .. } => "field_count",
            Self::InvalidPrice { .. } => "invalid_price",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InvalidTimestamp { .. } | Self::TimestampOutOfRange(_) => "invalid_timestamp",
            Self::MalformedBlock { .. } => "malformed_block",
            Self::Trade(_) => "invalid_trade",
        }
    }
}

/// Stateless decoder for Poloniex push messages.
#[derive(Debug, Clone)]
pub struct MessageDecoder {
    registry: Arc<PairRegistry>,
    sides: SideCodec,
}

impl MessageDecoder {
    /// Create a decoder that resolves channels through `registry`.
    #[must_use]
    pub const fn new(registry: Arc<PairRegistry>) -> Self {
        Self {
            registry,
            sides: SideCodec::new(),
        }
    }

    /// Decode every trade in one push message, in the order they appear.
    ///
    /// Messages without trade entries decode to an empty vector.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while building a trade. No partial
    /// results are returned.
    pub fn decode(&self, msg: &str) -> Result<Vec<TradeRecord>, DecodeError> {
        let mut trades = Vec::new();
        let mut channel_id: Option<&str> = None;
        let mut block_start: Option<usize> = None;

        for (i, &byte) in msg.as_bytes().iter().enumerate() {
            // The first element of the outer array is the channel id.
            if byte == FIELD_DELIMITER && i > 1 && channel_id.is_none() {
                channel_id = Some(msg.get(1..i).unwrap_or_default().trim());
            }

            match byte {
                TRADE_MARKER => block_start = Some(i + TRADE_FIELDS_OFFSET),
                BLOCK_END => {
                    if let Some(start) = block_start
                        && i > start
                    {
                        let block = msg
                            .get(start..i)
                            .ok_or(DecodeError::MalformedBlock { offset: start })?;
                        trades.push(self.build_trade(block, channel_id.unwrap_or_default())?);
                        block_start = None;
                    }
                }
                _ => {}
            }
        }

        Ok(trades)
    }

    /// Build one trade from the raw text between its marker and bracket.
    fn build_trade(&self, block: &str, channel_id: &str) -> Result<TradeRecord, DecodeError> {
        let pair = self.registry.pair_from_channel_id(channel_id)?;

        let fields: Vec<&str> = block.split(char::from(FIELD_DELIMITER)).collect();
        let [id, side, price, amount, timestamp, ..] = fields.as_slice() else {
            return Err(DecodeError::FieldCount {
                found: fields.len(),
            });
        };

        let id = trim_quotes(id);
        let side = self.sides.decode(side.trim())?;

        let price = parse_decimal(price).map_err(|source| DecodeError::InvalidPrice {
            value: (*price).to_string(),
            source,
        })?;
        let amount = parse_decimal(amount).map_err(|source| DecodeError::InvalidAmount {
            value: (*amount).to_string(),
            source,
        })?;

        let timestamp = parse_timestamp(timestamp)?;

        Ok(TradeRecord::new(id, pair, side, price, amount, timestamp)?)
    }
}

/// Strip surrounding whitespace and double quotes.
fn trim_quotes(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}

fn parse_decimal(raw: &str) -> Result<Decimal, rust_decimal::Error> {
    let value = trim_quotes(raw);
    Decimal::from_str(value).or_else(|err| Decimal::from_scientific(value).map_err(|_| err))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DecodeError> {
    let value = raw.trim();
    let secs = value
        .parse::<i64>()
        .map_err(|source| DecodeError::InvalidTimestamp {
            value: value.to_string(),
            source,
        })?;

    DateTime::from_timestamp(secs, 0).ok_or(DecodeError::TimestampOutOfRange(secs))
}

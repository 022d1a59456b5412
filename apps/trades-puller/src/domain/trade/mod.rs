//! Trade Types
//!
//! Canonical representation of a single executed trade, independent of the
//! wire format it was decoded from.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::pair::Pair;

// =============================================================================
// Trade Side
// =============================================================================

/// Direction the exchange booked a trade as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeSide {
    /// Taker bought.
    Buy,
    /// Taker sold.
    Sell,
    /// Unrecognised marker. Never coerced into a real side.
    Invalid,
}

impl TradeSide {
    /// Get the side name as rendered in output records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Trade Record
// =============================================================================

/// Errors raised when a trade record would violate its invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeError {
    /// Trade side was the `Invalid` sentinel.
    #[error("trade side must be BUY or SELL")]
    InvalidSide,

    /// Pair was the `Invalid` sentinel.
    #[error("trade pair must be a known pair")]
    InvalidPair,
}

/// A single trade execution.
///
/// Immutable once built. The pair and side are guaranteed to be real values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRecord {
    id: String,
    pair: Pair,
    side: TradeSide,
    price: Decimal,
    amount: Decimal,
    timestamp: DateTime<Utc>,
}

impl TradeRecord {
    /// Build a trade record.
    ///
    /// # Errors
    ///
    /// Returns an error if `pair` or `side` is the `Invalid` sentinel.
    pub fn new(
        id: impl Into<String>,
        pair: Pair,
        side: TradeSide,
        price: Decimal,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, TradeError> {
        if !pair.is_valid() {
            return Err(TradeError::InvalidPair);
        }
        if side == TradeSide::Invalid {
            return Err(TradeError::InvalidSide);
        }

        Ok(Self {
            id: id.into(),
            pair,
            side,
            price,
            amount,
            timestamp,
        })
    }

    /// Exchange-assigned trade id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Trading pair.
    #[must_use]
    pub const fn pair(&self) -> Pair {
        self.pair
    }

    /// Trade direction.
    #[must_use]
    pub const fn side(&self) -> TradeSide {
        self.side
    }

    /// Execution price.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Executed amount in the base currency.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Execution time, seconds resolution.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

// =============================================================================
// Output Record
// =============================================================================

/// Serializable output form of a trade, as handed to sinks.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "id": "42706057",
///   "pair": "BTC_USDT",
///   "price": 0.05567134,
///   "amount": 0.00181421,
///   "side": "BUY",
///   "timestamp": "2019-03-18T02:45:19Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentTrade {
    /// Trade id.
    pub id: String,
    /// Pair name.
    pub pair: String,
    /// Execution price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Executed amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// `BUY` or `SELL`.
    pub side: String,
    /// Execution time.
    pub timestamp: DateTime<Utc>,
}

impl From<&TradeRecord> for RecentTrade {
    fn from(trade: &TradeRecord) -> Self {
        Self {
            id: trade.id.clone(),
            pair: trade.pair.as_str().to_string(),
            price: trade.price,
            amount: trade.amount,
            side: trade.side.as_str().to_string(),
            timestamp: trade.timestamp,
        }
    }
}

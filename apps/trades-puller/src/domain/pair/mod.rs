//! Trading Pairs
//!
//! The closed set of trading pairs this service knows about, in the
//! service's own vocabulary. Exchange channel identifiers and subscription
//! tokens live in the Poloniex registry, not here.

use std::fmt;
use std::str::FromStr;

/// A logical trading instrument.
///
/// `Invalid` is an explicit "unset" sentinel. It never maps to an exchange
/// channel and a trade record cannot carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pair {
    /// Unset / unknown pair.
    #[default]
    Invalid,
    /// Bitcoin quoted in Tether.
    BtcUsdt,
    /// Tron quoted in Tether.
    TrxUsdt,
    /// Ether quoted in Tether.
    EthUsdt,
}

impl Pair {
    /// All valid pairs, in subscription order.
    pub const ALL: [Self; 3] = [Self::BtcUsdt, Self::TrxUsdt, Self::EthUsdt];

    /// Get the pair name (`BTC_USDT`, ...). The sentinel renders as `""`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Invalid => "",
            Self::BtcUsdt => "BTC_USDT",
            Self::TrxUsdt => "TRX_USDT",
            Self::EthUsdt => "ETH_USDT",
        }
    }

    /// Check if this is a real pair rather than the sentinel.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a pair name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trading pair: {0}")]
pub struct UnknownPair(pub String);

impl FromStr for Pair {
    type Err = UnknownPair;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_uppercase().replace('/', "_");
        Self::ALL
            .into_iter()
            .find(|pair| pair.as_str() == name)
            .ok_or_else(|| UnknownPair(s.to_string()))
    }
}

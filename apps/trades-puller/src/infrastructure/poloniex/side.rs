//! Side Codec
//!
//! Poloniex encodes trade direction as a single digit: `1` for buy, `0` for
//! sell. Anything else is rejected rather than defaulted.

use crate::domain::trade::TradeSide;

/// Wire marker for a buy.
pub const BUY_MARKER: &str = "1";

/// Wire marker for a sell.
pub const SELL_MARKER: &str = "0";

/// Side marker errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SideError {
    /// Marker is neither `0` nor `1`.
    #[error("invalid trade type: {0:?}")]
    InvalidMarker(String),
}

/// Decoder for the trade side marker.
#[derive(Debug, Default, Clone, Copy)]
pub struct SideCodec;

impl SideCodec {
    /// Create a new side codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a side marker. The caller is expected to have trimmed it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMarker` for anything other than `0` or `1`.
    pub fn decode(self, marker: &str) -> Result<TradeSide, SideError> {
        match marker {
            BUY_MARKER => Ok(TradeSide::Buy),
            SELL_MARKER => Ok(TradeSide::Sell),
            other => Err(SideError::InvalidMarker(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn decodes_known_markers() {
        let codec = SideCodec::new();
        assert_eq!(codec.decode("1").unwrap(), TradeSide::Buy);
        assert_eq!(codec.decode("0").unwrap(), TradeSide::Sell);
    }

    #[test_case("9" ; "unknown digit")]
    #[test_case("" ; "empty")]
    #[test_case("\"1\"" ; "quoted")]
    #[test_case(" 1" ; "untrimmed")]
    #[test_case("buy" ; "word")]
    fn rejects_everything_else(marker: &str) {
        assert_eq!(
            SideCodec::new().decode(marker),
            Err(SideError::InvalidMarker(marker.to_string()))
        );
    }
}

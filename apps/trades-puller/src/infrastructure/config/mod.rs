//! Configuration Module
//!
//! Environment-driven settings for the puller.

mod settings;

pub use settings::{ConfigError, DEFAULT_POLONIEX_HOST, FeedSettings, TradesPullerConfig};

//! Trades Puller Configuration Settings
//!
//! Configuration types for the puller, loaded from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `POLONIEX_HOST` | `api2.poloniex.com` |
//! | `TRADES_PULLER_PAIRS` | every registered pair |
//! | `TRADES_PULLER_OUTPUT` | `pretty` |
//! | `TRADES_PULLER_SHUTDOWN_TIMEOUT_SECS` | `10` |
//! | `TRADES_PULLER_RECEIVE_ERROR_PAUSE_MS` | `250` (must be > 0) |
//! | `TRADES_PULLER_METRICS_PORT` | `0` (disabled) |

use std::time::Duration;

use crate::domain::pair::{Pair, UnknownPair};
use crate::infrastructure::output::{OutputFormat, UnknownFormat};
use crate::infrastructure::poloniex::StreamLoopSettings;

/// Default push API host.
pub const DEFAULT_POLONIEX_HOST: &str = "api2.poloniex.com";

const HOST_VAR: &str = "POLONIEX_HOST";
const PAIRS_VAR: &str = "TRADES_PULLER_PAIRS";
const OUTPUT_VAR: &str = "TRADES_PULLER_OUTPUT";
const SHUTDOWN_TIMEOUT_VAR: &str = "TRADES_PULLER_SHUTDOWN_TIMEOUT_SECS";
const RECEIVE_ERROR_PAUSE_VAR: &str = "TRADES_PULLER_RECEIVE_ERROR_PAUSE_MS";
const METRICS_PORT_VAR: &str = "TRADES_PULLER_METRICS_PORT";

/// Feed connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    /// Push API host, without scheme.
    pub host: String,
    /// Pairs to subscribe, in order, without duplicates.
    pub pairs: Vec<Pair>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_POLONIEX_HOST.to_string(),
            pairs: Pair::ALL.to_vec(),
        }
    }
}

/// Complete puller configuration.
#[derive(Debug, Clone)]
pub struct TradesPullerConfig {
    /// Feed connection settings.
    pub feed: FeedSettings,
    /// Rendering of emitted trades.
    pub output: OutputFormat,
    /// Stream loop tuning.
    pub stream: StreamLoopSettings,
    /// Bound on waiting for the stream loop to finish after a signal.
    pub shutdown_timeout: Duration,
    /// Prometheus listener port (0 = disabled).
    pub metrics_port: u16,
}

impl Default for TradesPullerConfig {
    fn default() -> Self {
        Self {
            feed: FeedSettings::default(),
            output: OutputFormat::default(),
            stream: StreamLoopSettings::default(),
            shutdown_timeout: Duration::from_secs(10),
            metrics_port: 0,
        }
    }
}

impl TradesPullerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is empty or cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is empty or cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = match lookup(HOST_VAR) {
            Some(host) if host.trim().is_empty() => {
                return Err(ConfigError::EmptyValue(HOST_VAR.to_string()));
            }
            Some(host) => host.trim().to_string(),
            None => defaults.feed.host,
        };

        let pairs = match lookup(PAIRS_VAR) {
            Some(raw) => parse_pairs(&raw)?,
            None => defaults.feed.pairs,
        };

        let output = match lookup(OUTPUT_VAR) {
            Some(raw) => raw.parse()?,
            None => defaults.output,
        };

        let shutdown_timeout = parse_duration_secs(
            lookup(SHUTDOWN_TIMEOUT_VAR),
            SHUTDOWN_TIMEOUT_VAR,
            defaults.shutdown_timeout,
        )?;

        let receive_error_pause = parse_duration_millis(
            lookup(RECEIVE_ERROR_PAUSE_VAR),
            RECEIVE_ERROR_PAUSE_VAR,
            defaults.stream.receive_error_pause,
        )?;

        let metrics_port = match lookup(METRICS_PORT_VAR) {
            Some(raw) => parse_number(&raw, METRICS_PORT_VAR)?,
            None => defaults.metrics_port,
        };

        Ok(Self {
            feed: FeedSettings { host, pairs },
            output,
            stream: StreamLoopSettings {
                receive_error_pause,
            },
            shutdown_timeout,
            metrics_port,
        })
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),

    /// Pair list names a pair that does not exist.
    #[error("invalid {var}: {0}", var = PAIRS_VAR)]
    UnknownPair(#[from] UnknownPair),

    /// Output format is not recognised.
    #[error("invalid {var}: {0}", var = OUTPUT_VAR)]
    UnknownFormat(#[from] UnknownFormat),

    /// Value is malformed or out of range.
    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },
}

/// Parse a comma-separated pair list. Blank entries and repeats are skipped.
fn parse_pairs(raw: &str) -> Result<Vec<Pair>, ConfigError> {
    let mut pairs = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let pair: Pair = name.parse()?;
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }

    if pairs.is_empty() {
        return Err(ConfigError::EmptyValue(PAIRS_VAR.to_string()));
    }
    Ok(pairs)
}

fn parse_number<N: std::str::FromStr>(raw: &str, key: &str) -> Result<N, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_duration_secs(
    raw: Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    raw.map_or(Ok(default), |v| {
        parse_number::<u64>(&v, key).map(Duration::from_secs)
    })
}

/// Zero is rejected: a closed feed fails every receive at once.
fn parse_duration_millis(
    raw: Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let Some(v) = raw else {
        return Ok(default);
    };

    match parse_number::<u64>(&v, key)? {
        0 => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: v,
        }),
        millis => Ok(Duration::from_millis(millis)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = TradesPullerConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.feed.host, "api2.poloniex.com");
        assert_eq!(config.feed.pairs, Pair::ALL.to_vec());
        assert_eq!(config.output, OutputFormat::Pretty);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
        assert_eq!(config.stream.receive_error_pause, Duration::from_millis(250));
        assert_eq!(config.metrics_port, 0);
    }

    #[test]
    fn reads_every_variable() {
        let config = TradesPullerConfig::from_lookup(lookup(&[
            ("POLONIEX_HOST", " ws.example.test "),
            ("TRADES_PULLER_PAIRS", "eth_usdt, BTC/USDT"),
            ("TRADES_PULLER_OUTPUT", "compact"),
            ("TRADES_PULLER_SHUTDOWN_TIMEOUT_SECS", "3"),
            ("TRADES_PULLER_RECEIVE_ERROR_PAUSE_MS", "40"),
            ("TRADES_PULLER_METRICS_PORT", "9464"),
        ]))
        .unwrap();

        assert_eq!(config.feed.host, "ws.example.test");
        assert_eq!(config.feed.pairs, vec![Pair::EthUsdt, Pair::BtcUsdt]);
        assert_eq!(config.output, OutputFormat::Compact);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
        assert_eq!(config.stream.receive_error_pause, Duration::from_millis(40));
        assert_eq!(config.metrics_port, 9464);
    }

    #[test]
    fn pair_list_drops_blanks_and_repeats() {
        assert_eq!(
            parse_pairs("TRX_USDT,, trx_usdt ,ETH_USDT,").unwrap(),
            vec![Pair::TrxUsdt, Pair::EthUsdt]
        );
    }

    #[test]
    fn unknown_pair_is_rejected() {
        let err = TradesPullerConfig::from_lookup(lookup(&[(
            "TRADES_PULLER_PAIRS",
            "BTC_USDT,DOGE_USDT",
        )]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownPair(UnknownPair("DOGE_USDT".to_string()))
        );
    }

    #[test]
    fn empty_values_are_rejected() {
        assert_eq!(
            TradesPullerConfig::from_lookup(lookup(&[("POLONIEX_HOST", "  ")])).unwrap_err(),
            ConfigError::EmptyValue("POLONIEX_HOST".to_string())
        );
        assert_eq!(
            TradesPullerConfig::from_lookup(lookup(&[("TRADES_PULLER_PAIRS", " , ")]))
                .unwrap_err(),
            ConfigError::EmptyValue("TRADES_PULLER_PAIRS".to_string())
        );
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = TradesPullerConfig::from_lookup(lookup(&[(
            "TRADES_PULLER_METRICS_PORT",
            "70000",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "TRADES_PULLER_METRICS_PORT"));
    }

    #[test]
    fn zero_receive_error_pause_is_rejected() {
        let err = TradesPullerConfig::from_lookup(lookup(&[(
            "TRADES_PULLER_RECEIVE_ERROR_PAUSE_MS",
            "0",
        )]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "TRADES_PULLER_RECEIVE_ERROR_PAUSE_MS".to_string(),
                value: "0".to_string(),
            }
        );
    }

    #[test]
    fn unknown_output_is_rejected() {
        let err =
            TradesPullerConfig::from_lookup(lookup(&[("TRADES_PULLER_OUTPUT", "xml")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFormat(_)));
    }
}

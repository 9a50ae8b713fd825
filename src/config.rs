//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable support for credentials and endpoint URLs.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ScalperError;
use crate::quick_flip::{ProfitTarget, StopRule, StrategyConfig};
use crate::Symbol;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub market: MarketConfig,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

fn default_symbols() -> Vec<String> {
    ["AAPL", "MSFT", "CVX", "MRK", "WFC", "MCD", "VZ", "QQQ", "UNH", "AMD"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.apply_env();
        Ok(config)
    }

    /// Endpoint URLs and the executor token come from the environment when set
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("SIGNAL_ENDPOINT_URL") {
            self.publisher.endpoint_url = Some(url);
        }
        if let Ok(url) = std::env::var("ORDER_EXECUTOR_URL") {
            self.publisher.order_executor_url = Some(url);
        }
        if let Ok(token) = std::env::var("ORDER_EXECUTOR_TOKEN") {
            self.publisher.order_executor_token = Some(token);
        }
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.symbols.iter().map(Symbol::new).collect()
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> std::result::Result<(), ScalperError> {
        if self.symbols.is_empty() {
            return Err(ScalperError::InvalidConfiguration("no symbols configured".into()));
        }
        self.strategy.validate()?;
        self.market.timezone()?;
        if self.market.scan_interval_minutes == 0 {
            return Err(ScalperError::InvalidConfiguration(
                "scan_interval_minutes must be at least 1".into(),
            ));
        }
        let min_lookback = DataConfig::min_lookback_days(self.strategy.atr_period);
        if self.data.daily_lookback_days < min_lookback {
            return Err(ScalperError::InvalidConfiguration(format!(
                "daily_lookback_days ({}) is too short for atr_period ({}); need at least {} calendar days",
                self.data.daily_lookback_days, self.strategy.atr_period, min_lookback
            )));
        }
        if self.publisher.position_size_usd <= 0.0 {
            return Err(ScalperError::InvalidConfiguration(
                "position_size_usd must be positive".into(),
            ));
        }
        if self.backtest.starting_balance <= 0.0 {
            return Err(ScalperError::InvalidConfiguration(
                "starting_balance must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Exchange session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// IANA zone all bar timestamps are interpreted in
    pub timezone: String,
    /// Minutes between live scans
    pub scan_interval_minutes: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig {
            timezone: "America/New_York".to_string(),
            scan_interval_minutes: 5,
        }
    }
}

impl MarketConfig {
    pub fn timezone(&self) -> std::result::Result<Tz, ScalperError> {
        self.timezone.parse::<Tz>().map_err(|e| {
            ScalperError::InvalidConfiguration(format!("unknown timezone '{}': {}", self.timezone, e))
        })
    }
}

/// Market data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Csv,
    Alpaca,
}

impl std::str::FromStr for DataSource {
    type Err = ScalperError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(DataSource::Csv),
            "alpaca" => Ok(DataSource::Alpaca),
            _ => Err(ScalperError::InvalidConfiguration(format!(
                "Unknown data source: {}. Use 'csv' or 'alpaca'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Csv => write!(f, "csv"),
            DataSource::Alpaca => write!(f, "alpaca"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub provider: DataSource,
    /// Directory holding `{SYMBOL}_{interval}.csv` files
    pub data_dir: String,
    /// Calendar days of daily bars fetched ahead of the first session
    pub daily_lookback_days: i64,
    /// Alpaca feed (`iex` on free accounts, `sip` with a subscription)
    pub alpaca_feed: String,
}

/// Market holidays that can fall inside one lookback window
const HOLIDAY_SLACK_DAYS: i64 = 5;

impl DataConfig {
    /// Calendar days needed to cover `atr_period` trading days
    pub fn min_lookback_days(atr_period: usize) -> i64 {
        let trading = atr_period as i64;
        (trading * 7 + 4) / 5 + HOLIDAY_SLACK_DAYS
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            provider: DataSource::Csv,
            data_dir: "data".to_string(),
            daily_lookback_days: 60,
            alpaca_feed: "iex".to_string(),
        }
    }
}

/// Signal sink and order executor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_executor_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub order_executor_token: Option<String>,
    /// Submit bracket orders in addition to publishing the signal
    #[serde(default)]
    pub trading_enabled: bool,
    /// Notional per bracket order
    pub position_size_usd: f64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        PublisherConfig {
            endpoint_url: None,
            order_executor_url: None,
            order_executor_token: None,
            trading_enabled: false,
            position_size_usd: 100.0,
        }
    }
}

/// Backtest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Calendar days replayed when no explicit range is given
    pub days: i64,
    pub results_dir: String,
    /// Balance compounded by the leaderboard and portfolio runs
    pub starting_balance: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            days: 30,
            results_dir: "results".to_string(),
            starting_balance: 500.0,
        }
    }
}

/// Grid values for the parameter search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub capital_per_trade: f64,
    pub leverage: f64,
    pub liquidity_thresholds: Vec<f64>,
    pub profit_targets: Vec<ProfitTarget>,
    pub stop_rules: Vec<StopRule>,
    pub scan_ends: Vec<NaiveTime>,
    pub top_n: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let at = |h| NaiveTime::from_hms_opt(h, 45, 0).unwrap_or(NaiveTime::MIN);
        OptimizerConfig {
            capital_per_trade: 1000.0,
            leverage: 5.0,
            liquidity_thresholds: vec![0.15, 0.25, 0.35],
            profit_targets: vec![
                ProfitTarget::Box,
                ProfitTarget::RiskMultiple { multiple: 1.0 },
                ProfitTarget::RiskMultiple { multiple: 2.0 },
            ],
            stop_rules: vec![StopRule::Tight, StopRule::Wide { box_fraction: 0.1 }],
            scan_ends: vec![at(10), at(11), at(12)],
            top_n: 10,
        }
    }
}

impl OptimizerConfig {
    pub fn position_notional(&self) -> f64 {
        self.capital_per_trade * self.leverage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "symbols": ["aapl", "QQQ"],
        "strategy": { "scan_end": "11:00:00" }
    }"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = serde_json::from_str(MINIMAL).unwrap();

        assert_eq!(config.symbols()[0].as_str(), "AAPL");
        assert_eq!(config.market.scan_interval_minutes, 5);
        assert_eq!(config.data.provider, DataSource::Csv);
        assert_eq!(config.publisher.position_size_usd, 100.0);
        assert_eq!(config.optimizer.position_notional(), 5000.0);
        assert_eq!(config.optimizer.scan_ends.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_scan_end_fails_to_parse() {
        let json = r#"{ "symbols": ["AAPL"], "strategy": {} }"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn test_bad_timezone_rejected() {
        let mut config: Config = serde_json::from_str(MINIMAL).unwrap();
        config.market.timezone = "Mars/Olympus".into();
        assert!(matches!(
            config.validate(),
            Err(ScalperError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_lookback_counts_calendar_days() {
        assert_eq!(DataConfig::min_lookback_days(14), 25);

        let mut config: Config = serde_json::from_str(MINIMAL).unwrap();
        config.data.daily_lookback_days = 16;
        assert!(matches!(
            config.validate(),
            Err(ScalperError::InvalidConfiguration(_))
        ));

        config.data.daily_lookback_days = 25;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_data_source_parse() {
        assert_eq!("Alpaca".parse::<DataSource>().unwrap(), DataSource::Alpaca);
        assert!("yahoo".parse::<DataSource>().is_err());
    }

    #[test]
    fn test_token_not_serialized() {
        let mut config: Config = serde_json::from_str(MINIMAL).unwrap();
        config.publisher.order_executor_token = Some("hunter2".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }
}

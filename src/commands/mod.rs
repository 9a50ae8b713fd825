//! CLI command implementations

pub mod backtest;
pub mod download;
pub mod leaderboard;
pub mod live;
pub mod optimize;
pub mod portfolio;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use quick_flip_scalper::alpaca::{AlpacaCredentials, AlpacaProvider};
use quick_flip_scalper::config::DataSource;
use quick_flip_scalper::data::{CsvProvider, DataProvider};
use quick_flip_scalper::{Config, Symbol};
use tracing::info;

/// Load, apply overrides from the environment, and validate
pub(crate) fn load_config(path: &str) -> Result<Config> {
    let config = Config::from_file(path)?;
    config.validate()?;
    info!("Loaded configuration from: {}", path);
    Ok(config)
}

pub(crate) fn build_provider(config: &Config, source: Option<DataSource>) -> Result<Box<dyn DataProvider>> {
    let tz = config.market.timezone()?;
    let provider: Box<dyn DataProvider> = match source.unwrap_or(config.data.provider) {
        DataSource::Csv => Box::new(CsvProvider::new(&config.data.data_dir, tz)),
        DataSource::Alpaca => {
            let credentials = AlpacaCredentials::from_env()?;
            Box::new(AlpacaProvider::new(&credentials, &config.data.alpaca_feed, tz)?)
        }
    };
    info!("Data provider: {}", provider.name());
    Ok(provider)
}

/// Explicit symbols win over the configured list
pub(crate) fn resolve_symbols(explicit: &[String], config: &Config) -> Vec<Symbol> {
    if explicit.is_empty() {
        config.symbols()
    } else {
        explicit
            .iter()
            .flat_map(|s| s.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Symbol::new)
            .collect()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", raw))
}

/// `[start, end]` from explicit dates, else the last `days` calendar days up to today
pub(crate) fn date_range(
    start: Option<&str>,
    end: Option<&str>,
    days: i64,
    tz: Tz,
) -> Result<(NaiveDate, NaiveDate)> {
    let end = match end {
        Some(raw) => parse_date(raw)?,
        None => chrono::Utc::now().with_timezone(&tz).date_naive(),
    };
    let start = match start {
        Some(raw) => parse_date(raw)?,
        None => end - Duration::days(days),
    };
    anyhow::ensure!(start <= end, "start date {} is after end date {}", start, end);
    Ok((start, end))
}

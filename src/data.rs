//! Data loading and management
//!
//! The [`DataProvider`] seam plus the CSV-backed provider used for offline
//! backtests. Files follow the `{SYMBOL}_{interval}.csv` layout written by
//! the download command.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::ProviderError;
use crate::types::{Bar, BarSeries, Interval, Symbol};

/// Source of OHLCV bars.
///
/// Implementations must return `Ok` with an empty series when the market
/// simply has no bars for the range, and an error only when the source
/// itself failed.
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Bars for `symbol` whose local date falls in `[start, end]`
    fn fetch_bars(
        &self,
        symbol: &Symbol,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BarSeries, ProviderError>;
}

// =============================================================================
// CSV Data Loading
// =============================================================================

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a CSV timestamp into exchange-local time.
///
/// Strings carrying an offset are converted; naive strings are read as local
/// wall-clock time; a bare date means local midnight.
pub fn parse_timestamp(raw: &str, tz: Tz) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&tz));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&tz));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return tz.from_local_datetime(&naive).earliest();
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
}

fn parse_field(record: &csv::StringRecord, idx: usize, name: &str, row: usize) -> Result<f64, ProviderError> {
    record
        .get(idx)
        .ok_or_else(|| ProviderError::Parse(format!("row {}: missing {} column", row, name)))?
        .trim()
        .parse()
        .map_err(|e| ProviderError::Parse(format!("row {}: bad {}: {}", row, name, e)))
}

/// Load `datetime,open,high,low,close,volume` rows into a series.
///
/// Rows failing OHLC validation are skipped with a warning; unparseable rows
/// fail the whole load.
pub fn load_csv(
    path: impl AsRef<Path>,
    symbol: &Symbol,
    interval: Interval,
    tz: Tz,
) -> Result<BarSeries, ProviderError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ProviderError::NotFound(path.display().to_string()));
    }
    let mut reader = csv::Reader::from_path(path)?;

    let mut bars = Vec::new();
    let mut skipped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        let record = result?;

        let raw_time = record
            .get(0)
            .ok_or_else(|| ProviderError::Parse(format!("row {}: missing datetime column", row)))?;
        let timestamp = parse_timestamp(raw_time, tz)
            .ok_or_else(|| ProviderError::Parse(format!("row {}: bad datetime '{}'", row, raw_time)))?;

        let open = parse_field(&record, 1, "open", row)?;
        let high = parse_field(&record, 2, "high", row)?;
        let low = parse_field(&record, 3, "low", row)?;
        let close = parse_field(&record, 4, "close", row)?;
        let volume = parse_field(&record, 5, "volume", row)?;

        match Bar::new(timestamp, open, high, low, close, volume) {
            Ok(bar) => bars.push(bar),
            Err(e) => {
                warn!("{} row {}: skipping invalid bar: {}", path.display(), row, e);
                skipped += 1;
            }
        }
    }

    let series = BarSeries::from_unsorted(symbol.clone(), interval, bars);
    debug!(
        "Loaded {} {} bars for {} from {} ({} skipped)",
        series.len(),
        interval,
        symbol,
        path.display(),
        skipped
    );
    Ok(series)
}

/// Save a series in the layout [`load_csv`] reads
pub fn save_csv(series: &BarSeries, path: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create data directory")?;
    }

    let mut writer = csv::Writer::from_path(path).context("Failed to create output file")?;
    writer.write_record(["datetime", "open", "high", "low", "close", "volume"])?;
    for bar in series.bars() {
        writer.write_record(&[
            bar.timestamp.format("%Y-%m-%d %H:%M:%S%:z").to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])?;
    }
    writer.flush()?;

    info!("Saved {} rows to {}", series.len(), path.display());
    Ok(path.to_path_buf())
}

/// File name for a symbol/interval pair
pub fn csv_file_name(symbol: &Symbol, interval: Interval) -> String {
    format!("{}_{}.csv", symbol.as_str(), interval)
}

/// Reads `{data_dir}/{SYMBOL}_{interval}.csv`
#[derive(Debug, Clone)]
pub struct CsvProvider {
    data_dir: PathBuf,
    timezone: Tz,
}

impl CsvProvider {
    pub fn new(data_dir: impl AsRef<Path>, timezone: Tz) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            timezone,
        }
    }

    pub fn path_for(&self, symbol: &Symbol, interval: Interval) -> PathBuf {
        self.data_dir.join(csv_file_name(symbol, interval))
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_bars(
        &self,
        symbol: &Symbol,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BarSeries, ProviderError> {
        let series = load_csv(self.path_for(symbol, interval), symbol, interval, self.timezone)?;
        let bars: Vec<Bar> = series
            .bars()
            .iter()
            .filter(|b| b.date() >= start && b.date() <= end)
            .cloned()
            .collect();
        Ok(BarSeries::from_unsorted(symbol.clone(), interval, bars))
    }
}

// =============================================================================
// Per-symbol bundle
// =============================================================================

/// Every series one symbol needs for a run
#[derive(Debug, Clone)]
pub struct SymbolData {
    pub daily: BarSeries,
    /// Absent when the provider has no genuine 15-minute bars
    pub fifteen: Option<BarSeries>,
    pub five: BarSeries,
}

impl SymbolData {
    /// Fetch daily history (with ATR lookback) plus intraday bars.
    ///
    /// A missing 15-minute source is tolerated; the box then falls back to
    /// 5-minute aggregation.
    pub fn fetch(
        provider: &dyn DataProvider,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
        daily_lookback_days: i64,
    ) -> Result<Self, ProviderError> {
        let daily_start = start - chrono::Duration::days(daily_lookback_days);
        let daily = provider.fetch_bars(symbol, Interval::Daily, daily_start, end)?;
        let five = provider.fetch_bars(symbol, Interval::FiveMinute, start, end)?;

        let fifteen = match provider.fetch_bars(symbol, Interval::FifteenMinute, start, end) {
            Ok(series) if !series.is_empty() => Some(series),
            Ok(_) => None,
            Err(e @ (ProviderError::NotFound(_) | ProviderError::UnsupportedInterval(_))) => {
                debug!("{}: no 15m bars ({}), using 5m box", symbol, e);
                None
            }
            Err(e) => return Err(e),
        };

        info!(
            "{}: {} daily, {} 15m, {} 5m bars from {}",
            symbol,
            daily.len(),
            fifteen.as_ref().map_or(0, BarSeries::len),
            five.len(),
            provider.name()
        );

        Ok(Self {
            daily,
            fifteen,
            five,
        })
    }

    /// Trading dates present in the 5-minute series
    pub fn trading_dates(&self) -> Vec<NaiveDate> {
        self.five.trading_dates()
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Core data types used across the scalper

use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ScalperError;

/// Validation errors for bar data
#[derive(Debug, Error)]
pub enum BarValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(f64),

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("timestamps must be strictly increasing: {current} follows {previous}")]
    OutOfOrder { previous: String, current: String },
}

/// OHLCV bar stamped in exchange-local time (bar open)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub timestamp: DateTime<Tz>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Create a new bar with validation
    pub fn new(
        timestamp: DateTime<Tz>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, BarValidationError> {
        let bar = Self::new_unchecked(timestamp, open, high, low, close, volume);
        bar.validate()?;
        Ok(bar)
    }

    /// Create a bar without validation (for trusted sources or when validation is done separately)
    pub fn new_unchecked(
        timestamp: DateTime<Tz>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Validate the bar data
    pub fn validate(&self) -> Result<(), BarValidationError> {
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(BarValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(BarValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.volume < 0.0 {
            return Err(BarValidationError::NegativeVolume(self.volume));
        }

        if self.open < self.low || self.open > self.high {
            return Err(BarValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(BarValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    /// Exchange-local trading date of the bar
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Exchange-local wall-clock time of the bar open
    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Bar granularity supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "15m")]
    FifteenMinute,
    #[serde(rename = "5m")]
    FiveMinute,
}

impl Interval {
    /// Length of one bar
    pub fn duration(self) -> Duration {
        match self {
            Interval::Daily => Duration::days(1),
            Interval::FifteenMinute => Duration::minutes(15),
            Interval::FiveMinute => Duration::minutes(5),
        }
    }

    /// Short label used in file names (`AAPL_5m.csv`)
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::FifteenMinute => "15m",
            Interval::FiveMinute => "5m",
        }
    }
}

impl std::str::FromStr for Interval {
    type Err = ScalperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" | "1D" | "1Day" => Ok(Interval::Daily),
            "15m" | "15Min" => Ok(Interval::FifteenMinute),
            "5m" | "5Min" => Ok(Interval::FiveMinute),
            _ => Err(ScalperError::InvalidConfiguration(format!(
                "unsupported interval '{}'. Use '1d', '15m' or '5m'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered bars for one symbol at one granularity.
///
/// Timestamps are strictly increasing; the series is read-only once built.
#[derive(Debug, Clone)]
pub struct BarSeries {
    symbol: Symbol,
    interval: Interval,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Build a series, rejecting duplicate or out-of-order timestamps
    pub fn new(symbol: Symbol, interval: Interval, bars: Vec<Bar>) -> Result<Self, BarValidationError> {
        if let Some(w) = bars.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(BarValidationError::OutOfOrder {
                previous: w[0].timestamp.to_rfc3339(),
                current: w[1].timestamp.to_rfc3339(),
            });
        }
        Ok(Self {
            symbol,
            interval,
            bars,
        })
    }

    /// Sort and de-duplicate raw provider output before building the series
    pub fn from_unsorted(symbol: Symbol, interval: Interval, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Self {
            symbol,
            interval,
            bars,
        }
    }

    pub fn empty(symbol: Symbol, interval: Interval) -> Self {
        Self {
            symbol,
            interval,
            bars: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bars whose local date equals `date`
    pub fn on_date(&self, date: NaiveDate) -> &[Bar] {
        let start = self.bars.partition_point(|b| b.date() < date);
        let end = self.bars.partition_point(|b| b.date() <= date);
        &self.bars[start..end]
    }

    /// Bars dated strictly before `date`
    pub fn before_date(&self, date: NaiveDate) -> &[Bar] {
        let end = self.bars.partition_point(|b| b.date() < date);
        &self.bars[..end]
    }

    /// Distinct trading dates in chronological order
    pub fn trading_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.bars.iter().map(Bar::date).collect();
        dates.dedup();
        dates
    }

    /// Bars whose interval has fully elapsed at `now`
    pub fn completed_at(&self, now: DateTime<Tz>) -> &[Bar] {
        let step = self.interval.duration();
        let end = self.bars.partition_point(|b| b.timestamp + step <= now);
        &self.bars[..end]
    }
}

/// Ticker symbol using Arc<str> for cheap cloning
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(std::sync::Arc::from(s.as_ref().to_uppercase().as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => f.pad("LONG"),
            Direction::Short => f.pad("SHORT"),
        }
    }
}

/// Candlestick reversal pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    Hammer,
    InvertedHammer,
    BullishEngulfing,
    BearishEngulfing,
}

impl Pattern {
    /// Direction this pattern signals a reversal toward
    pub fn direction(self) -> Direction {
        match self {
            Pattern::Hammer | Pattern::BullishEngulfing => Direction::Long,
            Pattern::InvertedHammer | Pattern::BearishEngulfing => Direction::Short,
        }
    }

    /// Two-bar patterns need the previous bar for parameterization
    pub fn uses_previous(self) -> bool {
        matches!(self, Pattern::BullishEngulfing | Pattern::BearishEngulfing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Pattern::Hammer => "hammer",
            Pattern::InvertedHammer => "inverted_hammer",
            Pattern::BullishEngulfing => "bullish_engulfing",
            Pattern::BearishEngulfing => "bearish_engulfing",
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Opening-range reference levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionBox {
    pub high: f64,
    pub low: f64,
}

/// Where a bar sits relative to the box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxZone {
    /// Low pierced the box low: only long reversals are considered
    LongZone,
    /// High pierced the box high: only short reversals are considered
    ShortZone,
    InsideBox,
}

impl SessionBox {
    pub fn new(high: f64, low: f64) -> Result<Self, ScalperError> {
        if high < low {
            return Err(ScalperError::InsufficientData(format!(
                "box high {} below box low {}",
                high, low
            )));
        }
        Ok(Self { high, low })
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Breakout classification; strict comparisons, low side checked first
    pub fn zone(&self, bar: &Bar) -> BoxZone {
        if bar.low < self.low {
            BoxZone::LongZone
        } else if bar.high > self.high {
            BoxZone::ShortZone
        } else {
            BoxZone::InsideBox
        }
    }
}

/// Entry/stop/target in full precision, before rounding to cents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
}

/// Signal emitted by the session scanner. Prices are rounded to cents;
/// `levels` keeps the unrounded values the simulator compares against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeCandidate {
    pub symbol: Symbol,
    pub direction: Direction,
    pub pattern: Pattern,
    pub entry_price: Money,
    pub stop_loss: Money,
    pub target_price: Money,
    pub box_high: Money,
    pub box_low: Money,
    pub atr: Money,
    /// Open time of the bar that completed the pattern
    pub timestamp: DateTime<Tz>,
    #[serde(skip)]
    pub levels: TradeLevels,
}

/// Final state of a simulated trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Win,
    Loss,
    /// No bar followed the entry
    Open,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Win => f.pad("WIN"),
            Outcome::Loss => f.pad("LOSS"),
            Outcome::Open => f.pad("OPEN"),
        }
    }
}

/// Why a simulated trade closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    StopLoss,
    Target,
    SessionClose,
}

/// Result of replaying a candidate over the bars after entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeOutcome {
    pub entry_time: DateTime<Tz>,
    pub exit_time: Option<DateTime<Tz>>,
    pub exit_price: Option<Money>,
    pub exit_reason: Option<ExitReason>,
    pub outcome: Outcome,
    /// Price units per share, positive when favorable
    pub pnl: Money,
}

/// One row of the backtest trade log
#[derive(Debug, Clone, Serialize)]
pub struct TradeRecord {
    #[serde(skip)]
    pub symbol: Symbol,
    pub date: NaiveDate,
    #[serde(with = "local_time")]
    pub entry_time: DateTime<Tz>,
    #[serde(with = "local_time::option")]
    pub exit_time: Option<DateTime<Tz>>,
    pub direction: Direction,
    pub pattern: Pattern,
    pub entry_price: Money,
    pub stop_loss: Money,
    pub target: Money,
    pub exit_price: Option<Money>,
    pub box_high: Money,
    pub box_low: Money,
    pub atr: Money,
    pub outcome: Outcome,
    pub pnl: Money,
}

impl TradeRecord {
    pub fn new(candidate: &TradeCandidate, outcome: &TradeOutcome) -> Self {
        Self {
            symbol: candidate.symbol.clone(),
            date: candidate.timestamp.date_naive(),
            entry_time: outcome.entry_time,
            exit_time: outcome.exit_time,
            direction: candidate.direction,
            pattern: candidate.pattern,
            entry_price: candidate.entry_price,
            stop_loss: candidate.stop_loss,
            target: candidate.target_price,
            exit_price: outcome.exit_price,
            box_high: candidate.box_high,
            box_low: candidate.box_low,
            atr: candidate.atr,
            outcome: outcome.outcome,
            pnl: outcome.pnl,
        }
    }
}

/// `%Y-%m-%d %H:%M:%S` in exchange-local time for report columns
pub mod local_time {
    use chrono::DateTime;
    use chrono_tz::Tz;
    use serde::Serializer;

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(value: &DateTime<Tz>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S>(value: &Option<DateTime<Tz>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(dt) => serializer.collect_str(&dt.format(FORMAT)),
                None => serializer.serialize_none(),
            }
        }
    }
}

// ============================================================================
// Money Type - Precise Decimal Arithmetic for Monetary Values
// ============================================================================

use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Money type for emitted prices and P&L.
///
/// Wraps `rust_decimal::Decimal` so that values handed to the broker, the
/// signal sink and the trade log are exact to the cent.
///
/// # Example
/// ```
/// use quick_flip_scalper::Money;
/// let entry = Money::from_f64(101.2049).round_dp(2);
/// assert_eq!(entry.to_f64(), 101.2);
/// ```
#[derive(Debug, Clone, Copy, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::str")] Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Create from f64; NaN and infinities collapse to zero
    pub fn from_f64(value: f64) -> Self {
        Money(Decimal::try_from(value).unwrap_or_else(|_| {
            if value.is_nan() || value.is_infinite() {
                Decimal::ZERO
            } else {
                Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
            }
        }))
    }

    /// Round an f64 price to cents (banker's rounding, as the decimal crate does)
    pub fn cents(value: f64) -> Self {
        Self::from_f64(value).round_dp(2)
    }

    pub fn to_f64(self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        self.0.to_f64().unwrap_or(0.0)
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn round_dp(self, dp: u32) -> Self {
        Money(self.0.round_dp(dp))
    }

    pub fn inner(self) -> Decimal {
        self.0
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Money {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl std::hash::Hash for Money {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul for Money {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Money(self.0 * rhs.0)
    }
}

impl Div for Money {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        if rhs.0.is_zero() {
            Money::ZERO
        } else {
            Money(self.0 / rhs.0)
        }
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl From<f64> for Money {
    fn from(value: f64) -> Self {
        Money::from_f64(value)
    }
}

impl From<Money> for f64 {
    fn from(value: Money) -> Self {
        value.to_f64()
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> std::iter::Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;
    use rust_decimal_macros::dec;

    fn bar_at(h: u32, m: u32, low: f64, high: f64) -> Bar {
        let ts = New_York.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap();
        Bar::new_unchecked(ts, low, high, low, high, 100.0)
    }

    #[test]
    fn test_bar_validation_rejects_inverted_range() {
        let ts = New_York.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap();
        let err = Bar::new(ts, 100.0, 99.0, 101.0, 100.0, 10.0).unwrap_err();
        assert!(matches!(err, BarValidationError::HighLessThanLow { .. }));
    }

    #[test]
    fn test_series_rejects_duplicate_timestamps() {
        let a = bar_at(9, 30, 100.0, 101.0);
        let b = bar_at(9, 30, 100.0, 101.0);
        let result = BarSeries::new(Symbol::new("AAPL"), Interval::FiveMinute, vec![a, b]);
        assert!(matches!(result, Err(BarValidationError::OutOfOrder { .. })));
    }

    #[test]
    fn test_series_date_slicing() {
        let d1 = New_York.with_ymd_and_hms(2025, 3, 7, 9, 30, 0).unwrap();
        let d2 = New_York.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap();
        let bars = vec![
            Bar::new_unchecked(d1, 1.0, 1.0, 1.0, 1.0, 0.0),
            Bar::new_unchecked(d2, 2.0, 2.0, 2.0, 2.0, 0.0),
            Bar::new_unchecked(d2 + Duration::minutes(5), 3.0, 3.0, 3.0, 3.0, 0.0),
        ];
        let series = BarSeries::new(Symbol::new("aapl"), Interval::FiveMinute, bars).unwrap();

        assert_eq!(series.symbol().as_str(), "AAPL");
        assert_eq!(series.on_date(d2.date_naive()).len(), 2);
        assert_eq!(series.before_date(d2.date_naive()).len(), 1);
        assert_eq!(series.trading_dates(), vec![d1.date_naive(), d2.date_naive()]);
    }

    #[test]
    fn test_completed_bars_exclude_forming_bar() {
        let bars = vec![
            bar_at(9, 45, 100.0, 101.0),
            bar_at(9, 50, 100.0, 101.0),
            bar_at(9, 55, 100.0, 101.0),
        ];
        let series = BarSeries::new(Symbol::new("AAPL"), Interval::FiveMinute, bars).unwrap();
        let now = New_York.with_ymd_and_hms(2025, 3, 10, 9, 57, 30).unwrap();
        // 09:55 bar is still forming
        assert_eq!(series.completed_at(now).len(), 2);
        let boundary = New_York.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        assert_eq!(series.completed_at(boundary).len(), 3);
    }

    #[test]
    fn test_interval_parsing() {
        assert_eq!("15Min".parse::<Interval>().unwrap(), Interval::FifteenMinute);
        assert_eq!("1d".parse::<Interval>().unwrap(), Interval::Daily);
        let err = "1h".parse::<Interval>().unwrap_err();
        assert!(matches!(err, ScalperError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_box_zone_boundaries_are_exclusive() {
        let session_box = SessionBox::new(150.0, 145.0).unwrap();
        let touching_low = bar_at(10, 0, 145.0, 146.0);
        let touching_high = bar_at(10, 5, 149.0, 150.0);
        let below = bar_at(10, 10, 144.99, 146.0);

        assert_eq!(session_box.zone(&touching_low), BoxZone::InsideBox);
        assert_eq!(session_box.zone(&touching_high), BoxZone::InsideBox);
        assert_eq!(session_box.zone(&below), BoxZone::LongZone);
    }

    #[test]
    fn test_money_cents_rounding() {
        assert_eq!(Money::cents(102.499).inner(), dec!(102.50));
        assert_eq!(Money::cents(99.5).inner(), dec!(99.5));
        assert_eq!((Money::cents(143.0) - Money::cents(144.5)).inner(), dec!(-1.5));
    }

    #[test]
    fn test_money_serde() {
        let money = Money::from_f64(123.45);
        let json = serde_json::to_string(&money).unwrap();
        let parsed: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(money, parsed);
    }
}

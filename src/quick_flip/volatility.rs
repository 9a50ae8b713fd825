//! Volatility gate
//!
//! Daily ATR computed strictly from bars dated before the session, and the
//! liquidity check that compares it against the opening-range width.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, ScalperError};
use crate::indicators;
use crate::types::{BarSeries, SessionBox};

/// ATR over `period` daily bars, using only bars dated strictly before `date`.
///
/// True range is computed over every eligible bar (the first one falls back
/// to high - low) and the last `period` values are averaged.
pub fn daily_atr(daily: &BarSeries, date: NaiveDate, period: usize) -> Result<f64> {
    let eligible = daily.before_date(date);
    if period == 0 || eligible.len() < period {
        return Err(ScalperError::InsufficientData(format!(
            "{} daily bars before {} for {}, need {}",
            eligible.len(),
            date,
            daily.symbol(),
            period
        )));
    }

    let atr = indicators::latest_atr(eligible, period).ok_or_else(|| {
        ScalperError::InsufficientData(format!("ATR({}) undefined before {}", period, date))
    })?;

    debug!(symbol = %daily.symbol(), %date, atr, "daily ATR");
    Ok(atr)
}

/// Outcome of comparing the box range to ATR
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LiquidityCheck {
    pub atr: f64,
    pub range: f64,
    pub required: f64,
    pub passed: bool,
}

/// Gate passes when the box range is at least `atr * threshold` (inclusive)
pub fn check_liquidity(session_box: &SessionBox, atr: f64, threshold: f64) -> LiquidityCheck {
    let range = session_box.range();
    let required = atr * threshold;
    LiquidityCheck {
        atr,
        range,
        required,
        passed: range >= required,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bar, Interval, Symbol};
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn daily_series(ranges: &[(u32, f64)]) -> BarSeries {
        let bars = ranges
            .iter()
            .map(|&(day, range)| {
                let ts = New_York.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap();
                Bar::new_unchecked(ts, 100.0, 100.0 + range, 100.0, 100.0 + range / 2.0, 1000.0)
            })
            .collect();
        BarSeries::new(Symbol::new("TEST"), Interval::Daily, bars).unwrap()
    }

    #[test]
    fn test_atr_ignores_target_day() {
        let series = daily_series(&[(2, 2.0), (3, 2.0), (6, 50.0)]);
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        // closes sit mid-range so TR equals high - low for every bar
        assert_relative_eq!(daily_atr(&series, date, 2).unwrap(), 2.0);
    }

    #[test]
    fn test_atr_insufficient_history() {
        let series = daily_series(&[(2, 2.0), (3, 2.0)]);
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let err = daily_atr(&series, date, 14).unwrap_err();
        assert!(matches!(err, ScalperError::InsufficientData(_)));
    }

    #[test]
    fn test_gate_passes_with_wide_box() {
        let session_box = SessionBox::new(150.0, 145.0).unwrap();
        let check = check_liquidity(&session_box, 10.0, 0.25);
        assert_relative_eq!(check.required, 2.5);
        assert_relative_eq!(check.range, 5.0);
        assert!(check.passed);
    }

    #[test]
    fn test_gate_inclusive_at_boundary() {
        let session_box = SessionBox::new(102.5, 100.0).unwrap();
        assert!(check_liquidity(&session_box, 10.0, 0.25).passed);

        let narrow = SessionBox::new(102.4, 100.0).unwrap();
        assert!(!check_liquidity(&narrow, 10.0, 0.25).passed);
    }
}

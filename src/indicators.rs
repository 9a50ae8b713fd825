//! Technical indicators powered by the `ta` crate
//!
//! Callers choose which bars are eligible (e.g. excluding the target day);
//! these helpers only fold over what they are given.

use ta::indicators::{SimpleMovingAverage, TrueRange};
use ta::{Close, High, Low, Next};

use crate::types::Bar;

impl High for Bar {
    fn high(&self) -> f64 {
        self.high
    }
}

impl Low for Bar {
    fn low(&self) -> f64 {
        self.low
    }
}

impl Close for Bar {
    fn close(&self) -> f64 {
        self.close
    }
}

/// Calculate Simple Moving Average
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut indicator = match SimpleMovingAverage::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let sma_val = indicator.next(value);
            (i + 1 >= period).then_some(sma_val)
        })
        .collect()
}

/// True range per bar; the first bar has no previous close, so it is high - low
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut indicator = TrueRange::new();
    bars.iter().map(|bar| indicator.next(bar)).collect()
}

/// Average True Range as a simple average of true range
pub fn atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    sma(&true_range(bars), period)
}

/// Most recent ATR value, if enough bars exist
pub fn latest_atr(bars: &[Bar], period: usize) -> Option<f64> {
    atr(bars, period).last().copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn daily(bars: &[(f64, f64, f64)]) -> Vec<Bar> {
        bars.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| {
                let ts = New_York.with_ymd_and_hms(2025, 1, 2 + i as u32, 0, 0, 0).unwrap();
                Bar::new_unchecked(ts, close, high, low, close, 1000.0)
            })
            .collect()
    }

    #[test]
    fn test_sma_window() {
        let result = sma(&[2.0, 4.0, 6.0, 8.0], 3);
        assert_eq!(result.len(), 4);
        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_relative_eq!(result[2].unwrap(), 4.0);
        assert_relative_eq!(result[3].unwrap(), 6.0);
        assert!(sma(&[1.0], 0).is_empty());
    }

    #[test]
    fn test_true_range_gaps() {
        let bars = daily(&[(10.0, 9.0, 9.5), (12.0, 11.5, 11.8), (11.0, 8.0, 8.5)]);
        let tr = true_range(&bars);

        assert_relative_eq!(tr[0], 1.0);
        // gap up: |12.0 - 9.5| dominates high - low
        assert_relative_eq!(tr[1], 2.5);
        // gap down: |8.0 - 11.8| dominates
        assert_relative_eq!(tr[2], 3.8, epsilon = 1e-9);
    }

    #[test]
    fn test_latest_atr_needs_period_bars() {
        // TR: 1.0, 1.5, 1.5, 1.5
        let bars = daily(&[(10.0, 9.0, 9.5), (11.0, 10.0, 10.5), (12.0, 11.0, 11.5), (13.0, 12.0, 12.5)]);
        let result = atr(&bars, 2);
        assert_eq!(result[0], None);
        assert_relative_eq!(result[1].unwrap(), 1.25);
        assert_relative_eq!(latest_atr(&bars, 2).unwrap(), 1.5);
        assert_eq!(latest_atr(&bars, 5), None);
    }
}

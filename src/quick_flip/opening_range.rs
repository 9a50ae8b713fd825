//! Opening-range box builder

use chrono::NaiveTime;
use tracing::debug;

use crate::error::{Result, ScalperError};
use crate::types::{Bar, SessionBox};

use super::config::StrategyConfig;

/// Which bars defined the box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxSource {
    FifteenMinute,
    FiveMinuteAggregate,
}

/// Build the session box from one day's intraday bars.
///
/// A genuine 15-minute bar wins when one exists for the day: the bar opening
/// at `session_open`, or the day's first 15-minute bar if that timestamp is
/// missing. Otherwise the first `box_minutes / 5` five-minute bars from the
/// same anchor are aggregated; a gap in the feed shifts the window forward
/// rather than dropping the day.
pub fn build_box(
    fifteen_day: Option<&[Bar]>,
    five_day: &[Bar],
    config: &StrategyConfig,
) -> Result<(SessionBox, BoxSource)> {
    if let Some(bar) = fifteen_day.and_then(|bars| anchor_bar(bars, config.session_open)) {
        debug!(time = %bar.timestamp, high = bar.high, low = bar.low, "box from 15m bar");
        return Ok((SessionBox::new(bar.high, bar.low)?, BoxSource::FifteenMinute));
    }

    let anchor = anchor_bar(five_day, config.session_open).ok_or_else(|| {
        ScalperError::InsufficientData("no intraday bars for session".into())
    })?;
    let expected = (config.box_minutes / 5).max(1) as usize;
    let window: Vec<&Bar> = five_day
        .iter()
        .filter(|b| b.timestamp >= anchor.timestamp)
        .take(expected)
        .collect();

    if window.len() < expected {
        return Err(ScalperError::InsufficientData(format!(
            "{} of {} opening 5m bars available",
            window.len(),
            expected
        )));
    }

    let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    debug!(high, low, bars = window.len(), "box from 5m aggregate");
    Ok((SessionBox::new(high, low)?, BoxSource::FiveMinuteAggregate))
}

/// Bar opening exactly at `open`, else the first bar of the day
fn anchor_bar(bars: &[Bar], open: NaiveTime) -> Option<&Bar> {
    bars.iter()
        .find(|b| b.time() == open)
        .or_else(|| bars.first())
}

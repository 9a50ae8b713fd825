//! Live session driver
//!
//! Wraps a [`SessionScanner`] for today's session and feeds it only bars
//! whose interval has fully elapsed. Each completed bar is evaluated once.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::data::SymbolData;
use crate::error::Result;
use crate::quick_flip::{build_box, daily_atr, LiquidityCheck, SessionScanner, SessionState, StrategyConfig};
use crate::types::{Bar, BarSeries, Symbol, TradeCandidate};

/// Bars of `date` that had closed by `now`
pub fn completed_on(series: &BarSeries, date: NaiveDate, now: DateTime<Tz>) -> &[Bar] {
    let step = series.interval().duration();
    let day = series.on_date(date);
    let end = day.partition_point(|b| b.timestamp + step <= now);
    &day[..end]
}

pub struct LiveSession<'a> {
    scanner: SessionScanner<'a>,
    check: LiquidityCheck,
    last_evaluated: Option<DateTime<Tz>>,
}

impl<'a> LiveSession<'a> {
    /// ATR from prior days, box from completed opening bars, then the gate.
    ///
    /// Returns `InsufficientData` when either cannot be established yet.
    pub fn initialize(
        symbol: &Symbol,
        now: DateTime<Tz>,
        data: &SymbolData,
        config: &'a StrategyConfig,
    ) -> Result<Self> {
        let date = now.date_naive();
        let atr = daily_atr(&data.daily, date, config.atr_period)?;

        let fifteen = data.fifteen.as_ref().map(|s| completed_on(s, date, now));
        let five = completed_on(&data.five, date, now);
        let (session_box, source) = build_box(fifteen, five, config)?;

        let mut scanner = SessionScanner::new(symbol.clone(), date, config);
        scanner.set_box(session_box)?;
        let check = scanner.record_atr(atr)?;
        scanner.evaluate_gate()?;

        info!(
            "{} session: box {:.2}-{:.2} ({:?}), ATR {:.2}, range {:.2} vs required {:.2} -> {}",
            symbol,
            session_box.low,
            session_box.high,
            source,
            atr,
            check.range,
            check.required,
            scanner.state()
        );

        Ok(Self {
            scanner,
            check,
            last_evaluated: None,
        })
    }

    pub fn state(&self) -> &SessionState {
        self.scanner.state()
    }

    pub fn liquidity(&self) -> &LiquidityCheck {
        &self.check
    }

    pub fn symbol(&self) -> &Symbol {
        self.scanner.symbol()
    }

    pub fn is_finished(&self) -> bool {
        self.scanner.state().is_terminal()
    }

    /// Evaluate the most recently completed bar (with its predecessor).
    ///
    /// Returns `None` when nothing new has closed, the bar is outside the scan
    /// window, or the session is already terminal.
    pub fn poll(&mut self, five: &BarSeries, now: DateTime<Tz>) -> Result<Option<TradeCandidate>> {
        if self.is_finished() {
            return Ok(None);
        }

        let completed = completed_on(five, self.scanner.date(), now);
        let [.., previous, current] = completed else {
            debug!("{}: fewer than two completed bars", self.symbol());
            return Ok(None);
        };

        if self.last_evaluated.is_some_and(|t| t >= current.timestamp) {
            debug!("{}: no new completed bar since {}", self.symbol(), current.timestamp);
            return Ok(None);
        }
        self.last_evaluated = Some(current.timestamp);

        self.scanner.scan_pair(current, previous)
    }

    /// Close out the session at the end of the scan window
    pub fn close(&mut self) -> Result<()> {
        self.scanner.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Interval;
    use chrono::{Duration, NaiveTime, TimeZone};
    use chrono_tz::America::New_York;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Tz> {
        New_York.with_ymd_and_hms(2025, 3, 10, h, m, s).unwrap()
    }

    fn data() -> SymbolData {
        let symbol = Symbol::new("TEST");
        let first = New_York.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap();
        let daily = (0..20)
            .map(|i| Bar::new_unchecked(first + Duration::days(i), 145.0, 150.0, 140.0, 145.0, 1e6))
            .collect();
        let bar = |h, m, o, hi, lo, c| Bar::new_unchecked(at(h, m, 0), o, hi, lo, c, 1000.0);
        let five = vec![
            bar(9, 30, 147.0, 150.0, 146.5, 148.0),
            bar(9, 35, 148.0, 149.0, 145.0, 146.0),
            bar(9, 40, 146.0, 147.0, 145.5, 146.5),
            bar(9, 45, 146.5, 147.0, 145.5, 145.6),
            bar(9, 50, 145.6, 146.0, 145.2, 145.5),
            bar(9, 55, 144.0, 144.5, 143.0, 144.4),
        ];
        SymbolData {
            daily: BarSeries::new(symbol.clone(), Interval::Daily, daily).unwrap(),
            fifteen: None,
            five: BarSeries::new(symbol, Interval::FiveMinute, five).unwrap(),
        }
    }

    fn config() -> StrategyConfig {
        StrategyConfig::new(NaiveTime::from_hms_opt(10, 45, 0).unwrap())
    }

    #[test]
    fn test_box_needs_completed_opening_bars() {
        let data = data();
        let config = config();
        // 09:40 bar still forming at 09:44
        let err = LiveSession::initialize(&Symbol::new("TEST"), at(9, 44, 0), &data, &config);
        assert!(err.is_err());
        assert!(LiveSession::initialize(&Symbol::new("TEST"), at(9, 45, 0), &data, &config).is_ok());
    }

    #[test]
    fn test_each_bar_evaluated_once() {
        let data = data();
        let config = config();
        let mut session = LiveSession::initialize(&Symbol::new("TEST"), at(9, 45, 5), &data, &config).unwrap();
        assert_eq!(session.state().to_string(), "SCANNING");

        // 09:50 bar closed: inside the box
        assert!(session.poll(&data.five, at(9, 55, 1)).unwrap().is_none());
        assert!(session.poll(&data.five, at(9, 57, 0)).unwrap().is_none());

        // 09:55 hammer closed
        let candidate = session.poll(&data.five, at(10, 0, 2)).unwrap().unwrap();
        assert_eq!(candidate.timestamp, at(9, 55, 0));
        assert!(session.is_finished());
        assert!(session.poll(&data.five, at(10, 5, 0)).unwrap().is_none());
    }

    #[test]
    fn test_close_without_signal() {
        let data = data();
        let config = config();
        let mut session = LiveSession::initialize(&Symbol::new("TEST"), at(9, 45, 5), &data, &config).unwrap();
        session.close().unwrap();
        assert_eq!(*session.state(), SessionState::NoSignal);
    }
}

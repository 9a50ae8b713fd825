//! Binds a data provider to the decision engine
//!
//! `simulate_session` replays one historical date; `run_session` evaluates
//! the live state of today's session at a given instant.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::data::{DataProvider, SymbolData};
use crate::error::{Result, ScalperError};
use crate::live::LiveSession;
use crate::quick_flip::{replay_day, DayInputs, DayResult, StrategyConfig};
use crate::types::{Symbol, TradeCandidate, TradeRecord};

/// Replay `date` for one symbol from already-fetched data under `config`
pub fn replay_symbol_day(
    data: &SymbolData,
    symbol: &Symbol,
    date: NaiveDate,
    config: &StrategyConfig,
) -> Result<DayResult> {
    let inputs = DayInputs {
        daily: &data.daily,
        fifteen: data.fifteen.as_ref().map(|s| s.on_date(date)),
        five: data.five.on_date(date),
    };
    replay_day(symbol, date, inputs, config)
}

pub struct Engine {
    provider: Box<dyn DataProvider>,
    config: StrategyConfig,
    daily_lookback_days: i64,
}

impl Engine {
    pub fn new(provider: Box<dyn DataProvider>, config: StrategyConfig, daily_lookback_days: i64) -> Self {
        Self {
            provider,
            config,
            daily_lookback_days,
        }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn provider(&self) -> &dyn DataProvider {
        self.provider.as_ref()
    }

    /// Fetch everything needed to replay `[start, end]`
    pub fn load(&self, symbol: &Symbol, start: NaiveDate, end: NaiveDate) -> Result<SymbolData> {
        Ok(SymbolData::fetch(
            self.provider.as_ref(),
            symbol,
            start,
            end,
            self.daily_lookback_days,
        )?)
    }

    /// Replay every trading date in `[start, end]`.
    ///
    /// Per-day failures are logged and skipped; only configuration-level
    /// errors abort.
    pub fn replay_range(&self, symbol: &Symbol, start: NaiveDate, end: NaiveDate) -> Result<Vec<DayResult>> {
        let data = self.load(symbol, start, end)?;
        let mut days = Vec::new();
        for date in data.trading_dates() {
            match replay_symbol_day(&data, symbol, date, &self.config) {
                Ok(day) => days.push(day),
                Err(e) if e.is_recoverable() => warn!("{} {}: skipping day: {}", symbol, date, e),
                Err(e) => return Err(e),
            }
        }
        Ok(days)
    }

    /// Trade record for one historical session, or `None` if no trade
    pub fn simulate_session(&self, symbol: &Symbol, date: NaiveDate) -> Result<Option<TradeRecord>> {
        let data = self.load(symbol, date, date)?;
        let day = replay_symbol_day(&data, symbol, date, &self.config)?;
        debug!("{} {}: {}", symbol, date, day.status);
        Ok(match (&day.candidate, &day.outcome) {
            (Some(candidate), Some(outcome)) => Some(TradeRecord::new(candidate, outcome)),
            _ => None,
        })
    }

    /// Evaluate today's session as of `now` using completed bars only.
    ///
    /// Looks at the most recently completed bar pair; a session that cannot
    /// establish its box or ATR yields `None` rather than an error.
    pub fn run_session(&self, symbol: &Symbol, now: DateTime<Tz>) -> Result<Option<TradeCandidate>> {
        let date = now.date_naive();
        let data = self.load(symbol, date, date)?;

        let mut session = match LiveSession::initialize(symbol, now, &data, &self.config) {
            Ok(session) => session,
            Err(ScalperError::InsufficientData(reason)) => {
                warn!("{}: no session today: {}", symbol, reason);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        session.poll(&data.five, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::types::{Bar, BarSeries, Interval};
    use chrono::{Duration, NaiveTime, TimeZone};
    use chrono_tz::America::New_York;

    /// Serves fixed series regardless of the requested range
    struct FixedProvider {
        daily: BarSeries,
        five: BarSeries,
    }

    impl DataProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch_bars(
            &self,
            symbol: &Symbol,
            interval: Interval,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> std::result::Result<BarSeries, ProviderError> {
            match interval {
                Interval::Daily => Ok(self.daily.clone()),
                Interval::FiveMinute => Ok(self.five.clone()),
                Interval::FifteenMinute => Err(ProviderError::NotFound(symbol.to_string())),
            }
        }
    }

    fn provider() -> FixedProvider {
        let symbol = Symbol::new("TEST");
        let first = New_York.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap();
        let daily = (0..20)
            .map(|i| Bar::new_unchecked(first + Duration::days(i), 145.0, 150.0, 140.0, 145.0, 1e6))
            .collect();
        let bar = |h, m, o, hi, lo, c| {
            Bar::new_unchecked(New_York.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap(), o, hi, lo, c, 1000.0)
        };
        let five = vec![
            bar(9, 30, 147.0, 150.0, 146.5, 148.0),
            bar(9, 35, 148.0, 149.0, 145.0, 146.0),
            bar(9, 40, 146.0, 147.0, 145.5, 146.5),
            bar(9, 45, 146.5, 147.0, 145.5, 145.6),
            bar(9, 50, 144.0, 144.5, 143.0, 144.4),
            bar(9, 55, 144.4, 147.0, 144.0, 146.8),
            bar(10, 0, 146.8, 150.5, 146.5, 150.2),
        ];
        FixedProvider {
            daily: BarSeries::new(symbol.clone(), Interval::Daily, daily).unwrap(),
            five: BarSeries::new(symbol, Interval::FiveMinute, five).unwrap(),
        }
    }

    fn engine() -> Engine {
        let config = StrategyConfig::new(NaiveTime::from_hms_opt(10, 45, 0).unwrap());
        Engine::new(Box::new(provider()), config, 60)
    }

    #[test]
    fn test_simulate_session_produces_record() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let record = engine().simulate_session(&Symbol::new("TEST"), date).unwrap().unwrap();
        assert_eq!(record.entry_price.to_f64(), 144.5);
        assert_eq!(record.pnl.to_f64(), 5.5);
    }

    #[test]
    fn test_run_session_ignores_forming_bar() {
        let engine = engine();
        let symbol = Symbol::new("TEST");

        // 09:53: the 09:50 hammer is still forming
        let early = New_York.with_ymd_and_hms(2025, 3, 10, 9, 53, 0).unwrap();
        assert!(engine.run_session(&symbol, early).unwrap().is_none());

        let closed = New_York.with_ymd_and_hms(2025, 3, 10, 9, 55, 10).unwrap();
        let candidate = engine.run_session(&symbol, closed).unwrap().unwrap();
        assert_eq!(candidate.timestamp.format("%H:%M").to_string(), "09:50");
    }
}

//! Session scanner state machine
//!
//! ```text
//! UNINITIALIZED -> BOX_SET -> LIQUIDITY_CHECKED -> SCANNING -> SIGNALED
//!                                               |           \-> NO_SIGNAL
//!                                               \-> REJECTED
//! ```
//!
//! One scanner covers one symbol for one trading date and emits at most one
//! candidate. Backtests feed it a whole day at once; the live driver feeds it
//! one completed bar pair per poll.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use crate::error::{Result, ScalperError};
use crate::types::{Bar, BarSeries, BoxZone, Direction, SessionBox, Symbol, TradeCandidate, TradeOutcome};

use super::config::StrategyConfig;
use super::opening_range::build_box;
use super::params::build_candidate;
use super::patterns::PatternRules;
use super::simulator::simulate;
use super::volatility::{check_liquidity, daily_atr, LiquidityCheck};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Uninitialized,
    BoxSet {
        session_box: SessionBox,
    },
    LiquidityChecked {
        session_box: SessionBox,
        check: LiquidityCheck,
    },
    Scanning {
        session_box: SessionBox,
        atr: f64,
    },
    Rejected {
        check: LiquidityCheck,
    },
    Signaled(Box<TradeCandidate>),
    NoSignal,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Rejected { .. } | SessionState::Signaled(_) | SessionState::NoSignal
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "UNINITIALIZED",
            SessionState::BoxSet { .. } => "BOX_SET",
            SessionState::LiquidityChecked { .. } => "LIQUIDITY_CHECKED",
            SessionState::Scanning { .. } => "SCANNING",
            SessionState::Rejected { .. } => "REJECTED",
            SessionState::Signaled(_) => "SIGNALED",
            SessionState::NoSignal => "NO_SIGNAL",
        };
        f.write_str(name)
    }
}

pub struct SessionScanner<'a> {
    symbol: Symbol,
    date: NaiveDate,
    config: &'a StrategyConfig,
    rules: PatternRules,
    state: SessionState,
}

impl<'a> SessionScanner<'a> {
    pub fn new(symbol: Symbol, date: NaiveDate, config: &'a StrategyConfig) -> Self {
        Self {
            symbol,
            date,
            config,
            rules: PatternRules::from(config),
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    fn invalid(&self, action: &'static str) -> ScalperError {
        ScalperError::InvalidTransition {
            state: self.state.to_string(),
            action,
        }
    }

    /// UNINITIALIZED -> BOX_SET
    pub fn set_box(&mut self, session_box: SessionBox) -> Result<()> {
        match self.state {
            SessionState::Uninitialized => {
                self.state = SessionState::BoxSet { session_box };
                Ok(())
            }
            _ => Err(self.invalid("set box")),
        }
    }

    /// BOX_SET -> LIQUIDITY_CHECKED
    pub fn record_atr(&mut self, atr: f64) -> Result<LiquidityCheck> {
        match self.state {
            SessionState::BoxSet { session_box } => {
                let check = check_liquidity(&session_box, atr, self.config.liquidity_threshold);
                self.state = SessionState::LiquidityChecked { session_box, check };
                Ok(check)
            }
            _ => Err(self.invalid("record ATR")),
        }
    }

    /// LIQUIDITY_CHECKED -> SCANNING | REJECTED. Returns whether scanning may start.
    pub fn evaluate_gate(&mut self) -> Result<bool> {
        match self.state {
            SessionState::LiquidityChecked { session_box, check } => {
                if check.passed {
                    debug!(
                        symbol = %self.symbol,
                        range = check.range,
                        required = check.required,
                        "liquidity gate passed"
                    );
                    self.state = SessionState::Scanning {
                        session_box,
                        atr: check.atr,
                    };
                    Ok(true)
                } else {
                    info!(
                        symbol = %self.symbol,
                        date = %self.date,
                        range = check.range,
                        required = check.required,
                        "box too narrow, session rejected"
                    );
                    self.state = SessionState::Rejected { check };
                    Ok(false)
                }
            }
            _ => Err(self.invalid("evaluate liquidity gate")),
        }
    }

    /// Evaluate one (current, previous) pair while SCANNING.
    ///
    /// Bars outside the scan window are ignored. A match moves the session to
    /// SIGNALED; scanning again after that is an invalid transition.
    pub fn scan_pair(&mut self, current: &Bar, previous: &Bar) -> Result<Option<TradeCandidate>> {
        let (session_box, atr) = match self.state {
            SessionState::Scanning { session_box, atr } => (session_box, atr),
            _ => return Err(self.invalid("scan")),
        };

        if !self.config.in_scan_window(current.time()) {
            return Ok(None);
        }

        let direction = match session_box.zone(current) {
            BoxZone::LongZone => Direction::Long,
            BoxZone::ShortZone => Direction::Short,
            BoxZone::InsideBox => return Ok(None),
        };

        let Some(pattern) = self.rules.classify(direction, current, previous) else {
            return Ok(None);
        };

        let candidate = build_candidate(
            &self.symbol,
            pattern,
            current,
            previous,
            &session_box,
            atr,
            self.config,
        );
        info!(
            symbol = %self.symbol,
            time = %current.timestamp,
            %direction,
            %pattern,
            entry = %candidate.entry_price,
            stop = %candidate.stop_loss,
            target = %candidate.target_price,
            "signal"
        );
        self.state = SessionState::Signaled(Box::new(candidate.clone()));
        Ok(Some(candidate))
    }

    /// Walk a day's bars pairwise and stop at the first match
    pub fn scan(&mut self, day_bars: &[Bar]) -> Result<Option<TradeCandidate>> {
        for pair in day_bars.windows(2) {
            if let Some(candidate) = self.scan_pair(&pair[1], &pair[0])? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// SCANNING -> NO_SIGNAL; already-terminal sessions are left as they are
    pub fn finish(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        match self.state {
            SessionState::Scanning { .. } => {
                debug!(symbol = %self.symbol, date = %self.date, "no signal in scan window");
                self.state = SessionState::NoSignal;
                Ok(())
            }
            _ => Err(self.invalid("finish")),
        }
    }
}

/// How a replayed trading day ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DayStatus {
    NoData,
    InsufficientData(String),
    Rejected,
    NoSignal,
    Traded,
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayStatus::NoData => f.write_str("no data"),
            DayStatus::InsufficientData(reason) => write!(f, "insufficient data ({})", reason),
            DayStatus::Rejected => f.write_str("rejected"),
            DayStatus::NoSignal => f.write_str("no signal"),
            DayStatus::Traded => f.write_str("traded"),
        }
    }
}

/// Per-day ledger entry for backtests
#[derive(Debug, Clone, Serialize)]
pub struct DayResult {
    pub symbol: Symbol,
    pub date: NaiveDate,
    pub status: DayStatus,
    pub session_box: Option<SessionBox>,
    pub liquidity: Option<LiquidityCheck>,
    pub candidate: Option<TradeCandidate>,
    pub outcome: Option<TradeOutcome>,
}

impl DayResult {
    fn empty(symbol: &Symbol, date: NaiveDate, status: DayStatus) -> Self {
        Self {
            symbol: symbol.clone(),
            date,
            status,
            session_box: None,
            liquidity: None,
            candidate: None,
            outcome: None,
        }
    }

    /// Gate evaluated and passed
    pub fn is_valid(&self) -> bool {
        self.liquidity.map(|c| c.passed).unwrap_or(false)
    }

    pub fn trade_taken(&self) -> bool {
        self.candidate.is_some()
    }
}

/// Bars needed to replay one date
#[derive(Debug, Clone, Copy)]
pub struct DayInputs<'a> {
    pub daily: &'a BarSeries,
    pub fifteen: Option<&'a [Bar]>,
    pub five: &'a [Bar],
}

/// Run the full session pipeline for one historical date.
///
/// Underfilled ATR or box windows become `DayStatus::InsufficientData`;
/// anything else is returned as an error.
pub fn replay_day(
    symbol: &Symbol,
    date: NaiveDate,
    inputs: DayInputs<'_>,
    config: &StrategyConfig,
) -> Result<DayResult> {
    if inputs.five.is_empty() && inputs.fifteen.map_or(true, |b| b.is_empty()) {
        return Ok(DayResult::empty(symbol, date, DayStatus::NoData));
    }

    let atr = match daily_atr(inputs.daily, date, config.atr_period) {
        Ok(atr) => atr,
        Err(ScalperError::InsufficientData(reason)) => {
            return Ok(DayResult::empty(symbol, date, DayStatus::InsufficientData(reason)))
        }
        Err(e) => return Err(e),
    };

    let session_box = match build_box(inputs.fifteen, inputs.five, config) {
        Ok((session_box, _)) => session_box,
        Err(ScalperError::InsufficientData(reason)) => {
            return Ok(DayResult::empty(symbol, date, DayStatus::InsufficientData(reason)))
        }
        Err(e) => return Err(e),
    };

    let mut scanner = SessionScanner::new(symbol.clone(), date, config);
    scanner.set_box(session_box)?;
    let check = scanner.record_atr(atr)?;

    let mut result = DayResult::empty(symbol, date, DayStatus::Rejected);
    result.session_box = Some(session_box);
    result.liquidity = Some(check);

    if !scanner.evaluate_gate()? {
        return Ok(result);
    }

    match scanner.scan(inputs.five)? {
        Some(candidate) => {
            let outcome = simulate(&candidate, inputs.five);
            debug!(%symbol, %date, outcome = %outcome.outcome, pnl = %outcome.pnl, "day replayed");
            result.status = DayStatus::Traded;
            result.candidate = Some(candidate);
            result.outcome = Some(outcome);
        }
        None => {
            scanner.finish()?;
            result.status = DayStatus::NoSignal;
        }
    }

    Ok(result)
}

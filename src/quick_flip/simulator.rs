//! Outcome simulator
//!
//! Replays a candidate over the bars that follow its signal bar on the same
//! trading date. Bars are compared against the unrounded levels; exit price
//! and P&L are rounded to cents only in the outcome.

use tracing::debug;

use crate::types::{Bar, Direction, ExitReason, Money, Outcome, TradeCandidate, TradeOutcome};

/// Resolve a trade against `day_bars` (the full day; bars at or before the
/// signal bar are skipped).
///
/// Stop is checked before target on every bar: when both are breached inside
/// the same bar the intrabar path is unknown and the loss is assumed. If
/// neither triggers, the trade closes at the last bar's close.
pub fn simulate(candidate: &TradeCandidate, day_bars: &[Bar]) -> TradeOutcome {
    let entry_time = candidate.timestamp;
    let start = day_bars.partition_point(|b| b.timestamp <= entry_time);
    let future = &day_bars[start..];

    let stop = candidate.levels.stop;
    let target = candidate.levels.target;

    for bar in future {
        let (stopped, hit_target) = match candidate.direction {
            Direction::Long => (bar.low <= stop, bar.high >= target),
            Direction::Short => (bar.high >= stop, bar.low <= target),
        };

        if stopped {
            return close(candidate, bar, stop, ExitReason::StopLoss);
        }
        if hit_target {
            return close(candidate, bar, target, ExitReason::Target);
        }
    }

    match future.last() {
        Some(last) => close(candidate, last, last.close, ExitReason::SessionClose),
        None => {
            debug!(symbol = %candidate.symbol, %entry_time, "no bars after entry, trade left open");
            TradeOutcome {
                entry_time,
                exit_time: None,
                exit_price: None,
                exit_reason: None,
                outcome: Outcome::Open,
                pnl: Money::ZERO,
            }
        }
    }
}

/// Signed P&L per share, positive when favorable
pub fn pnl(direction: Direction, entry: Money, exit: Money) -> Money {
    match direction {
        Direction::Long => exit - entry,
        Direction::Short => entry - exit,
    }
}

fn close(candidate: &TradeCandidate, bar: &Bar, exit: f64, reason: ExitReason) -> TradeOutcome {
    let entry = Money::from_f64(candidate.levels.entry);
    let pnl = pnl(candidate.direction, entry, Money::from_f64(exit)).round_dp(2);
    let exit_price = Money::cents(exit);
    let outcome = match reason {
        ExitReason::StopLoss => Outcome::Loss,
        ExitReason::Target => Outcome::Win,
        ExitReason::SessionClose if pnl.is_positive() => Outcome::Win,
        ExitReason::SessionClose => Outcome::Loss,
    };

    debug!(
        symbol = %candidate.symbol,
        exit_time = %bar.timestamp,
        %exit_price,
        %pnl,
        ?reason,
        "trade closed"
    );

    TradeOutcome {
        entry_time: candidate.timestamp,
        exit_time: Some(bar.timestamp),
        exit_price: Some(exit_price),
        exit_reason: Some(reason),
        outcome,
        pnl,
    }
}

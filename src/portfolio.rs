//! Multi-symbol runs: leaderboard, one-trade-per-day portfolio, date sweep
//!
//! Every symbol is replayed independently through the same engine; these
//! helpers only combine the resulting trade ledgers.

use anyhow::Context;
use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::backtest::{BacktestReport, Backtester};
use crate::engine::Engine;
use crate::error::ScalperError;
use crate::quick_flip::DayResult;
use crate::types::{Outcome, Symbol, TradeRecord};

/// Balance after reinvesting the whole balance into every trade in order.
///
/// Shares bought = balance / entry price, balance += shares × pnl.
pub fn compound(trades: &[TradeRecord], starting_balance: f64) -> f64 {
    trades.iter().fold(starting_balance, |balance, trade| {
        let entry = trade.entry_price.to_f64();
        if entry <= 0.0 {
            return balance;
        }
        balance + balance / entry * trade.pnl.to_f64()
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One leaderboard line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub symbol: Symbol,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Compounded profit from the starting balance
    pub profit: f64,
    pub return_pct: f64,
}

impl LeaderboardRow {
    pub fn from_trades(symbol: Symbol, trades: &[TradeRecord], starting_balance: f64) -> Self {
        let report = BacktestReport::from_trades(trades);
        let profit = compound(trades, starting_balance) - starting_balance;
        Self {
            symbol,
            trades: report.trades,
            wins: report.wins,
            losses: report.losses,
            win_rate: (report.win_rate * 10.0).round() / 10.0,
            profit_factor: report.profit_factor,
            avg_win: report.avg_win.to_f64(),
            avg_loss: report.avg_loss.to_f64(),
            profit: round2(profit),
            return_pct: (profit / starting_balance * 1000.0).round() / 10.0,
        }
    }

    /// Row for a symbol that produced nothing or failed to load
    pub fn zero(symbol: Symbol) -> Self {
        Self {
            symbol,
            trades: 0,
            wins: 0,
            losses: 0,
            win_rate: 0.0,
            profit_factor: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            profit: 0.0,
            return_pct: 0.0,
        }
    }

    pub fn is_profitable(&self) -> bool {
        self.profit_factor >= 1.0
    }
}

/// Backtest each symbol independently and rank by profit factor (descending).
///
/// A symbol whose data cannot be loaded is logged and ranked with a zero row.
pub fn leaderboard(
    engine: &Engine,
    symbols: &[Symbol],
    start: NaiveDate,
    end: NaiveDate,
    starting_balance: f64,
) -> Vec<LeaderboardRow> {
    let backtester = Backtester::new(engine);
    let mut rows: Vec<LeaderboardRow> = symbols
        .iter()
        .enumerate()
        .map(|(i, symbol)| {
            info!("[{}/{}] {}", i + 1, symbols.len(), symbol);
            match backtester.run(symbol, start, end) {
                Ok(result) => LeaderboardRow::from_trades(symbol.clone(), &result.trades, starting_balance),
                Err(e) => {
                    warn!("{}: backtest failed: {}", symbol, e);
                    LeaderboardRow::zero(symbol.clone())
                }
            }
        })
        .collect();

    sort_by_profit_factor(&mut rows);
    rows
}

pub fn sort_by_profit_factor(rows: &mut [LeaderboardRow]) {
    rows.sort_by_key(|row| std::cmp::Reverse(OrderedFloat(row.profit_factor)));
}

pub fn write_leaderboard(rows: &[LeaderboardRow], path: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create results directory")?;
    }

    let mut writer = csv::Writer::from_path(path).context("Failed to create leaderboard file")?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("Leaderboard saved to {}", path.display());
    Ok(path.to_path_buf())
}

/// Trades of every symbol over the range; failing symbols are skipped
pub fn collect_trades(engine: &Engine, symbols: &[Symbol], start: NaiveDate, end: NaiveDate) -> Vec<TradeRecord> {
    let backtester = Backtester::new(engine);
    symbols
        .iter()
        .flat_map(|symbol| match backtester.run(symbol, start, end) {
            Ok(result) => result.trades,
            Err(e) => {
                warn!("{}: skipped: {}", symbol, e);
                Vec::new()
            }
        })
        .collect()
}

/// Keep the earliest entry of each date across all symbols
pub fn one_trade_per_day(mut trades: Vec<TradeRecord>) -> Vec<TradeRecord> {
    trades.sort_by_key(|t| (t.date, t.entry_time));
    trades.dedup_by_key(|t| t.date);
    trades
}

#[derive(Debug, Clone)]
pub struct PortfolioStep {
    pub trade: TradeRecord,
    /// Dollar result of this trade at the balance it was sized with
    pub dollar_pnl: f64,
    pub balance: f64,
}

#[derive(Debug, Clone)]
pub struct PortfolioSummary {
    pub steps: Vec<PortfolioStep>,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub starting_balance: f64,
    pub final_balance: f64,
    pub profit: f64,
    pub return_pct: f64,
}

/// Compound one trade per day, earliest signal first
pub fn simulate_portfolio(trades: Vec<TradeRecord>, starting_balance: f64) -> PortfolioSummary {
    let daily = one_trade_per_day(trades);

    let mut balance = starting_balance;
    let mut steps = Vec::with_capacity(daily.len());
    for trade in daily {
        let entry = trade.entry_price.to_f64();
        let dollar_pnl = if entry > 0.0 {
            balance / entry * trade.pnl.to_f64()
        } else {
            0.0
        };
        balance += dollar_pnl;
        steps.push(PortfolioStep {
            trade,
            dollar_pnl,
            balance,
        });
    }

    let wins = steps.iter().filter(|s| s.trade.outcome == Outcome::Win).count();
    let losses = steps.iter().filter(|s| s.trade.outcome == Outcome::Loss).count();
    let win_rate = if steps.is_empty() {
        0.0
    } else {
        wins as f64 / steps.len() as f64 * 100.0
    };
    let profit = balance - starting_balance;

    PortfolioSummary {
        steps,
        wins,
        losses,
        win_rate,
        starting_balance,
        final_balance: balance,
        profit,
        return_pct: profit / starting_balance * 100.0,
    }
}

/// One symbol's result for a single-date sweep
#[derive(Debug)]
pub struct SweepRow {
    pub symbol: Symbol,
    pub result: Result<Option<DayResult>, ScalperError>,
}

/// Replay one date across many symbols
pub fn sweep_date(engine: &Engine, symbols: &[Symbol], date: NaiveDate) -> Vec<SweepRow> {
    symbols
        .iter()
        .map(|symbol| SweepRow {
            symbol: symbol.clone(),
            result: engine
                .replay_range(symbol, date, date)
                .map(|days| days.into_iter().find(|d| d.date == date)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, Money, Pattern};
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn trade(symbol: &str, day: u32, hour: u32, minute: u32, entry: f64, pnl: f64) -> TradeRecord {
        let entry_time = New_York.with_ymd_and_hms(2025, 3, day, hour, minute, 0).unwrap();
        TradeRecord {
            symbol: Symbol::new(symbol),
            date: entry_time.date_naive(),
            entry_time,
            exit_time: Some(entry_time + chrono::Duration::minutes(10)),
            direction: Direction::Long,
            pattern: Pattern::Hammer,
            entry_price: Money::cents(entry),
            stop_loss: Money::cents(entry - 1.0),
            target: Money::cents(entry + 2.0),
            exit_price: Some(Money::cents(entry + pnl)),
            box_high: Money::cents(entry + 2.0),
            box_low: Money::cents(entry + 0.5),
            atr: Money::cents(4.0),
            outcome: if pnl > 0.0 { Outcome::Win } else { Outcome::Loss },
            pnl: Money::cents(pnl),
        }
    }

    #[test]
    fn test_compound() {
        // 500 / 100 = 5 shares × 2 = +10; 510 / 50 = 10.2 shares × -1 = -10.2
        let trades = vec![trade("A", 10, 10, 0, 100.0, 2.0), trade("B", 11, 10, 0, 50.0, -1.0)];
        assert_relative_eq!(compound(&trades, 500.0), 499.8, epsilon = 1e-9);
        assert_eq!(compound(&[], 500.0), 500.0);
    }

    #[test]
    fn test_one_trade_per_day_keeps_earliest() {
        let trades = vec![
            trade("LATE", 10, 10, 30, 100.0, 1.0),
            trade("EARLY", 10, 9, 50, 100.0, -1.0),
            trade("NEXT", 11, 11, 0, 100.0, 1.0),
        ];
        let kept = one_trade_per_day(trades);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].symbol.as_str(), "EARLY");
        assert_eq!(kept[1].symbol.as_str(), "NEXT");
    }

    #[test]
    fn test_portfolio_summary() {
        let trades = vec![
            trade("A", 10, 10, 0, 100.0, 2.0),
            trade("B", 10, 11, 0, 100.0, 5.0),
            trade("C", 11, 10, 0, 50.0, -1.0),
        ];
        let summary = simulate_portfolio(trades, 500.0);
        assert_eq!(summary.steps.len(), 2);
        assert_eq!(summary.wins, 1);
        assert_eq!(summary.losses, 1);
        assert_relative_eq!(summary.steps[0].dollar_pnl, 10.0, epsilon = 1e-9);
        assert_relative_eq!(summary.final_balance, 499.8, epsilon = 1e-9);
        assert_relative_eq!(summary.return_pct, -0.04, epsilon = 1e-9);
    }

    #[test]
    fn test_leaderboard_sorting() {
        let winner = vec![trade("W", 10, 10, 0, 100.0, 3.0), trade("W", 11, 10, 0, 100.0, -1.0)];
        let loser = vec![trade("L", 10, 10, 0, 100.0, 1.0), trade("L", 11, 10, 0, 100.0, -2.0)];
        let flawless = vec![trade("F", 10, 10, 0, 100.0, 1.0)];

        let mut rows = vec![
            LeaderboardRow::from_trades(Symbol::new("L"), &loser, 500.0),
            LeaderboardRow::zero(Symbol::new("Z")),
            LeaderboardRow::from_trades(Symbol::new("W"), &winner, 500.0),
            LeaderboardRow::from_trades(Symbol::new("F"), &flawless, 500.0),
        ];
        sort_by_profit_factor(&mut rows);

        let order: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["F", "W", "L", "Z"]);
        assert_eq!(rows[1].profit_factor, 3.0);
        assert_eq!(rows[1].win_rate, 50.0);
        assert!(rows[1].is_profitable());
        assert!(!rows[2].is_profitable());
    }
}

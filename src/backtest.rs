//! Multi-day backtest over historical bars
//!
//! Replays each trading date through the same session pipeline the live
//! scanner uses, then aggregates the per-day ledger into a report.

use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine::Engine;
use crate::error::Result;
use crate::quick_flip::DayResult;
use crate::types::{Money, Outcome, Symbol, TradeRecord};

/// Aggregate statistics over a trade ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestReport {
    pub total_days: usize,
    pub valid_days: usize,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Trades with no bar after entry
    pub open: usize,
    /// Percent of all trades
    pub win_rate: f64,
    /// Gross profit / gross loss; +inf with profits and no losses, 0 with neither
    pub profit_factor: f64,
    pub avg_win: Money,
    /// Magnitude of the average losing trade
    pub avg_loss: Money,
    pub total_pnl: Money,
}

impl BacktestReport {
    pub fn from_days(days: &[DayResult]) -> Self {
        let trades: Vec<TradeRecord> = trade_records(days);
        let mut report = Self::from_trades(&trades);
        report.total_days = days.len();
        report.valid_days = days.iter().filter(|d| d.is_valid()).count();
        report
    }

    /// Report over trades alone; day counts stay zero
    pub fn from_trades(trades: &[TradeRecord]) -> Self {
        let wins = trades.iter().filter(|t| t.outcome == Outcome::Win).count();
        let losses = trades.iter().filter(|t| t.outcome == Outcome::Loss).count();
        let open = trades.iter().filter(|t| t.outcome == Outcome::Open).count();

        let gross_profit: Money = trades.iter().filter(|t| t.pnl.is_positive()).map(|t| t.pnl).sum();
        let gross_loss: Money = trades
            .iter()
            .filter(|t| t.pnl.is_negative())
            .map(|t| t.pnl.abs())
            .sum();

        let win_rate = if trades.is_empty() {
            0.0
        } else {
            wins as f64 / trades.len() as f64 * 100.0
        };

        let profit_factor = if gross_loss.is_positive() {
            gross_profit.to_f64() / gross_loss.to_f64()
        } else if gross_profit.is_positive() {
            f64::INFINITY
        } else {
            0.0
        };

        let average = |total: Money, count: usize| {
            if count == 0 {
                Money::ZERO
            } else {
                (total / Money::from_f64(count as f64)).round_dp(2)
            }
        };

        Self {
            total_days: 0,
            valid_days: 0,
            trades: trades.len(),
            wins,
            losses,
            open,
            win_rate,
            profit_factor,
            avg_win: average(gross_profit, wins),
            avg_loss: average(gross_loss, losses),
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
        }
    }
}

/// Trade rows for every day that produced a trade
pub fn trade_records(days: &[DayResult]) -> Vec<TradeRecord> {
    days.iter()
        .filter_map(|d| match (&d.candidate, &d.outcome) {
            (Some(candidate), Some(outcome)) => Some(TradeRecord::new(candidate, outcome)),
            _ => None,
        })
        .collect()
}

/// One symbol's replayed range
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub symbol: Symbol,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<DayResult>,
    pub trades: Vec<TradeRecord>,
    pub report: BacktestReport,
}

pub struct Backtester<'a> {
    engine: &'a Engine,
}

impl<'a> Backtester<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    pub fn run(&self, symbol: &Symbol, start: NaiveDate, end: NaiveDate) -> Result<BacktestResult> {
        info!("Backtesting {} from {} to {}", symbol, start, end);
        let days = self.engine.replay_range(symbol, start, end)?;
        let trades = trade_records(&days);
        let report = BacktestReport::from_days(&days);

        info!(
            "{}: {} days, {} valid, {} trades, {} wins, {} losses",
            symbol, report.total_days, report.valid_days, report.trades, report.wins, report.losses
        );

        Ok(BacktestResult {
            symbol: symbol.clone(),
            start,
            end,
            days,
            trades,
            report,
        })
    }
}

/// Write the trade log CSV
pub fn write_trade_log(trades: &[TradeRecord], path: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create results directory")?;
    }

    let mut writer = csv::Writer::from_path(path).context("Failed to create trade log")?;
    for trade in trades {
        writer.serialize(trade)?;
    }
    writer.flush()?;

    info!("Trade log saved to {}", path.display());
    Ok(path.to_path_buf())
}

#[derive(Debug, Serialize)]
struct DayRow {
    date: NaiveDate,
    status: String,
    atr: Option<f64>,
    box_high: Option<f64>,
    box_low: Option<f64>,
    range: Option<f64>,
    required: Option<f64>,
    valid: bool,
    trade_taken: bool,
}

/// Write the per-day ledger CSV
pub fn write_day_log(days: &[DayResult], path: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create results directory")?;
    }

    let mut writer = csv::Writer::from_path(path).context("Failed to create day log")?;
    for day in days {
        writer.serialize(DayRow {
            date: day.date,
            status: day.status.to_string(),
            atr: day.liquidity.map(|c| c.atr),
            box_high: day.session_box.map(|b| b.high),
            box_low: day.session_box.map(|b| b.low),
            range: day.liquidity.map(|c| c.range),
            required: day.liquidity.map(|c| c.required),
            valid: day.is_valid(),
            trade_taken: day.trade_taken(),
        })?;
    }
    writer.flush()?;
    Ok(path.to_path_buf())
}

//! Backtest command implementation

use anyhow::Result;
use quick_flip_scalper::backtest::{write_day_log, write_trade_log, BacktestReport, BacktestResult, Backtester};
use quick_flip_scalper::config::DataSource;
use quick_flip_scalper::engine::Engine;
use quick_flip_scalper::portfolio::sweep_date;
use quick_flip_scalper::quick_flip::DayStatus;
use std::path::Path;
use tracing::{info, warn};

use super::{build_provider, date_range, load_config, parse_date, resolve_symbols};

#[allow(clippy::too_many_arguments)]
pub fn run(
    config_path: String,
    symbols: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    days: Option<i64>,
    date: Option<String>,
    source: Option<DataSource>,
    output: Option<String>,
) -> Result<()> {
    info!("Starting backtest");

    let config = load_config(&config_path)?;
    let symbols = resolve_symbols(&symbols, &config);
    let engine = Engine::new(
        build_provider(&config, source)?,
        config.strategy.clone(),
        config.data.daily_lookback_days,
    );

    if let Some(raw) = date {
        let date = parse_date(&raw)?;
        return run_sweep(&engine, &symbols, date);
    }

    let (start, end) = date_range(
        start.as_deref(),
        end.as_deref(),
        days.unwrap_or(config.backtest.days),
        config.market.timezone()?,
    )?;
    let results_dir = output.unwrap_or_else(|| config.backtest.results_dir.clone());
    info!("Strategy: {}", config.strategy.label());

    let backtester = Backtester::new(&engine);
    for symbol in &symbols {
        let result = match backtester.run(symbol, start, end) {
            Ok(result) => result,
            Err(e) => {
                warn!("{}: backtest failed: {}", symbol, e);
                println!("{}: backtest failed: {}", symbol, e);
                continue;
            }
        };

        print_trades(&result);
        print_report(&result);

        let dir = Path::new(&results_dir);
        write_day_log(&result.days, dir.join(format!("{}_daily_results.csv", symbol)))?;
        if result.trades.is_empty() {
            println!("No trades to save.");
        } else {
            let path = write_trade_log(&result.trades, dir.join(format!("{}_trade_log.csv", symbol)))?;
            println!("Trade log saved to: {}", path.display());
        }
    }

    info!("Backtest completed successfully");
    Ok(())
}

fn print_trades(result: &BacktestResult) {
    println!("\nProcessing {} trading days for {}...\n", result.days.len(), result.symbol);
    for trade in &result.trades {
        println!(
            "  {}: {} ({}) -> {} (${:.2})",
            trade.date,
            trade.direction,
            trade.pattern,
            trade.outcome,
            trade.pnl.to_f64()
        );
    }
}

pub(crate) fn print_report(result: &BacktestResult) {
    let report: &BacktestReport = &result.report;
    println!("\n{}", "=".repeat(60));
    println!(
        "BACKTEST RESULTS: {} ({} to {})",
        result.symbol, result.start, result.end
    );
    println!("{}", "=".repeat(60));
    println!("Total Days Scanned: {}", report.total_days);
    println!("Valid Setup Days:   {}", report.valid_days);
    println!("Trades Taken:       {}", report.trades);
    println!("Wins:               {}", report.wins);
    println!("Losses:             {}", report.losses);
    if report.open > 0 {
        println!("Open:               {}", report.open);
    }
    println!("Win Rate:           {:.1}%", report.win_rate);
    println!("Profit Factor:      {:.2}", report.profit_factor);
    println!("Average Win:        ${:.2}", report.avg_win.to_f64());
    println!("Average Loss:       ${:.2}", report.avg_loss.to_f64());
    println!("Total P&L:          ${:.2}", report.total_pnl.to_f64());
    println!("{}\n", "=".repeat(60));
}

fn run_sweep(engine: &Engine, symbols: &[quick_flip_scalper::Symbol], date: chrono::NaiveDate) -> Result<()> {
    println!("\n{}", "=".repeat(60));
    println!("SINGLE-DAY SWEEP: {} ({} symbols)", date, symbols.len());
    println!("{}", "=".repeat(60));

    let rows = sweep_date(engine, symbols, date);
    let mut traded = Vec::new();
    for row in &rows {
        match &row.result {
            Ok(Some(day)) => {
                let range = day
                    .liquidity
                    .map(|c| format!("range {:.2} vs {:.2}", c.range, c.required))
                    .unwrap_or_default();
                println!("  {:<6} {:<28} {}", row.symbol, day.status.to_string(), range);
                if day.status == DayStatus::Traded {
                    traded.push(day);
                }
            }
            Ok(None) => println!("  {:<6} no data", row.symbol),
            Err(e) => println!("  {:<6} error: {}", row.symbol, e),
        }
    }

    println!("{}", "-".repeat(60));
    if traded.is_empty() {
        println!("No trades on {}", date);
    }
    for day in traded {
        if let (Some(candidate), Some(outcome)) = (&day.candidate, &day.outcome) {
            println!(
                "  {:<6} {} {} @ {} stop {} target {} -> {} ({})",
                candidate.symbol,
                candidate.direction,
                candidate.pattern,
                candidate.entry_price,
                candidate.stop_loss,
                candidate.target_price,
                outcome.outcome,
                outcome.pnl
            );
        }
    }
    println!("{}", "=".repeat(60));
    Ok(())
}

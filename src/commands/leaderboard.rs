//! Leaderboard command: rank symbols by profit factor

use anyhow::Result;
use quick_flip_scalper::config::DataSource;
use quick_flip_scalper::engine::Engine;
use quick_flip_scalper::portfolio::{leaderboard, write_leaderboard, LeaderboardRow};
use std::path::Path;
use tracing::info;

use super::{build_provider, date_range, load_config, resolve_symbols};

pub fn run(
    config_path: String,
    symbols: Vec<String>,
    days: Option<i64>,
    source: Option<DataSource>,
    balance: Option<f64>,
) -> Result<()> {
    let config = load_config(&config_path)?;
    let symbols = resolve_symbols(&symbols, &config);
    let starting_balance = balance.unwrap_or(config.backtest.starting_balance);
    let (start, end) = date_range(
        None,
        None,
        days.unwrap_or(config.backtest.days),
        config.market.timezone()?,
    )?;

    let engine = Engine::new(
        build_provider(&config, source)?,
        config.strategy.clone(),
        config.data.daily_lookback_days,
    );

    println!("Running backtest on {} symbols ({} to {})...", symbols.len(), start, end);
    println!("{}", "=".repeat(70));

    let rows = leaderboard(&engine, &symbols, start, end, starting_balance);

    println!("\n{}", "=".repeat(70));
    println!("LEADERBOARD - Sorted by Profit Factor");
    println!("{}", "=".repeat(70));
    print_rows(&rows, starting_balance);

    let path = write_leaderboard(&rows, Path::new(&config.backtest.results_dir).join("leaderboard.csv"))?;
    println!("\nSaved to: {}", path.display());

    println!("\n{}", "=".repeat(70));
    println!("PROFITABLE (Profit Factor >= 1.0)");
    println!("{}", "=".repeat(70));
    let profitable: Vec<LeaderboardRow> = rows.iter().filter(|r| r.is_profitable()).take(10).cloned().collect();
    print_rows(&profitable, starting_balance);

    println!("\n{}", "=".repeat(70));
    println!("AVOID (Profit Factor < 1.0)");
    println!("{}", "=".repeat(70));
    let avoid: Vec<LeaderboardRow> = rows.iter().filter(|r| !r.is_profitable()).cloned().collect();
    print_rows(&avoid, starting_balance);

    info!("Leaderboard completed");
    Ok(())
}

fn print_rows(rows: &[LeaderboardRow], starting_balance: f64) {
    println!(
        "{:<6} {:>6} {:>5} {:>6} {:>7} {:>7} {:>8} {:>8} {:>10} {:>8}",
        "Symbol",
        "Trades",
        "Wins",
        "Losses",
        "WinR%",
        "PF",
        "AvgWin",
        "AvgLoss",
        format!("P/L ${:.0}", starting_balance),
        "Return%"
    );
    for row in rows {
        println!(
            "{:<6} {:>6} {:>5} {:>6} {:>7.1} {:>7.2} {:>8.2} {:>8.2} {:>10.2} {:>8.1}",
            row.symbol,
            row.trades,
            row.wins,
            row.losses,
            row.win_rate,
            row.profit_factor,
            row.avg_win,
            row.avg_loss,
            row.profit,
            row.return_pct
        );
    }
}

//! Portfolio command: one trade per day across symbols, compounded

use anyhow::Result;
use quick_flip_scalper::config::DataSource;
use quick_flip_scalper::engine::Engine;
use quick_flip_scalper::portfolio::{collect_trades, simulate_portfolio};
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

    println!("Collecting trades from {} symbols...", symbols.len());
    let trades = collect_trades(&engine, &symbols, start, end);
    println!("\nTotal trades across all symbols: {}", trades.len());

    let summary = simulate_portfolio(trades, starting_balance);
    println!("Portfolio trades (one per day): {}", summary.steps.len());

    println!("\n{}", "=".repeat(70));
    println!("PORTFOLIO SIMULATION: One trade per day, first available signal");
    println!("{}", "=".repeat(70));
    for step in &summary.steps {
        let trade = &step.trade;
        println!(
            "{}: {:<5} {:<5} ({:<18}) -> {:<4} ${:+.2} | Balance: ${:.2}",
            trade.date, trade.symbol, trade.direction, trade.pattern, trade.outcome, step.dollar_pnl, step.balance
        );
    }

    println!("\n{}", "=".repeat(70));
    println!("PORTFOLIO RESULTS");
    println!("{}", "=".repeat(70));
    println!("Total Trading Days: {}", summary.steps.len());
    println!("Wins:               {}", summary.wins);
    println!("Losses:             {}", summary.losses);
    println!("Win Rate:           {:.1}%", summary.win_rate);
    println!("Starting Balance:   ${:.2}", summary.starting_balance);
    println!("Final Balance:      ${:.2}", summary.final_balance);
    println!("Total Profit:       ${:.2}", summary.profit);
    println!("Return:             {:.1}%", summary.return_pct);
    println!("{}", "=".repeat(70));

    info!("Portfolio simulation completed");
    Ok(())
}

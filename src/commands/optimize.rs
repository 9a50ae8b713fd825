//! Optimize command implementation with progress tracking

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use quick_flip_scalper::config::DataSource;
use quick_flip_scalper::data::SymbolData;
use quick_flip_scalper::optimizer::{generate_configs, Optimizer};
use quick_flip_scalper::Symbol;
use tracing::{info, warn};

use super::{build_provider, date_range, load_config, resolve_symbols};

pub fn run(
    config_path: String,
    symbols: Vec<String>,
    days: Option<i64>,
    source: Option<DataSource>,
    top: Option<usize>,
    sequential: bool,
) -> Result<()> {
    info!("Starting optimization");

    let config = load_config(&config_path)?;
    let symbols = resolve_symbols(&symbols, &config);
    let (start, end) = date_range(
        None,
        None,
        days.unwrap_or(config.backtest.days),
        config.market.timezone()?,
    )?;
    let provider = build_provider(&config, source)?;

    // Fetch once; every grid point replays the same bars
    let data: Vec<(Symbol, SymbolData)> = symbols
        .iter()
        .filter_map(|symbol| {
            match SymbolData::fetch(provider.as_ref(), symbol, start, end, config.data.daily_lookback_days) {
                Ok(data) => Some((symbol.clone(), data)),
                Err(e) => {
                    warn!("{}: skipped: {}", symbol, e);
                    println!("  ⚠ {}: {}", symbol, e);
                    None
                }
            }
        })
        .collect();

    if data.is_empty() {
        println!("No data loaded; nothing to optimize.");
        return Ok(());
    }

    let configs = generate_configs(&config.strategy, &config.optimizer);
    let top = top.unwrap_or(config.optimizer.top_n);

    println!("\n{}", "=".repeat(70));
    println!("OPTIMIZATION SUMMARY");
    println!("{}", "=".repeat(70));
    println!("  Symbols:       {}", data.len());
    println!("  Range:         {} to {}", start, end);
    println!("  Parameters:    {} combinations", configs.len());
    println!(
        "  Position:      ${:.0} x {:.0} leverage = ${:.0}",
        config.optimizer.capital_per_trade,
        config.optimizer.leverage,
        config.optimizer.position_notional()
    );
    println!(
        "  Mode:          {}",
        if sequential { "sequential" } else { "parallel" }
    );
    println!("{}\n", "=".repeat(70));

    let pb = ProgressBar::new(configs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("⚡ {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}, {per_sec}] ✓ {msg}")?
            .progress_chars("█░ "),
    );
    pb.set_message("starting...");
    pb.tick();

    let optimizer = Optimizer::new(&data, &config.optimizer);
    let results = optimizer.optimize(&configs, &pb, sequential);
    pb.finish();

    let display_count = top.min(results.len());
    println!("\n{}", "=".repeat(100));
    println!("TOP {} OPTIMIZATION RESULTS (sorted by total P&L)", display_count);
    println!("{}", "=".repeat(100));
    println!(
        "{:<4} {:>10} {:>6} {:>5} {:>6} {:>7} {:>7} | Parameters",
        "Rank", "P&L $", "Trades", "Wins", "Losses", "WinR%", "PF"
    );
    println!("{}", "-".repeat(100));
    for (i, result) in results.iter().take(top).enumerate() {
        println!(
            "{:<4} {:>10.2} {:>6} {:>5} {:>6} {:>7.1} {:>7.2} | {}",
            i + 1,
            result.total_pnl,
            result.trades,
            result.wins,
            result.losses,
            result.win_rate,
            result.profit_factor,
            result.label
        );
    }
    println!("{}", "=".repeat(100));

    info!("Optimization completed successfully");
    Ok(())
}

//! Download command - fetch historical bars from Alpaca into the CSV layout

use anyhow::Result;
use chrono::Duration;
use quick_flip_scalper::alpaca::{AlpacaCredentials, AlpacaProvider};
use quick_flip_scalper::data::{csv_file_name, save_csv, DataProvider};
use quick_flip_scalper::{Interval, Symbol};
use std::path::Path;
use tracing::info;

use super::{date_range, load_config, resolve_symbols};

pub fn run(
    config_path: String,
    symbols: Vec<String>,
    intervals: String,
    days: i64,
    output: Option<String>,
) -> Result<()> {
    let config = load_config(&config_path)?;
    let symbols: Vec<Symbol> = resolve_symbols(&symbols, &config);
    let intervals: Vec<Interval> = intervals
        .split(',')
        .map(|s| s.trim().parse::<Interval>())
        .collect::<Result<_, _>>()?;
    let output = output.unwrap_or_else(|| config.data.data_dir.clone());

    let tz = config.market.timezone()?;
    let (start, end) = date_range(None, None, days, tz)?;
    let credentials = AlpacaCredentials::from_env()?;
    let provider = AlpacaProvider::new(&credentials, &config.data.alpaca_feed, tz)?;
    info!("Starting data download from {}", provider.name());

    println!("\n{}", "=".repeat(60));
    println!("DOWNLOADING HISTORICAL DATA FROM ALPACA");
    println!("{}", "=".repeat(60));
    println!("  Symbols:    {:?}", symbols.iter().map(Symbol::as_str).collect::<Vec<_>>());
    println!("  Intervals:  {:?}", intervals.iter().map(|i| i.as_str()).collect::<Vec<_>>());
    println!("  Range:      {} to {}", start, end);
    println!("  Output:     {}", output);
    println!("{}\n", "=".repeat(60));

    let mut total_bars = 0;
    let mut success_count = 0;
    let mut total_downloads = 0;

    for symbol in &symbols {
        println!("\n{}:", symbol);
        for &interval in &intervals {
            total_downloads += 1;
            // Daily history also covers the ATR lookback ahead of the range
            let from = match interval {
                Interval::Daily => start - Duration::days(config.data.daily_lookback_days),
                _ => start,
            };

            match provider.fetch_bars(symbol, interval, from, end) {
                Ok(series) => {
                    let path = Path::new(&output).join(csv_file_name(symbol, interval));
                    save_csv(&series, &path)?;
                    total_bars += series.len();
                    success_count += 1;
                    println!("  {} ✓ {} bars -> {}", interval, series.len(), path.display());
                }
                Err(e) => println!("  {} ✗ Error: {}", interval, e),
            }
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("DOWNLOAD COMPLETE");
    println!("{}", "=".repeat(60));
    println!("  Successful: {}/{}", success_count, total_downloads);
    println!("  Total bars: {}", total_bars);
    println!("{}", "=".repeat(60));

    Ok(())
}

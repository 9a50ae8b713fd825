//! Quick Flip Scalper - main entry point
//!
//! This binary provides six subcommands:
//! - live: Scan today's session and send signals
//! - backtest: Replay a date range (or one date across symbols)
//! - leaderboard: Rank symbols by profit factor
//! - portfolio: One trade per day across symbols, compounded
//! - optimize: Grid search over strategy parameters
//! - download: Save Alpaca bars in the CSV layout

use anyhow::Result;
use clap::{Parser, Subcommand};
use quick_flip_scalper::config::DataSource;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "quick-flip-scalper")]
#[command(about = "Opening-range reversal scalper with live signalling, backtesting, and optimization", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan today's session and send signals
    Live {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/quick_flip.json")]
        config: String,

        /// Symbols to scan (repeatable or comma-separated; defaults to config)
        #[arg(short, long)]
        symbol: Vec<String>,

        /// Log signals instead of sending them
        #[arg(long)]
        dry_run: bool,

        /// Start now instead of waiting for the box to complete
        #[arg(long)]
        immediate: bool,
    },

    /// Run a historical backtest
    Backtest {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/quick_flip.json")]
        config: String,

        /// Symbols to test (repeatable or comma-separated; defaults to config)
        #[arg(short, long)]
        symbol: Vec<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Calendar days to replay when no start date is given
        #[arg(short, long)]
        days: Option<i64>,

        /// Replay a single date across all symbols (YYYY-MM-DD)
        #[arg(long, conflicts_with_all = ["start", "end", "days"])]
        date: Option<String>,

        /// Data source override: "csv" or "alpaca"
        #[arg(long)]
        source: Option<DataSource>,

        /// Results directory (overrides config)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Backtest every symbol and rank by profit factor
    Leaderboard {
        #[arg(short, long, default_value = "configs/quick_flip.json")]
        config: String,

        #[arg(short, long)]
        symbol: Vec<String>,

        #[arg(short, long)]
        days: Option<i64>,

        #[arg(long)]
        source: Option<DataSource>,

        /// Starting balance for compounding
        #[arg(long)]
        balance: Option<f64>,
    },

    /// Simulate one trade per day across symbols
    Portfolio {
        #[arg(short, long, default_value = "configs/quick_flip.json")]
        config: String,

        #[arg(short, long)]
        symbol: Vec<String>,

        #[arg(short, long)]
        days: Option<i64>,

        #[arg(long)]
        source: Option<DataSource>,

        /// Starting balance for compounding
        #[arg(long)]
        balance: Option<f64>,
    },

    /// Grid search over thresholds, targets, stops and scan end times
    Optimize {
        #[arg(short, long, default_value = "configs/quick_flip.json")]
        config: String,

        #[arg(short, long)]
        symbol: Vec<String>,

        #[arg(short, long)]
        days: Option<i64>,

        #[arg(long)]
        source: Option<DataSource>,

        /// Number of top results to show
        #[arg(short, long)]
        top: Option<usize>,

        /// Run sequentially instead of parallel
        #[arg(long)]
        sequential: bool,
    },

    /// Download historical bars from Alpaca into the data directory
    Download {
        #[arg(short, long, default_value = "configs/quick_flip.json")]
        config: String,

        #[arg(short, long)]
        symbol: Vec<String>,

        /// Intervals (comma-separated). E.g., "1d,15m,5m"
        #[arg(short, long, default_value = "1d,15m,5m")]
        intervals: String,

        /// Number of days of history to fetch
        #[arg(short, long, default_value = "60")]
        days: i64,

        /// Output directory (overrides config data_dir)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy HTTP crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // Optimizer: keep the console clean for the progress bar
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Live { .. } => ("live", false),
        Commands::Backtest { .. } => ("backtest", false),
        Commands::Leaderboard { .. } => ("leaderboard", false),
        Commands::Portfolio { .. } => ("portfolio", false),
        Commands::Optimize { .. } => ("optimize", true),
        Commands::Download { .. } => ("download", false),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Live {
            config,
            symbol,
            dry_run,
            immediate,
        } => commands::live::run(config, symbol, dry_run, immediate),

        Commands::Backtest {
            config,
            symbol,
            start,
            end,
            days,
            date,
            source,
            output,
        } => commands::backtest::run(config, symbol, start, end, days, date, source, output),

        Commands::Leaderboard {
            config,
            symbol,
            days,
            source,
            balance,
        } => commands::leaderboard::run(config, symbol, days, source, balance),

        Commands::Portfolio {
            config,
            symbol,
            days,
            source,
            balance,
        } => commands::portfolio::run(config, symbol, days, source, balance),

        Commands::Optimize {
            config,
            symbol,
            days,
            source,
            top,
            sequential,
        } => commands::optimize::run(config, symbol, days, source, top, sequential),

        Commands::Download {
            config,
            symbol,
            intervals,
            days,
            output,
        } => commands::download::run(config, symbol, intervals, days, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_and_file_logging_initializes() {
        setup_logging(false, "logging_test", false).unwrap();
        info!("console and file layers installed");
    }

    #[test]
    fn test_backtest_date_conflicts_with_range() {
        let cli = Cli::try_parse_from(["quick-flip-scalper", "backtest", "--date", "2025-03-10"]).unwrap();
        assert!(matches!(cli.command, Commands::Backtest { date: Some(_), .. }));

        let err = Cli::try_parse_from([
            "quick-flip-scalper",
            "backtest",
            "--date",
            "2025-03-10",
            "--days",
            "5",
        ]);
        assert!(err.is_err());
    }
}

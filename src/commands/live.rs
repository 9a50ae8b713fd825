//! Live command: wait for the box, gate, then scan until a signal or scan end

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use quick_flip_scalper::data::{DataProvider, SymbolData};
use quick_flip_scalper::live::LiveSession;
use quick_flip_scalper::publisher::SignalDispatcher;
use quick_flip_scalper::quick_flip::{SessionState, StrategyConfig};
use quick_flip_scalper::{Interval, ScalperError, Symbol, TradeCandidate};
use std::time::Duration as StdDuration;
use tracing::{error, info, warn};

use super::{build_provider, load_config, resolve_symbols};

fn now_in(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

pub fn run(config_path: String, symbols: Vec<String>, dry_run: bool, immediate: bool) -> Result<()> {
    let config = load_config(&config_path)?;
    let symbols = resolve_symbols(&symbols, &config);
    let tz = config.market.timezone()?;
    let strategy = &config.strategy;

    let dispatcher = SignalDispatcher::from_config(&config.publisher, dry_run)?;
    let provider = build_provider(&config, None)?;

    println!("{}", "=".repeat(60));
    println!("QUICK FLIP SCALPER");
    println!("{}", "=".repeat(60));
    println!("Symbols:             {}", symbols.iter().map(Symbol::as_str).collect::<Vec<_>>().join(", "));
    println!("ATR Period:          {}", strategy.atr_period);
    println!("Liquidity Threshold: {:.0}%", strategy.liquidity_threshold * 100.0);
    println!("Scan Window:         {} - {}", strategy.scan_start(), strategy.scan_end);
    println!("Scan Interval:       {} minutes", config.market.scan_interval_minutes);
    println!("Dry Run:             {}", dry_run);
    println!("Immediate:           {}", immediate);

    if immediate {
        println!("\n[IMMEDIATE MODE] Running now...");
    } else {
        wait_for_scan_start(strategy, tz);
    }

    let mut sessions = initialize_sessions(provider.as_ref(), &symbols, strategy, config.data.daily_lookback_days, tz);
    if sessions.iter().all(LiveSession::is_finished) {
        println!("No session passed the liquidity gate - exiting.");
        return Ok(());
    }

    println!("\n{}", "=".repeat(60));
    println!("SCAN LOOP");
    println!(
        "Scanning every {} minutes until {}",
        config.market.scan_interval_minutes, strategy.scan_end
    );
    println!("{}", "=".repeat(60));

    let interval = StdDuration::from_secs(config.market.scan_interval_minutes * 60);
    loop {
        let now = now_in(tz);
        if now.time() > strategy.scan_end {
            for session in sessions.iter_mut() {
                session.close()?;
            }
            println!("\n{}", "=".repeat(60));
            println!("SESSION ENDED - {}", strategy.scan_end);
            println!("{}", "=".repeat(60));
            break;
        }

        println!("\n[{}] Scanning for signals...", now.format("%H:%M:%S"));
        for session in sessions.iter_mut().filter(|s| !s.is_finished()) {
            match scan_once(provider.as_ref(), session, now) {
                Ok(Some(candidate)) => send(&dispatcher, &candidate),
                Ok(None) => println!("   {}: no pattern detected", session.symbol()),
                Err(e) if e.is_recoverable() => warn!("{}: scan skipped: {}", session.symbol(), e),
                Err(e) => return Err(e.into()),
            }
        }

        if sessions.iter().all(LiveSession::is_finished) {
            println!("\nAll sessions finished - stopping scan loop");
            break;
        }

        println!("   Sleeping for {} minutes...", config.market.scan_interval_minutes);
        std::thread::sleep(interval);
    }

    for session in &sessions {
        info!("{}: final state {}", session.symbol(), session.state());
    }
    Ok(())
}

fn wait_for_scan_start(strategy: &StrategyConfig, tz: Tz) {
    let now = now_in(tz);
    let start = now.date_naive().and_time(strategy.scan_start());
    let wait = start - now.naive_local();
    if let Ok(wait) = wait.to_std() {
        println!(
            "\nWaiting for {}... ({:.1} minutes)",
            strategy.scan_start(),
            wait.as_secs_f64() / 60.0
        );
        std::thread::sleep(wait);
    }
}

fn initialize_sessions<'a>(
    provider: &dyn DataProvider,
    symbols: &[Symbol],
    strategy: &'a StrategyConfig,
    daily_lookback_days: i64,
    tz: Tz,
) -> Vec<LiveSession<'a>> {
    println!("\n{}", "=".repeat(60));
    println!("INITIALIZATION PHASE");
    println!("{}", "=".repeat(60));

    let now = now_in(tz);
    let today = now.date_naive();
    let mut sessions = Vec::new();
    for symbol in symbols {
        let data = match SymbolData::fetch(provider, symbol, today, today, daily_lookback_days) {
            Ok(data) => data,
            Err(e) => {
                error!("{}: data fetch failed: {}", symbol, e);
                println!("{}: error during initialization: {}", symbol, e);
                continue;
            }
        };

        match LiveSession::initialize(symbol, now, &data, strategy) {
            Ok(session) => {
                let check = session.liquidity();
                println!(
                    "{}: ATR {:.2}, box range {:.2} (required {:.2})",
                    symbol, check.atr, check.range, check.required
                );
                if let SessionState::Rejected { .. } = session.state() {
                    println!("   ✗ Insufficient liquidity - no trading today");
                } else {
                    println!("   ✓ Liquidity validated");
                    sessions.push(session);
                }
            }
            Err(e) => println!("{}: no session today: {}", symbol, e),
        }
    }
    sessions
}

/// Refetch today's 5m bars and evaluate the latest completed one
fn scan_once(
    provider: &dyn DataProvider,
    session: &mut LiveSession<'_>,
    now: DateTime<Tz>,
) -> Result<Option<TradeCandidate>, ScalperError> {
    let today = now.date_naive();
    let five = provider.fetch_bars(session.symbol(), Interval::FiveMinute, today, today)?;
    session.poll(&five, now)
}

fn send(dispatcher: &SignalDispatcher, candidate: &TradeCandidate) {
    println!("🎯 SIGNAL: {} {}", candidate.direction, candidate.symbol);
    println!("   Pattern: {}", candidate.pattern);
    println!("   Entry:   ${}", candidate.entry_price);
    println!("   Target:  ${}", candidate.target_price);
    println!("   Stop:    ${}", candidate.stop_loss);

    match dispatcher.dispatch(candidate) {
        Ok(report) => info!(
            "{}: signal sent (published={}, ordered={})",
            candidate.symbol, report.published, report.ordered
        ),
        Err(e) => error!("{}: signal not delivered: {}", candidate.symbol, e),
    }
}

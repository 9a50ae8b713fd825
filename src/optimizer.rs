//! Parameter grid search
//!
//! Every grid point is a plain [`StrategyConfig`] replayed through the same
//! session scanner the backtest and live modes use. Data is fetched once and
//! shared by all combinations.

use indicatif::ProgressBar;
use itertools::iproduct;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use crate::config::OptimizerConfig;
use crate::data::SymbolData;
use crate::engine::replay_symbol_day;
use crate::quick_flip::StrategyConfig;
use crate::types::{Outcome, Symbol, TradeRecord};

/// Expand the grid over `base`; fields outside the grid keep their base values
pub fn generate_configs(base: &StrategyConfig, grid: &OptimizerConfig) -> Vec<StrategyConfig> {
    iproduct!(
        grid.liquidity_thresholds.iter(),
        grid.profit_targets.iter(),
        grid.stop_rules.iter(),
        grid.scan_ends.iter()
    )
    .map(|(&threshold, &target, &stop, &scan_end)| StrategyConfig {
        liquidity_threshold: threshold,
        profit_target: target,
        stop_loss: stop,
        scan_end,
        ..base.clone()
    })
    .filter(|config| config.validate().is_ok())
    .collect()
}

/// Dollar result of one trade sized at `notional` buying power
pub fn dollar_pnl(trade: &TradeRecord, notional: f64) -> f64 {
    let entry = trade.entry_price.to_f64();
    if entry <= 0.0 {
        return 0.0;
    }
    trade.pnl.to_f64() * notional / entry
}

/// Optimization result for a single parameter combination
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub label: String,
    #[serde(skip)]
    pub config: StrategyConfig,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Sum of dollar P&L across all symbols and dates
    pub total_pnl: f64,
}

impl OptimizationResult {
    fn from_trades(config: &StrategyConfig, trades: &[TradeRecord], notional: f64) -> Self {
        let wins = trades.iter().filter(|t| t.outcome == Outcome::Win).count();
        let losses = trades.iter().filter(|t| t.outcome == Outcome::Loss).count();
        let dollars: Vec<f64> = trades.iter().map(|t| dollar_pnl(t, notional)).collect();

        let gross_profit: f64 = dollars.iter().filter(|&&p| p > 0.0).sum();
        let gross_loss: f64 = dollars.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        Self {
            label: config.label(),
            config: config.clone(),
            trades: trades.len(),
            wins,
            losses,
            win_rate: if trades.is_empty() {
                0.0
            } else {
                wins as f64 / trades.len() as f64 * 100.0
            },
            profit_factor,
            total_pnl: dollars.iter().sum(),
        }
    }
}

pub struct Optimizer<'a> {
    data: &'a [(Symbol, SymbolData)],
    notional: f64,
}

impl<'a> Optimizer<'a> {
    pub fn new(data: &'a [(Symbol, SymbolData)], grid: &OptimizerConfig) -> Self {
        Optimizer {
            data,
            notional: grid.position_notional(),
        }
    }

    /// Replay every loaded symbol and date under one configuration
    pub fn evaluate(&self, config: &StrategyConfig) -> OptimizationResult {
        let mut trades = Vec::new();
        for (symbol, data) in self.data {
            for date in data.trading_dates() {
                match replay_symbol_day(data, symbol, date, config) {
                    Ok(day) => {
                        if let (Some(candidate), Some(outcome)) = (&day.candidate, &day.outcome) {
                            trades.push(TradeRecord::new(candidate, outcome));
                        }
                    }
                    Err(e) => debug!("{} {}: {}", symbol, date, e),
                }
            }
        }
        OptimizationResult::from_trades(config, &trades, self.notional)
    }

    /// Evaluate all configurations, in parallel unless `sequential`
    pub fn optimize(
        &self,
        configs: &[StrategyConfig],
        progress_bar: &ProgressBar,
        sequential: bool,
    ) -> Vec<OptimizationResult> {
        info!(
            "Testing {} parameter combinations across {} symbols",
            configs.len(),
            self.data.len()
        );

        let traded = AtomicUsize::new(0);
        let run = |config: &StrategyConfig| {
            let result = self.evaluate(config);
            progress_bar.inc(1);
            if result.trades > 0 {
                let count = traded.fetch_add(1, Ordering::Relaxed) + 1;
                progress_bar.set_message(format!("{} with trades", count));
            }
            result
        };

        let mut results: Vec<OptimizationResult> = if sequential {
            configs.iter().map(run).collect()
        } else {
            configs.par_iter().map(run).collect()
        };

        sort_results(&mut results);
        results
    }
}

/// Highest total dollar P&L first
pub fn sort_results(results: &mut [OptimizationResult]) {
    results.sort_by_key(|r| std::cmp::Reverse(OrderedFloat(r.total_pnl)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quick_flip::{ProfitTarget, StopRule};
    use crate::types::{Bar, BarSeries, Interval};
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveTime, TimeZone};
    use chrono_tz::America::New_York;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn fixture() -> Vec<(Symbol, SymbolData)> {
        let symbol = Symbol::new("TEST");
        let first = New_York.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap();
        let daily = (0..20)
            .map(|i| Bar::new_unchecked(first + Duration::days(i), 145.0, 150.0, 140.0, 145.0, 1e6))
            .collect();
        let bar = |h, m, o, hi, lo, c| {
            Bar::new_unchecked(New_York.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap(), o, hi, lo, c, 1000.0)
        };
        let five = vec![
            bar(9, 30, 147.0, 150.0, 146.5, 148.0),
            bar(9, 35, 148.0, 149.0, 145.0, 146.0),
            bar(9, 40, 146.0, 147.0, 145.5, 146.5),
            bar(9, 45, 146.5, 147.0, 145.5, 145.6),
            bar(9, 50, 144.0, 144.5, 143.0, 144.4),
            bar(9, 55, 144.4, 147.0, 144.0, 146.8),
            bar(10, 0, 146.8, 150.5, 146.5, 150.2),
        ];
        let data = SymbolData {
            daily: BarSeries::new(symbol.clone(), Interval::Daily, daily).unwrap(),
            fifteen: None,
            five: BarSeries::new(symbol.clone(), Interval::FiveMinute, five).unwrap(),
        };
        vec![(symbol, data)]
    }

    fn grid() -> OptimizerConfig {
        OptimizerConfig {
            liquidity_thresholds: vec![0.6, 0.25],
            profit_targets: vec![ProfitTarget::Box],
            stop_rules: vec![StopRule::Tight],
            scan_ends: vec![hm(10, 45)],
            ..OptimizerConfig::default()
        }
    }

    #[test]
    fn test_generate_configs_is_full_product() {
        let base = StrategyConfig::new(hm(11, 0));
        let configs = generate_configs(&base, &OptimizerConfig::default());
        assert_eq!(configs.len(), 3 * 3 * 2 * 3);
        assert!(configs.iter().all(|c| c.atr_period == base.atr_period));
        assert_eq!(configs[0].liquidity_threshold, 0.15);
        assert_eq!(configs[0].scan_end, hm(10, 45));
    }

    #[test]
    fn test_optimize_ranks_by_dollar_pnl() {
        let data = fixture();
        let grid = grid();
        let configs = generate_configs(&StrategyConfig::new(hm(11, 0)), &grid);
        let optimizer = Optimizer::new(&data, &grid);

        let results = optimizer.optimize(&configs, &ProgressBar::hidden(), true);
        assert_eq!(results.len(), 2);

        // box range 5 vs ATR 10: only the 0.25 threshold trades
        let best = &results[0];
        assert_eq!(best.config.liquidity_threshold, 0.25);
        assert_eq!(best.trades, 1);
        assert_eq!(best.wins, 1);
        assert_relative_eq!(best.total_pnl, 5.5 * 5000.0 / 144.5, epsilon = 1e-9);
        assert!(best.profit_factor.is_infinite());

        assert_eq!(results[1].trades, 0);
        assert_eq!(results[1].total_pnl, 0.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let data = fixture();
        let grid = grid();
        let configs = generate_configs(&StrategyConfig::new(hm(11, 0)), &grid);
        let optimizer = Optimizer::new(&data, &grid);

        let sequential = optimizer.optimize(&configs, &ProgressBar::hidden(), true);
        let parallel = optimizer.optimize(&configs, &ProgressBar::hidden(), false);
        let labels = |r: &[OptimizationResult]| r.iter().map(|x| x.label.clone()).collect::<Vec<_>>();
        assert_eq!(labels(&sequential), labels(&parallel));
    }
}

//! Quick Flip strategy configuration
//!
//! One value object drives the live scanner, the backtester and every
//! optimizer variant.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScalperError};

/// How the take-profit level is placed
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProfitTarget {
    /// Opposite side of the box (box high for longs, box low for shorts)
    #[default]
    Box,
    /// Entry plus `multiple` times the entry-to-stop distance
    RiskMultiple { multiple: f64 },
}

impl std::fmt::Display for ProfitTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfitTarget::Box => f.write_str("box"),
            ProfitTarget::RiskMultiple { multiple } => write!(f, "1:{}", multiple),
        }
    }
}

/// How the stop-loss level is placed
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopRule {
    /// Signal bar extreme (or pair extreme for engulfing patterns)
    #[default]
    Tight,
    /// Tight stop pushed further away by `box_fraction` of the box range
    Wide { box_fraction: f64 },
}

impl std::fmt::Display for StopRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopRule::Tight => f.write_str("tight"),
            StopRule::Wide { box_fraction } => write!(f, "wide({})", box_fraction),
        }
    }
}

fn default_atr_period() -> usize {
    14
}

fn default_liquidity_threshold() -> f64 {
    0.25
}

fn default_hammer_wick_ratio() -> f64 {
    2.0
}

fn default_opposite_wick_ratio() -> f64 {
    0.5
}

fn default_session_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN)
}

fn default_box_minutes() -> u32 {
    15
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Daily bars averaged for ATR (default: 14)
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    /// Minimum box range as a fraction of ATR (default: 0.25)
    #[serde(default = "default_liquidity_threshold")]
    pub liquidity_threshold: f64,

    /// Long wick must be at least this multiple of the body (default: 2.0)
    #[serde(default = "default_hammer_wick_ratio")]
    pub hammer_wick_ratio: f64,

    /// Short wick may be at most this multiple of the body (default: 0.5)
    #[serde(default = "default_opposite_wick_ratio")]
    pub opposite_wick_ratio: f64,

    /// Exchange-local session open (default: 09:30)
    #[serde(default = "default_session_open")]
    pub session_open: NaiveTime,

    /// Length of the opening range (default: 15)
    #[serde(default = "default_box_minutes")]
    pub box_minutes: u32,

    /// Last bar open time considered by the scanner. No default: deployments
    /// have run with both 10:45 and 11:00.
    pub scan_end: NaiveTime,

    #[serde(default)]
    pub profit_target: ProfitTarget,

    #[serde(default)]
    pub stop_loss: StopRule,
}

impl StrategyConfig {
    pub fn new(scan_end: NaiveTime) -> Self {
        Self {
            atr_period: default_atr_period(),
            liquidity_threshold: default_liquidity_threshold(),
            hammer_wick_ratio: default_hammer_wick_ratio(),
            opposite_wick_ratio: default_opposite_wick_ratio(),
            session_open: default_session_open(),
            box_minutes: default_box_minutes(),
            scan_end,
            profit_target: ProfitTarget::default(),
            stop_loss: StopRule::default(),
        }
    }

    /// First bar open time eligible for pattern scanning
    pub fn scan_start(&self) -> NaiveTime {
        self.session_open + self.box_duration()
    }

    pub fn box_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.box_minutes))
    }

    pub fn in_scan_window(&self, time: NaiveTime) -> bool {
        time >= self.scan_start() && time <= self.scan_end
    }

    pub fn validate(&self) -> Result<()> {
        if self.atr_period == 0 {
            return Err(ScalperError::InvalidConfiguration(
                "atr_period must be at least 1".into(),
            ));
        }
        if self.liquidity_threshold.is_nan() || self.liquidity_threshold < 0.0 {
            return Err(ScalperError::InvalidConfiguration(format!(
                "liquidity_threshold must be non-negative, got {}",
                self.liquidity_threshold
            )));
        }
        if self.hammer_wick_ratio <= 0.0 || self.opposite_wick_ratio < 0.0 {
            return Err(ScalperError::InvalidConfiguration(
                "wick ratios must be positive".into(),
            ));
        }
        if self.box_minutes == 0 {
            return Err(ScalperError::InvalidConfiguration(
                "box_minutes must be at least 1".into(),
            ));
        }
        if self.scan_end < self.scan_start() {
            return Err(ScalperError::InvalidConfiguration(format!(
                "scan_end {} is before scan start {}",
                self.scan_end,
                self.scan_start()
            )));
        }
        if let ProfitTarget::RiskMultiple { multiple } = self.profit_target {
            if multiple <= 0.0 {
                return Err(ScalperError::InvalidConfiguration(format!(
                    "risk multiple must be positive, got {}",
                    multiple
                )));
            }
        }
        if let StopRule::Wide { box_fraction } = self.stop_loss {
            if box_fraction < 0.0 {
                return Err(ScalperError::InvalidConfiguration(format!(
                    "wide stop box_fraction must be non-negative, got {}",
                    box_fraction
                )));
            }
        }
        Ok(())
    }

    /// Short label for optimizer tables
    pub fn label(&self) -> String {
        format!(
            "liq={:.2} target={} stop={} end={}",
            self.liquidity_threshold,
            self.profit_target,
            self.stop_loss,
            self.scan_end.format("%H:%M")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_end_is_required() {
        let json = r#"{ "liquidity_threshold": 0.35 }"#;
        assert!(serde_json::from_str::<StrategyConfig>(json).is_err());
    }

    #[test]
    fn test_defaults_fill_in() {
        let json = r#"{
            "scan_end": "10:45:00",
            "profit_target": { "type": "risk_multiple", "multiple": 2.0 },
            "stop_loss": { "type": "wide", "box_fraction": 0.1 }
        }"#;
        let config: StrategyConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.atr_period, 14);
        assert_eq!(config.liquidity_threshold, 0.25);
        assert_eq!(config.scan_start(), NaiveTime::from_hms_opt(9, 45, 0).unwrap());
        assert_eq!(config.profit_target, ProfitTarget::RiskMultiple { multiple: 2.0 });
        assert_eq!(config.stop_loss, StopRule::Wide { box_fraction: 0.1 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scan_window_inclusive() {
        let config = StrategyConfig::new(NaiveTime::from_hms_opt(10, 45, 0).unwrap());
        assert!(config.in_scan_window(NaiveTime::from_hms_opt(9, 45, 0).unwrap()));
        assert!(config.in_scan_window(NaiveTime::from_hms_opt(10, 45, 0).unwrap()));
        assert!(!config.in_scan_window(NaiveTime::from_hms_opt(9, 40, 0).unwrap()));
        assert!(!config.in_scan_window(NaiveTime::from_hms_opt(10, 50, 0).unwrap()));
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let config = StrategyConfig::new(NaiveTime::from_hms_opt(9, 35, 0).unwrap());
        assert!(matches!(
            config.validate(),
            Err(ScalperError::InvalidConfiguration(_))
        ));
    }
}

//! Candlestick reversal patterns
//!
//! Stateless predicates over one bar or a (current, previous) pair. The free
//! functions use the standard 2.0 / 0.5 wick ratios; [`PatternRules`] carries
//! configured ratios for the scanner.

use crate::types::{Bar, Direction, Pattern};

use super::config::StrategyConfig;

/// Bodies smaller than this are treated as this size
pub const MIN_BODY: f64 = 0.001;

const DEFAULT_WICK_RATIO: f64 = 2.0;
const DEFAULT_OPPOSITE_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Anatomy {
    body: f64,
    upper_wick: f64,
    lower_wick: f64,
}

impl Anatomy {
    fn of(bar: &Bar) -> Self {
        let body = (bar.close - bar.open).abs().max(MIN_BODY);
        Self {
            body,
            upper_wick: bar.high - bar.open.max(bar.close),
            lower_wick: bar.open.min(bar.close) - bar.low,
        }
    }
}

/// Wick-ratio thresholds for the single-bar patterns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternRules {
    pub wick_ratio: f64,
    pub opposite_ratio: f64,
}

impl Default for PatternRules {
    fn default() -> Self {
        Self {
            wick_ratio: DEFAULT_WICK_RATIO,
            opposite_ratio: DEFAULT_OPPOSITE_RATIO,
        }
    }
}

impl From<&StrategyConfig> for PatternRules {
    fn from(config: &StrategyConfig) -> Self {
        Self {
            wick_ratio: config.hammer_wick_ratio,
            opposite_ratio: config.opposite_wick_ratio,
        }
    }
}

impl PatternRules {
    /// Long lower wick, little or no upper wick
    pub fn is_hammer(&self, bar: &Bar) -> bool {
        let a = Anatomy::of(bar);
        a.lower_wick >= self.wick_ratio * a.body && a.upper_wick <= self.opposite_ratio * a.body
    }

    /// Long upper wick, little or no lower wick
    pub fn is_inverted_hammer(&self, bar: &Bar) -> bool {
        let a = Anatomy::of(bar);
        a.upper_wick >= self.wick_ratio * a.body && a.lower_wick <= self.opposite_ratio * a.body
    }

    /// First pattern matching `direction`, single-bar patterns before engulfing
    pub fn classify(&self, direction: Direction, current: &Bar, previous: &Bar) -> Option<Pattern> {
        match direction {
            Direction::Long => {
                if self.is_hammer(current) {
                    Some(Pattern::Hammer)
                } else if is_bullish_engulfing(current, previous) {
                    Some(Pattern::BullishEngulfing)
                } else {
                    None
                }
            }
            Direction::Short => {
                if self.is_inverted_hammer(current) {
                    Some(Pattern::InvertedHammer)
                } else if is_bearish_engulfing(current, previous) {
                    Some(Pattern::BearishEngulfing)
                } else {
                    None
                }
            }
        }
    }
}

pub fn is_hammer(bar: &Bar) -> bool {
    PatternRules::default().is_hammer(bar)
}

pub fn is_inverted_hammer(bar: &Bar) -> bool {
    PatternRules::default().is_inverted_hammer(bar)
}

/// Bearish previous bar whose body sits strictly inside a bullish current body
pub fn is_bullish_engulfing(current: &Bar, previous: &Bar) -> bool {
    previous.is_bearish()
        && current.is_bullish()
        && current.close > previous.open
        && current.open < previous.close
}

/// Bullish previous bar whose body sits strictly inside a bearish current body
pub fn is_bearish_engulfing(current: &Bar, previous: &Bar) -> bool {
    previous.is_bullish()
        && current.is_bearish()
        && current.open > previous.close
        && current.close < previous.open
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn ohlc(open: f64, high: f64, low: f64, close: f64) -> Bar {
        let ts = New_York.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        Bar::new_unchecked(ts, open, high, low, close, 1000.0)
    }

    #[test]
    fn test_hammer_example() {
        // lower wick 3.0 >= 2.0, upper wick 0.2 <= 0.5
        let bar = ohlc(100.0, 101.2, 97.0, 101.0);
        assert!(is_hammer(&bar));
        assert!(!is_inverted_hammer(&bar));
    }

    #[test]
    fn test_inverted_hammer() {
        let bar = ohlc(101.0, 104.0, 99.8, 100.0);
        assert!(is_inverted_hammer(&bar));
        assert!(!is_hammer(&bar));
    }

    #[test]
    fn test_hammer_rejects_long_upper_wick() {
        let bar = ohlc(100.0, 102.0, 97.0, 101.0);
        assert!(!is_hammer(&bar));
    }

    #[test]
    fn test_hammer_and_inverted_exclusive_with_body() {
        let bars = [
            ohlc(100.0, 101.2, 97.0, 101.0),
            ohlc(101.0, 104.0, 99.8, 100.0),
            ohlc(100.0, 103.0, 97.0, 100.5),
            ohlc(100.0, 100.1, 99.9, 100.05),
            ohlc(50.0, 60.0, 40.0, 55.0),
        ];
        for bar in &bars {
            assert!(!(is_hammer(bar) && is_inverted_hammer(bar)), "{:?}", bar);
        }
    }

    #[test]
    fn test_doji_edge_cases() {
        // zero body floors to 0.001; flat bar has no wicks at all
        let flat = ohlc(100.0, 100.0, 100.0, 100.0);
        assert!(!is_hammer(&flat));
        assert!(!is_inverted_hammer(&flat));

        // dragonfly doji: long lower wick, no upper wick
        let dragonfly = ohlc(100.0, 100.0, 98.0, 100.0);
        assert!(is_hammer(&dragonfly));
        assert!(!is_inverted_hammer(&dragonfly));

        // long-legged doji: both wicks exceed 0.5 * floored body
        let long_legged = ohlc(100.0, 102.0, 98.0, 100.0);
        assert!(!is_hammer(&long_legged));
        assert!(!is_inverted_hammer(&long_legged));
    }

    #[test]
    fn test_bullish_engulfing_example() {
        let previous = ohlc(102.0, 102.5, 100.0, 100.5);
        let current = ohlc(100.0, 103.0, 99.5, 102.5);
        assert!(is_bullish_engulfing(&current, &previous));
        assert!(!is_bearish_engulfing(&current, &previous));
    }

    #[test]
    fn test_bearish_engulfing() {
        let previous = ohlc(100.0, 102.5, 99.8, 102.0);
        let current = ohlc(102.5, 103.0, 99.0, 99.5);
        assert!(is_bearish_engulfing(&current, &previous));
        assert!(!is_bullish_engulfing(&current, &previous));
    }

    #[test]
    fn test_engulfing_touching_boundaries_rejected() {
        let previous = ohlc(102.0, 102.5, 100.0, 100.5);
        let touching_open = ohlc(100.5, 103.0, 99.5, 102.5);
        let touching_close = ohlc(100.0, 103.0, 99.5, 102.0);
        assert!(!is_bullish_engulfing(&touching_open, &previous));
        assert!(!is_bullish_engulfing(&touching_close, &previous));
    }

    #[test]
    fn test_classify_precedence() {
        // current is both a hammer and a bullish engulfing of previous
        let previous = ohlc(100.6, 100.7, 100.2, 100.3);
        let current = ohlc(100.2, 101.05, 98.0, 101.0);
        let rules = PatternRules::default();
        assert!(is_bullish_engulfing(&current, &previous));
        assert_eq!(
            rules.classify(Direction::Long, &current, &previous),
            Some(Pattern::Hammer)
        );
        assert_eq!(rules.classify(Direction::Short, &current, &previous), None);
    }
}

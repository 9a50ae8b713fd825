//! Trade parameterizer: pattern + bars + box -> entry/stop/target
//!
//! Levels are computed in full precision and rounded to cents only when the
//! candidate is emitted.

use tracing::debug;

use crate::types::{Bar, Direction, Money, Pattern, SessionBox, Symbol, TradeCandidate};

use super::config::{ProfitTarget, StopRule, StrategyConfig};

pub use crate::types::TradeLevels;

/// Entry/stop/target for a pattern under the configured rules
pub fn trade_levels(
    pattern: Pattern,
    current: &Bar,
    previous: &Bar,
    session_box: &SessionBox,
    config: &StrategyConfig,
) -> TradeLevels {
    let (entry, tight_stop) = match pattern {
        Pattern::Hammer => (current.high, current.low),
        Pattern::BullishEngulfing => (previous.high, current.low.min(previous.low)),
        Pattern::InvertedHammer => (current.low, current.high),
        Pattern::BearishEngulfing => (previous.low, current.high.max(previous.high)),
    };

    let direction = pattern.direction();
    let stop = match config.stop_loss {
        StopRule::Tight => tight_stop,
        StopRule::Wide { box_fraction } => {
            let pad = box_fraction * session_box.range();
            match direction {
                Direction::Long => tight_stop - pad,
                Direction::Short => tight_stop + pad,
            }
        }
    };

    let target = match (config.profit_target, direction) {
        (ProfitTarget::Box, Direction::Long) => session_box.high,
        (ProfitTarget::Box, Direction::Short) => session_box.low,
        (ProfitTarget::RiskMultiple { multiple }, Direction::Long) => {
            entry + multiple * (entry - stop)
        }
        (ProfitTarget::RiskMultiple { multiple }, Direction::Short) => {
            entry - multiple * (stop - entry)
        }
    };

    TradeLevels {
        entry,
        stop,
        target,
    }
}

/// Build the emitted candidate, rounding every price to cents
pub fn build_candidate(
    symbol: &Symbol,
    pattern: Pattern,
    current: &Bar,
    previous: &Bar,
    session_box: &SessionBox,
    atr: f64,
    config: &StrategyConfig,
) -> TradeCandidate {
    let levels = trade_levels(pattern, current, previous, session_box, config);
    debug!(
        %symbol,
        %pattern,
        entry = levels.entry,
        stop = levels.stop,
        target = levels.target,
        "trade levels"
    );

    TradeCandidate {
        symbol: symbol.clone(),
        direction: pattern.direction(),
        pattern,
        entry_price: Money::cents(levels.entry),
        stop_loss: Money::cents(levels.stop),
        target_price: Money::cents(levels.target),
        box_high: Money::cents(session_box.high),
        box_low: Money::cents(session_box.low),
        atr: Money::cents(atr),
        timestamp: current.timestamp,
        levels,
    }
}

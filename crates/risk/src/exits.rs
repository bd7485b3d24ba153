//! Per-bar exit evaluation for an open position.
//!
//! Triggers are checked in a fixed priority order and the first match
//! wins, so a bar produces at most one liquidate instruction.

use common::{ExchangeKind, ExitDecision, PositionSide, TrendVerdict};
use tracing::debug;

/// RSI level above which a long is considered moderately extended and
/// opposite momentum is enough to exit.
const EXHAUSTION_UPPER: f64 = 60.0;
/// Mirror level for shorts.
const EXHAUSTION_LOWER: f64 = 40.0;

/// Which exit paths are armed for a profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitRules {
    /// Unconditional flatten once a position has been held this many
    /// bars. `None` disables the timeout.
    pub max_hold_candles: Option<u32>,
    /// RSI exhaustion / opposite-momentum exit.
    pub oscillator_exit: bool,
    /// Confirmed-opposite-trend exit (needs the trend filter).
    pub trend_reversal_exit: bool,
    /// Fraction of the liquidation price counted as "too close".
    pub liquidation_buffer: f64,
}

/// Why a position was flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    LiquidationGuard,
    MaxHold,
    OscillatorExhaustion,
    TrendReversal,
}

impl std::fmt::Display for ExitTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitTrigger::LiquidationGuard => write!(f, "liquidation guard"),
            ExitTrigger::MaxHold => write!(f, "max hold timeout"),
            ExitTrigger::OscillatorExhaustion => write!(f, "oscillator exhaustion"),
            ExitTrigger::TrendReversal => write!(f, "trend reversal"),
        }
    }
}

/// Oscillator readings for the current bar, present when the profile
/// arms the oscillator exit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorState {
    pub rsi: f64,
    pub momentum_bullish: bool,
    pub momentum_bearish: bool,
    pub overbought: f64,
    pub oversold: f64,
}

/// Trend readings for the current bar, present when the trend filter
/// is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendState {
    pub verdict: TrendVerdict,
    pub ema_fast: f64,
}

/// Everything the exit machine looks at for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitInputs {
    pub side: PositionSide,
    pub close: f64,
    /// Bars since entry, when the entry bar is known.
    pub bars_held: Option<u32>,
    pub exchange: ExchangeKind,
    pub liquidation_price: Option<f64>,
    pub oscillator: Option<OscillatorState>,
    pub trend: Option<TrendState>,
    pub rules: ExitRules,
}

/// First matching trigger in priority order, or `None` to hold.
pub fn evaluate(inputs: &ExitInputs) -> Option<ExitTrigger> {
    let trigger = first_trigger(inputs);
    if let Some(t) = trigger {
        debug!(side = %inputs.side, %t, close = inputs.close, "exit trigger matched");
    }
    trigger
}

fn first_trigger(inputs: &ExitInputs) -> Option<ExitTrigger> {
    if inputs.side == PositionSide::Flat {
        return None;
    }

    if liquidation_guard(inputs) {
        return Some(ExitTrigger::LiquidationGuard);
    }

    if let (Some(held), Some(max)) = (inputs.bars_held, inputs.rules.max_hold_candles) {
        if held >= max {
            return Some(ExitTrigger::MaxHold);
        }
    }

    if inputs.rules.oscillator_exit && oscillator_exhausted(inputs) {
        return Some(ExitTrigger::OscillatorExhaustion);
    }

    if inputs.rules.trend_reversal_exit && trend_reversed(inputs) {
        return Some(ExitTrigger::TrendReversal);
    }

    None
}

/// Convenience wrapper mapping a trigger to the hold/liquidate verdict.
pub fn decide(inputs: &ExitInputs) -> ExitDecision {
    match evaluate(inputs) {
        Some(_) => ExitDecision::Liquidate,
        None => ExitDecision::Hold,
    }
}

/// Pre-emptive flatten when price drifts within the buffer of the
/// venue's liquidation price. Margin venues only; an absent
/// liquidation price means "not near".
fn liquidation_guard(inputs: &ExitInputs) -> bool {
    if inputs.exchange != ExchangeKind::Futures {
        return false;
    }
    let Some(liq) = inputs.liquidation_price else {
        return false;
    };
    if liq <= 0.0 {
        return false;
    }
    match inputs.side {
        // A long gets liquidated from below: guard when price sinks to
        // within the buffer above the liquidation level.
        PositionSide::Long => inputs.close <= liq * (1.0 + inputs.rules.liquidation_buffer),
        PositionSide::Short => inputs.close >= liq * (1.0 - inputs.rules.liquidation_buffer),
        PositionSide::Flat => false,
    }
}

/// RSI has crossed back through the opposite extreme, or shows
/// opposite momentum while moderately extended.
fn oscillator_exhausted(inputs: &ExitInputs) -> bool {
    let Some(osc) = inputs.oscillator else {
        return false;
    };
    match inputs.side {
        PositionSide::Long => {
            osc.rsi >= osc.overbought || (osc.rsi > EXHAUSTION_UPPER && osc.momentum_bearish)
        }
        PositionSide::Short => {
            osc.rsi <= osc.oversold || (osc.rsi < EXHAUSTION_LOWER && osc.momentum_bullish)
        }
        PositionSide::Flat => false,
    }
}

/// A confirmed opposite trend has formed and price has crossed the
/// fast EMA against the position.
fn trend_reversed(inputs: &ExitInputs) -> bool {
    let Some(trend) = inputs.trend else {
        return false;
    };
    match inputs.side {
        PositionSide::Long => {
            trend.verdict == TrendVerdict::Bearish && inputs.close < trend.ema_fast
        }
        PositionSide::Short => {
            trend.verdict == TrendVerdict::Bullish && inputs.close > trend.ema_fast
        }
        PositionSide::Flat => false,
    }
}

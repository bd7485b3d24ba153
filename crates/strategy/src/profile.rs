//! Strategy profiles: one generic evaluator, two built-in
//! parameterizations.
//!
//! The oscillator profile trades RSI reversals with optional trend,
//! volume and proximity filters; the trend-following profile trades
//! dual-timeframe TEMA agreement gated by ADX and CMO strength. Both
//! share the same risk and exit machinery and differ only in
//! configuration.

use common::{HyperParams, ParamSpec, Timeframe};
use risk::{ExitRules, RiskParams};

/// ATR, ADX and CMO period used where the profile exposes no knob.
const DEFAULT_INDICATOR_PERIOD: usize = 14;

/// Volume average window for the volume filter.
pub(crate) const VOLUME_SMA_PERIOD: usize = 20;

/// Ordered parameter table for the oscillator profile.
pub const OSCILLATOR_PARAMS: &[ParamSpec] = &[
    ParamSpec::int("rsi_period", 10, 20, 14),
    ParamSpec::int("rsi_overbought", 65, 85, 70),
    ParamSpec::int("rsi_oversold", 15, 35, 30),
    ParamSpec::int("rsi_momentum_period", 2, 5, 3),
    ParamSpec::int("trend_ema_fast", 20, 50, 34),
    ParamSpec::int("trend_ema_slow", 50, 200, 100),
    ParamSpec::bool("use_trend_filter", true),
    ParamSpec::int("higher_tf_period", 50, 200, 100),
    ParamSpec::float("risk_percentage", 0.5, 3.0, 0.1, 1.0),
    ParamSpec::int("atr_period", 10, 20, 14),
    ParamSpec::float("stop_loss_atr_mult", 1.5, 4.0, 0.1, 2.5),
    ParamSpec::float("take_profit_atr_mult", 2.0, 6.0, 0.1, 3.5),
    ParamSpec::bool("use_volume_filter", false),
    ParamSpec::int("max_hold_candles", 20, 100, 50),
    ParamSpec::float("max_capital_per_trade", 0.1, 1.0, 0.05, 1.0),
];

/// Ordered parameter table for the trend-following profile.
pub const TREND_FOLLOWING_PARAMS: &[ParamSpec] = &[
    ParamSpec::int("tema_short_period", 5, 20, 10),
    ParamSpec::int("tema_medium_period", 50, 120, 80),
    ParamSpec::int("tema_htf_short_period", 10, 40, 20),
    ParamSpec::int("tema_htf_long_period", 50, 100, 70),
    ParamSpec::int("adx_threshold", 20, 60, 40),
    ParamSpec::int("cmo_upper_threshold", 20, 60, 40),
    ParamSpec::int("cmo_lower_threshold", -60, -20, -40),
    ParamSpec::float("entry_atr_offset", 0.5, 2.0, 0.1, 1.0),
    ParamSpec::float("stop_loss_atr_mult", 2.0, 6.0, 0.5, 4.0),
    ParamSpec::float("take_profit_atr_mult", 1.5, 5.0, 0.5, 3.0),
    ParamSpec::float("risk_percentage", 1.0, 5.0, 0.5, 3.0),
    ParamSpec::int("position_multiplier", 1, 5, 3),
    ParamSpec::float("max_capital_per_trade", 0.1, 1.0, 0.05, 1.0),
];

/// Entry-rule parameterization, one per variant.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryRules {
    Oscillator(OscillatorRules),
    TrendFollowing(TrendRules),
}

/// Variant A: RSI reversal with confirmations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorRules {
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub momentum_period: usize,
    pub use_trend_filter: bool,
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    pub higher_tf_ema_period: usize,
    pub use_volume_filter: bool,
}

/// Variant B: dual-timeframe TEMA trend following.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendRules {
    pub tema_short_period: usize,
    pub tema_medium_period: usize,
    pub tema_htf_short_period: usize,
    pub tema_htf_long_period: usize,
    pub adx_period: usize,
    pub adx_threshold: f64,
    pub cmo_period: usize,
    pub cmo_upper: f64,
    pub cmo_lower: f64,
}

/// A fully-resolved strategy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub higher_timeframe: Timeframe,
    pub entry: EntryRules,
    pub risk: RiskParams,
    pub exits: ExitRules,
}

impl Profile {
    /// Build the oscillator profile from a validated parameter set.
    pub fn oscillator(
        name: impl Into<String>,
        symbol: impl Into<String>,
        timeframe: Timeframe,
        higher_timeframe: Timeframe,
        hp: &HyperParams,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            timeframe,
            higher_timeframe,
            entry: EntryRules::Oscillator(OscillatorRules {
                rsi_period: hp.usize("rsi_period"),
                rsi_overbought: hp.int("rsi_overbought") as f64,
                rsi_oversold: hp.int("rsi_oversold") as f64,
                momentum_period: hp.usize("rsi_momentum_period"),
                use_trend_filter: hp.flag("use_trend_filter"),
                ema_fast_period: hp.usize("trend_ema_fast"),
                ema_slow_period: hp.usize("trend_ema_slow"),
                higher_tf_ema_period: hp.usize("higher_tf_period"),
                use_volume_filter: hp.flag("use_volume_filter"),
            }),
            risk: RiskParams {
                risk_percentage: hp.float("risk_percentage"),
                atr_period: hp.usize("atr_period"),
                stop_loss_atr_mult: hp.float("stop_loss_atr_mult"),
                take_profit_atr_mult: hp.float("take_profit_atr_mult"),
                entry_atr_offset: 0.0, // market entry at close
                max_capital_per_trade: hp.float("max_capital_per_trade"),
                position_multiplier: 1,
            },
            exits: ExitRules {
                max_hold_candles: Some(hp.int("max_hold_candles") as u32),
                oscillator_exit: true,
                trend_reversal_exit: hp.flag("use_trend_filter"),
                liquidation_buffer: 0.10,
            },
        }
    }

    /// Build the trend-following profile from a validated parameter
    /// set.
    pub fn trend_following(
        name: impl Into<String>,
        symbol: impl Into<String>,
        timeframe: Timeframe,
        higher_timeframe: Timeframe,
        hp: &HyperParams,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            timeframe,
            higher_timeframe,
            entry: EntryRules::TrendFollowing(TrendRules {
                tema_short_period: hp.usize("tema_short_period"),
                tema_medium_period: hp.usize("tema_medium_period"),
                tema_htf_short_period: hp.usize("tema_htf_short_period"),
                tema_htf_long_period: hp.usize("tema_htf_long_period"),
                adx_period: DEFAULT_INDICATOR_PERIOD,
                adx_threshold: hp.int("adx_threshold") as f64,
                cmo_period: DEFAULT_INDICATOR_PERIOD,
                cmo_upper: hp.int("cmo_upper_threshold") as f64,
                cmo_lower: hp.int("cmo_lower_threshold") as f64,
            }),
            risk: RiskParams {
                risk_percentage: hp.float("risk_percentage"),
                atr_period: DEFAULT_INDICATOR_PERIOD,
                stop_loss_atr_mult: hp.float("stop_loss_atr_mult"),
                take_profit_atr_mult: hp.float("take_profit_atr_mult"),
                entry_atr_offset: hp.float("entry_atr_offset"),
                max_capital_per_trade: hp.float("max_capital_per_trade"),
                position_multiplier: hp.int("position_multiplier") as u32,
            },
            exits: ExitRules {
                max_hold_candles: None,
                oscillator_exit: false,
                trend_reversal_exit: false,
                liquidation_buffer: 0.10,
            },
        }
    }

    /// The ordered optimizer-facing parameter table for this profile's
    /// variant.
    pub fn param_specs(&self) -> Vec<ParamSpec> {
        match self.entry {
            EntryRules::Oscillator(_) => OSCILLATOR_PARAMS.to_vec(),
            EntryRules::TrendFollowing(_) => TREND_FOLLOWING_PARAMS.to_vec(),
        }
    }
}

//! Contract with the external trading framework.
//!
//! The framework owns candles, indicator math, account bookkeeping and
//! order execution. The evaluator reads a consistent snapshot through
//! these traits each bar and writes back order intents; all state
//! mutation happens outside, strictly between bars.

use crate::{Bar, ExchangeKind, PositionView, Result, Timeframe};

/// An indicator request: name + parameters. Hashable so per-bar
/// snapshots can be memoized by (timeframe, spec, sequential).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorSpec {
    Rsi { period: usize },
    Ema { period: usize },
    /// Simple moving average over the volume series.
    VolumeSma { period: usize },
    Atr { period: usize },
    Tema { period: usize },
    Adx { period: usize },
    Cmo { period: usize },
}

impl std::fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndicatorSpec::Rsi { period } => write!(f, "rsi({period})"),
            IndicatorSpec::Ema { period } => write!(f, "ema({period})"),
            IndicatorSpec::VolumeSma { period } => write!(f, "volume_sma({period})"),
            IndicatorSpec::Atr { period } => write!(f, "atr({period})"),
            IndicatorSpec::Tema { period } => write!(f, "tema({period})"),
            IndicatorSpec::Adx { period } => write!(f, "adx({period})"),
            IndicatorSpec::Cmo { period } => write!(f, "cmo({period})"),
        }
    }
}

/// Either the latest value or the full history of an indicator,
/// most-recent element last.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorOutput {
    Scalar(f64),
    Series(Vec<f64>),
}

impl IndicatorOutput {
    /// The latest value, whichever shape was returned.
    pub fn latest(&self) -> Option<f64> {
        match self {
            IndicatorOutput::Scalar(v) => Some(*v),
            IndicatorOutput::Series(s) => s.last().copied(),
        }
    }

    pub fn into_series(self) -> Vec<f64> {
        match self {
            IndicatorOutput::Scalar(v) => vec![v],
            IndicatorOutput::Series(s) => s,
        }
    }
}

/// Per-bar market data and indicator access for the active instrument.
///
/// The provider fetches candles itself; asking for a timeframe it has
/// no data for returns `Err(Error::UnavailableTimeframe)`, which the
/// evaluator recovers from by recomputing on the primary timeframe.
pub trait MarketView {
    /// Index of the current bar, strictly increasing.
    fn bar_index(&self) -> usize;

    /// Close of the current bar.
    fn close(&self) -> f64;

    /// Current traded price (equals `close` at bar boundaries).
    fn price(&self) -> f64;

    /// Volume of the current bar.
    fn volume(&self) -> f64;

    /// Candle history for a timeframe, oldest first, up to the current
    /// bar. Provided for completeness of the framework contract.
    fn candles(&self, timeframe: Timeframe) -> Result<Vec<Bar>>;

    /// Indicator value(s) for a timeframe. `sequential` selects the
    /// full history over the latest scalar.
    fn indicator(
        &self,
        timeframe: Timeframe,
        spec: IndicatorSpec,
        sequential: bool,
    ) -> Result<IndicatorOutput>;
}

/// Account figures, read-only and consistent within a bar.
pub trait AccountView {
    fn balance(&self) -> f64;
    fn available_margin(&self) -> f64;
    fn leveraged_available_margin(&self) -> f64;
    fn fee_rate(&self) -> f64;
    fn leverage(&self) -> f64;
    fn exchange_kind(&self) -> ExchangeKind;
    /// Absent when no leverage is in use, even on futures venues.
    fn liquidation_price(&self) -> Option<f64>;
    fn position(&self) -> PositionView;
}

/// Order intent sink. Submissions are instructions to the external
/// execution layer, not immediate fills.
pub trait OrderSink {
    fn submit_buy(&mut self, qty: f64, price: f64);
    fn submit_sell(&mut self, qty: f64, price: f64);
    fn set_stop_loss(&mut self, qty: f64, price: f64);
    fn set_take_profit(&mut self, qty: f64, price: f64);
    fn liquidate(&mut self);
}

/// Everything a strategy hook receives.
pub trait TradeContext: MarketView + AccountView + OrderSink {}

impl<T: MarketView + AccountView + OrderSink> TradeContext for T {}

pub mod exits;
pub mod sizing;

pub use exits::{ExitInputs, ExitRules, ExitTrigger, OscillatorState, TrendState};
pub use sizing::{clamp_qty, deployable_capital, max_capital_qty, risk_to_qty, size_to_qty};

/// Order sizing and protective-order parameters shared by every
/// strategy profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskParams {
    /// Percent of deployable capital lost on a stop-out (e.g. 1.0).
    pub risk_percentage: f64,
    pub atr_period: usize,
    pub stop_loss_atr_mult: f64,
    pub take_profit_atr_mult: f64,
    /// Limit-entry offset in ATRs below (long) / above (short) the
    /// close. Zero means enter at market.
    pub entry_atr_offset: f64,
    /// Safety cap: fraction of deployable capital one trade may use.
    pub max_capital_per_trade: f64,
    /// Integer scaling applied after the risk calculation and cap.
    pub position_multiplier: u32,
}

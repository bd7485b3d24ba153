pub mod config;
pub mod evaluator;
pub mod profile;
pub mod signal;
pub mod snapshot;

pub use config::{StrategyConfig, StrategyFileConfig};
pub use evaluator::Evaluator;
pub use profile::{EntryRules, OscillatorRules, Profile, TrendRules};
pub use snapshot::SnapshotCache;

use common::{OrderIntent, ParamSpec, TradeContext};

/// The hook surface the external scheduler drives, once per bar in
/// strictly increasing bar order.
///
/// Hooks read a consistent account/market snapshot through the context
/// and write back order intents; they never mutate position state
/// directly.
pub trait Strategy {
    /// Human-readable name of this strategy instance.
    fn name(&self) -> &str;

    /// The instrument this strategy watches (e.g. "BTC-USDT").
    fn symbol(&self) -> &str;

    /// Ordered optimizer-facing parameter table.
    fn hyperparameters(&self) -> Vec<ParamSpec>;

    /// Whether a long entry should be opened this bar.
    fn should_long(&mut self, ctx: &mut dyn TradeContext) -> bool;

    /// Whether a short entry should be opened this bar. Always false
    /// on spot venues.
    fn should_short(&mut self, ctx: &mut dyn TradeContext) -> bool;

    /// Whether an unfilled entry order should be cancelled each bar.
    fn should_cancel_entry(&self) -> bool {
        true
    }

    /// Size and submit a long entry.
    fn go_long(&mut self, ctx: &mut dyn TradeContext);

    /// Size and submit a short entry.
    fn go_short(&mut self, ctx: &mut dyn TradeContext);

    /// Called on fill: register protective stop/target orders.
    fn on_open_position(&mut self, ctx: &mut dyn TradeContext, order: &OrderIntent);

    /// Called every bar while a position is open: evaluate exits.
    fn update_position(&mut self, ctx: &mut dyn TradeContext);

    /// Monitoring values for dashboards/logs. No behavioral effect.
    fn watch_list(&mut self, ctx: &mut dyn TradeContext) -> Vec<(String, String)> {
        let _ = ctx;
        Vec::new()
    }
}

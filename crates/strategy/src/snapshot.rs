//! Per-bar indicator memoization.
//!
//! Several hooks run against the same bar (`should_long`,
//! `should_short`, `update_position`, `watch_list`), so lookups are
//! cached by (timeframe, spec, sequential) and dropped as soon as the
//! bar index advances. The bar index comes from the context on every
//! call; there is no implicit global state.

use std::collections::HashMap;

use common::{Error, IndicatorOutput, IndicatorSpec, MarketView, Result, Timeframe};
use tracing::debug;

type CacheKey = (Timeframe, IndicatorSpec, bool);

#[derive(Debug, Default)]
pub struct SnapshotCache {
    bar: Option<usize>,
    entries: HashMap<CacheKey, IndicatorOutput>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoized indicator lookup for the context's current bar.
    pub fn fetch<C: MarketView + ?Sized>(
        &mut self,
        ctx: &C,
        timeframe: Timeframe,
        spec: IndicatorSpec,
        sequential: bool,
    ) -> Result<IndicatorOutput> {
        let bar = ctx.bar_index();
        if self.bar != Some(bar) {
            self.entries.clear();
            self.bar = Some(bar);
        }

        let key = (timeframe, spec, sequential);
        if let Some(hit) = self.entries.get(&key) {
            return Ok(hit.clone());
        }

        let out = ctx.indicator(timeframe, spec, sequential)?;
        self.entries.insert(key, out.clone());
        Ok(out)
    }

    /// Latest scalar value of an indicator.
    pub fn scalar<C: MarketView + ?Sized>(
        &mut self,
        ctx: &C,
        timeframe: Timeframe,
        spec: IndicatorSpec,
    ) -> Result<f64> {
        self.fetch(ctx, timeframe, spec, false)?
            .latest()
            .ok_or_else(|| Error::Indicator(format!("{spec} returned an empty series")))
    }

    /// Full history of an indicator, most-recent last.
    pub fn series<C: MarketView + ?Sized>(
        &mut self,
        ctx: &C,
        timeframe: Timeframe,
        spec: IndicatorSpec,
    ) -> Result<Vec<f64>> {
        Ok(self.fetch(ctx, timeframe, spec, true)?.into_series())
    }

    /// Scalar on the secondary timeframe, falling back to the primary
    /// timeframe when the secondary has no data. Missing
    /// higher-timeframe candles are an expected condition, never a
    /// failed bar.
    pub fn scalar_with_fallback<C: MarketView + ?Sized>(
        &mut self,
        ctx: &C,
        higher: Timeframe,
        primary: Timeframe,
        spec: IndicatorSpec,
    ) -> Result<f64> {
        match self.scalar(ctx, higher, spec) {
            Ok(v) => Ok(v),
            Err(err) => {
                debug!(%higher, %spec, %err, "higher timeframe unavailable, using primary");
                self.scalar(ctx, primary, spec)
            }
        }
    }
}

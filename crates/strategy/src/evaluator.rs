//! The generic signal-and-risk evaluator.
//!
//! One evaluator services both built-in profiles; all variant
//! differences live in the `Profile` configuration. Hooks are invoked
//! by the external scheduler once per bar, in strictly increasing bar
//! order, and never observe mid-bar account mutation.

use common::{
    EntryDecision, ExchangeKind, IndicatorSpec, OrderIntent, ParamSpec, PositionSide, Result,
    TradeContext, TrendVerdict,
};
use risk::{self, ExitInputs, OscillatorState, TrendState};
use tracing::{debug, info, warn};

use crate::profile::{EntryRules, OscillatorRules, Profile, TrendRules, VOLUME_SMA_PERIOD};
use crate::signal::{self, MomentumDirection};
use crate::snapshot::SnapshotCache;
use crate::Strategy;

pub struct Evaluator {
    profile: Profile,
    cache: SnapshotCache,
    /// Bar index of the most recent entry, used for the max-hold exit.
    entry_bar: Option<usize>,
}

impl Evaluator {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            cache: SnapshotCache::new(),
            entry_bar: None,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    // ── Entry gates ──────────────────────────────────────────────────

    /// Entry verdict for the current bar. Indicator failures on the
    /// primary timeframe read as "no entry", never as a failed bar.
    fn entry_decision<C: TradeContext + ?Sized>(
        &mut self,
        ctx: &C,
        want: EntryDecision,
    ) -> Result<bool> {
        let decision = match &self.profile.entry {
            EntryRules::Oscillator(rules) => {
                let rules = *rules;
                self.oscillator_entry(ctx, &rules, want)?
            }
            EntryRules::TrendFollowing(rules) => {
                let rules = *rules;
                self.trend_following_entry(ctx, &rules, want)?
            }
        };
        Ok(decision)
    }

    fn oscillator_entry<C: TradeContext + ?Sized>(
        &mut self,
        ctx: &C,
        rules: &OscillatorRules,
        want: EntryDecision,
    ) -> Result<bool> {
        let tf = self.profile.timeframe;
        let rsi = self
            .cache
            .scalar(ctx, tf, IndicatorSpec::Rsi { period: rules.rsi_period })?;

        // Oversold / overbought gate first; everything else confirms.
        let (extreme_ok, momentum_dir) = match want {
            EntryDecision::Long => (rsi < rules.rsi_oversold, MomentumDirection::Bullish),
            EntryDecision::Short => (rsi > rules.rsi_overbought, MomentumDirection::Bearish),
            EntryDecision::None => return Ok(false),
        };
        if !extreme_ok {
            return Ok(false);
        }

        let rsi_seq = self
            .cache
            .series(ctx, tf, IndicatorSpec::Rsi { period: rules.rsi_period })?;
        if !signal::momentum_majority(&rsi_seq, rules.momentum_period, momentum_dir) {
            return Ok(false);
        }

        if rules.use_trend_filter {
            let trend = self.oscillator_trend(ctx, rules)?;
            let blocking = match want {
                EntryDecision::Long => TrendVerdict::Bearish,
                _ => TrendVerdict::Bullish,
            };
            if trend == blocking {
                return Ok(false);
            }
        }

        if rules.use_volume_filter {
            let volume_sma = self.cache.scalar(
                ctx,
                tf,
                IndicatorSpec::VolumeSma { period: VOLUME_SMA_PERIOD },
            )?;
            if !signal::volume_confirmation(true, ctx.volume(), volume_sma) {
                return Ok(false);
            }
        }

        // Entries must stay anchored near the fast EMA when the trend
        // filter is on.
        if rules.use_trend_filter {
            let ema_fast = self
                .cache
                .scalar(ctx, tf, IndicatorSpec::Ema { period: rules.ema_fast_period })?;
            let anchored = match want {
                EntryDecision::Long => signal::near_trend_anchor_long(ctx.close(), ema_fast),
                _ => signal::near_trend_anchor_short(ctx.close(), ema_fast),
            };
            if !anchored {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Trend verdict for the oscillator profile: fast/slow EMA pair on
    /// the primary timeframe plus higher-timeframe EMA alignment.
    fn oscillator_trend<C: TradeContext + ?Sized>(
        &mut self,
        ctx: &C,
        rules: &OscillatorRules,
    ) -> Result<TrendVerdict> {
        if !rules.use_trend_filter {
            return Ok(TrendVerdict::Neutral);
        }
        let tf = self.profile.timeframe;
        let ema_fast = self
            .cache
            .scalar(ctx, tf, IndicatorSpec::Ema { period: rules.ema_fast_period })?;
        let ema_slow = self
            .cache
            .scalar(ctx, tf, IndicatorSpec::Ema { period: rules.ema_slow_period })?;
        let higher_ema = self.cache.scalar_with_fallback(
            ctx,
            self.profile.higher_timeframe,
            tf,
            IndicatorSpec::Ema { period: rules.higher_tf_ema_period },
        )?;
        Ok(signal::trend_verdict(
            true,
            ema_fast,
            ema_slow,
            ctx.close(),
            higher_ema,
        ))
    }

    fn trend_following_entry<C: TradeContext + ?Sized>(
        &mut self,
        ctx: &C,
        rules: &TrendRules,
        want: EntryDecision,
    ) -> Result<bool> {
        let tf = self.profile.timeframe;
        let htf = self.profile.higher_timeframe;

        let tema_short = self
            .cache
            .scalar(ctx, tf, IndicatorSpec::Tema { period: rules.tema_short_period })?;
        let tema_medium = self
            .cache
            .scalar(ctx, tf, IndicatorSpec::Tema { period: rules.tema_medium_period })?;
        let htf_short = self.cache.scalar_with_fallback(
            ctx,
            htf,
            tf,
            IndicatorSpec::Tema { period: rules.tema_htf_short_period },
        )?;
        let htf_long = self.cache.scalar_with_fallback(
            ctx,
            htf,
            tf,
            IndicatorSpec::Tema { period: rules.tema_htf_long_period },
        )?;
        let adx = self
            .cache
            .scalar(ctx, tf, IndicatorSpec::Adx { period: rules.adx_period })?;
        let cmo = self
            .cache
            .scalar(ctx, tf, IndicatorSpec::Cmo { period: rules.cmo_period })?;

        // Both timeframes must agree in direction; strength gates are
        // AND-combined with no relaxation.
        let decision = match want {
            EntryDecision::Long => {
                tema_short > tema_medium
                    && htf_short > htf_long
                    && adx > rules.adx_threshold
                    && cmo > rules.cmo_upper
            }
            EntryDecision::Short => {
                tema_short <= tema_medium
                    && htf_short <= htf_long
                    && adx > rules.adx_threshold
                    && cmo < rules.cmo_lower
            }
            EntryDecision::None => false,
        };
        Ok(decision)
    }

    // ── Order submission ─────────────────────────────────────────────

    fn submit_entry<C: TradeContext + ?Sized>(&mut self, ctx: &mut C, side: PositionSide) {
        let tf = self.profile.timeframe;
        let risk_params = self.profile.risk;
        let atr = match self
            .cache
            .scalar(ctx, tf, IndicatorSpec::Atr { period: risk_params.atr_period })
        {
            Ok(v) => v,
            Err(err) => {
                warn!(profile = %self.profile.name, %err, "no ATR, skipping entry");
                return;
            }
        };

        let close = ctx.close();
        let offset = atr * risk_params.entry_atr_offset;
        let (entry_price, stop_price) = match side {
            PositionSide::Long => {
                let entry = close - offset;
                (entry, entry - atr * risk_params.stop_loss_atr_mult)
            }
            PositionSide::Short => {
                let entry = close + offset;
                (entry, entry + atr * risk_params.stop_loss_atr_mult)
            }
            PositionSide::Flat => return,
        };

        let capital = risk::deployable_capital(ctx);
        let fee_rate = ctx.fee_rate();
        let qty = risk::risk_to_qty(
            capital,
            risk_params.risk_percentage,
            entry_price,
            stop_price,
            fee_rate,
        );
        let cap = risk::max_capital_qty(
            capital,
            risk_params.max_capital_per_trade,
            entry_price,
            fee_rate,
        );
        let qty = risk::clamp_qty(qty, cap);

        // A non-positive sized entry is a valid silent no-op, not an
        // error.
        if !qty.is_finite() || qty <= 0.0 {
            debug!(profile = %self.profile.name, %side, "sized to zero, no order placed");
            return;
        }

        let order_qty = qty * f64::from(risk_params.position_multiplier);
        match side {
            PositionSide::Long => ctx.submit_buy(order_qty, entry_price),
            PositionSide::Short => ctx.submit_sell(order_qty, entry_price),
            PositionSide::Flat => return,
        }
        self.entry_bar = Some(ctx.bar_index());
        info!(
            profile = %self.profile.name,
            symbol = %self.profile.symbol,
            %side,
            qty = order_qty,
            price = entry_price,
            stop = stop_price,
            "entry submitted"
        );
    }

    // ── Exit inputs ──────────────────────────────────────────────────

    fn build_exit_inputs<C: TradeContext + ?Sized>(
        &mut self,
        ctx: &C,
        side: PositionSide,
    ) -> ExitInputs {
        let oscillator = if self.profile.exits.oscillator_exit {
            self.oscillator_exit_state(ctx)
        } else {
            None
        };
        let trend = if self.profile.exits.trend_reversal_exit {
            self.trend_exit_state(ctx)
        } else {
            None
        };

        ExitInputs {
            side,
            close: ctx.close(),
            bars_held: self
                .entry_bar
                .map(|entry| ctx.bar_index().saturating_sub(entry) as u32),
            exchange: ctx.exchange_kind(),
            liquidation_price: ctx.liquidation_price(),
            oscillator,
            trend,
            rules: self.profile.exits,
        }
    }

    fn oscillator_exit_state<C: TradeContext + ?Sized>(
        &mut self,
        ctx: &C,
    ) -> Option<OscillatorState> {
        let EntryRules::Oscillator(rules) = self.profile.entry.clone() else {
            return None;
        };
        let tf = self.profile.timeframe;
        let rsi = self
            .cache
            .scalar(ctx, tf, IndicatorSpec::Rsi { period: rules.rsi_period })
            .ok()?;
        let seq = self
            .cache
            .series(ctx, tf, IndicatorSpec::Rsi { period: rules.rsi_period })
            .ok()?;
        Some(OscillatorState {
            rsi,
            momentum_bullish: signal::momentum_majority(
                &seq,
                rules.momentum_period,
                MomentumDirection::Bullish,
            ),
            momentum_bearish: signal::momentum_majority(
                &seq,
                rules.momentum_period,
                MomentumDirection::Bearish,
            ),
            overbought: rules.rsi_overbought,
            oversold: rules.rsi_oversold,
        })
    }

    fn trend_exit_state<C: TradeContext + ?Sized>(&mut self, ctx: &C) -> Option<TrendState> {
        let EntryRules::Oscillator(rules) = self.profile.entry.clone() else {
            return None;
        };
        let verdict = self.oscillator_trend(ctx, &rules).ok()?;
        let ema_fast = self
            .cache
            .scalar(
                ctx,
                self.profile.timeframe,
                IndicatorSpec::Ema { period: rules.ema_fast_period },
            )
            .ok()?;
        Some(TrendState { verdict, ema_fast })
    }
}

impl Strategy for Evaluator {
    fn name(&self) -> &str {
        &self.profile.name
    }

    fn symbol(&self) -> &str {
        &self.profile.symbol
    }

    fn hyperparameters(&self) -> Vec<ParamSpec> {
        self.profile.param_specs()
    }

    fn should_long(&mut self, ctx: &mut dyn TradeContext) -> bool {
        match self.entry_decision(ctx, EntryDecision::Long) {
            Ok(v) => v,
            Err(err) => {
                warn!(profile = %self.profile.name, %err, "long gates unavailable this bar");
                false
            }
        }
    }

    fn should_short(&mut self, ctx: &mut dyn TradeContext) -> bool {
        // Spot venues cannot short; suppress at the decision stage
        // rather than failing at submission.
        if ctx.exchange_kind() == ExchangeKind::Spot {
            return false;
        }
        match self.entry_decision(ctx, EntryDecision::Short) {
            Ok(v) => v,
            Err(err) => {
                warn!(profile = %self.profile.name, %err, "short gates unavailable this bar");
                false
            }
        }
    }

    fn should_cancel_entry(&self) -> bool {
        // No pending-entry persistence across bars.
        true
    }

    fn go_long(&mut self, ctx: &mut dyn TradeContext) {
        self.submit_entry(ctx, PositionSide::Long);
    }

    fn go_short(&mut self, ctx: &mut dyn TradeContext) {
        self.submit_entry(ctx, PositionSide::Short);
    }

    fn on_open_position(&mut self, ctx: &mut dyn TradeContext, _order: &OrderIntent) {
        let position = ctx.position();
        if !position.is_open() {
            return;
        }
        let risk_params = self.profile.risk;
        // ATR at fill time, not at signal time.
        let atr = match self.cache.scalar(
            ctx,
            self.profile.timeframe,
            IndicatorSpec::Atr { period: risk_params.atr_period },
        ) {
            Ok(v) => v,
            Err(err) => {
                warn!(profile = %self.profile.name, %err, "no ATR at fill, protective orders not set");
                return;
            }
        };

        let entry = position.entry_price;
        let (stop, target) = match position.side {
            PositionSide::Long => (
                entry - atr * risk_params.stop_loss_atr_mult,
                entry + atr * risk_params.take_profit_atr_mult,
            ),
            PositionSide::Short => (
                entry + atr * risk_params.stop_loss_atr_mult,
                entry - atr * risk_params.take_profit_atr_mult,
            ),
            PositionSide::Flat => return,
        };

        ctx.set_stop_loss(position.qty, stop);
        ctx.set_take_profit(position.qty, target);
        self.entry_bar = Some(ctx.bar_index());
        info!(
            profile = %self.profile.name,
            side = %position.side,
            entry = entry,
            stop = stop,
            target = target,
            "protective orders registered"
        );
    }

    fn update_position(&mut self, ctx: &mut dyn TradeContext) {
        let position = ctx.position();
        if !position.is_open() {
            return;
        }

        let inputs = self.build_exit_inputs(ctx, position.side);
        if let Some(trigger) = risk::exits::evaluate(&inputs) {
            info!(
                profile = %self.profile.name,
                side = %position.side,
                %trigger,
                close = ctx.close(),
                "liquidating position"
            );
            ctx.liquidate();
            self.entry_bar = None;
        }
    }

    fn watch_list(&mut self, ctx: &mut dyn TradeContext) -> Vec<(String, String)> {
        let tf = self.profile.timeframe;
        let mut list = Vec::new();
        match self.profile.entry.clone() {
            EntryRules::Oscillator(rules) => {
                if let Ok(rsi) =
                    self.cache
                        .scalar(ctx, tf, IndicatorSpec::Rsi { period: rules.rsi_period })
                {
                    list.push(("RSI".to_string(), format!("{rsi:.2}")));
                }
                if let Ok(trend) = self.oscillator_trend(ctx, &rules) {
                    list.push(("Trend".to_string(), trend.to_string()));
                }
                if let Ok(atr) = self.cache.scalar(
                    ctx,
                    tf,
                    IndicatorSpec::Atr { period: self.profile.risk.atr_period },
                ) {
                    list.push(("ATR".to_string(), format!("{atr:.4}")));
                }
            }
            EntryRules::TrendFollowing(rules) => {
                for (label, spec) in [
                    ("TEMA short", IndicatorSpec::Tema { period: rules.tema_short_period }),
                    ("TEMA medium", IndicatorSpec::Tema { period: rules.tema_medium_period }),
                    ("ADX", IndicatorSpec::Adx { period: rules.adx_period }),
                    ("CMO", IndicatorSpec::Cmo { period: rules.cmo_period }),
                ] {
                    if let Ok(v) = self.cache.scalar(ctx, tf, spec) {
                        list.push((label.to_string(), format!("{v:.2}")));
                    }
                }
            }
        }
        list.push((
            "Entry Signal Long".to_string(),
            self.should_long(ctx).to_string(),
        ));
        list.push((
            "Entry Signal Short".to_string(),
            self.should_short(ctx).to_string(),
        ));
        list
    }
}

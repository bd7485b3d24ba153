//! In-memory stand-in for the external trading framework.
//!
//! `PaperBroker` implements the full `TradeContext` contract against
//! scripted data: it serves bars and pre-loaded indicator series,
//! exposes a frozen account snapshot per bar, and records every order
//! intent the evaluator emits. It does not simulate fills or fees;
//! execution belongs to the real framework, and tests drive position
//! changes explicitly between bars.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use common::{
    AccountView, Bar, Error, ExchangeKind, IndicatorOutput, IndicatorSpec, IntentKind,
    MarketView, OrderIntent, OrderSink, PositionSide, PositionView, Result, Timeframe,
};

/// Pre-loaded indicator series, one value per primary bar, keyed by
/// (timeframe, spec). A timeframe with no series at all reads as
/// unavailable, which exercises the evaluator's fallback path.
#[derive(Debug, Default, Clone)]
pub struct ScriptedIndicators {
    series: HashMap<(Timeframe, IndicatorSpec), Vec<f64>>,
}

impl ScriptedIndicators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one series, aligned to the primary bar clock.
    pub fn set(&mut self, timeframe: Timeframe, spec: IndicatorSpec, values: Vec<f64>) {
        self.series.insert((timeframe, spec), values);
    }

    /// Same value repeated for every bar.
    pub fn set_constant(
        &mut self,
        timeframe: Timeframe,
        spec: IndicatorSpec,
        value: f64,
        bars: usize,
    ) {
        self.set(timeframe, spec, vec![value; bars]);
    }

    fn lookup(
        &self,
        timeframe: Timeframe,
        spec: IndicatorSpec,
        cursor: usize,
        sequential: bool,
    ) -> Result<IndicatorOutput> {
        let Some(values) = self.series.get(&(timeframe, spec)) else {
            // Distinguish "this timeframe has nothing" from "this
            // indicator was not scripted".
            if self.series.keys().any(|(tf, _)| *tf == timeframe) {
                return Err(Error::Indicator(format!(
                    "no scripted series for {spec} on {timeframe}"
                )));
            }
            return Err(Error::UnavailableTimeframe(timeframe));
        };
        if cursor >= values.len() {
            return Err(Error::Indicator(format!(
                "scripted series for {spec} on {timeframe} ends before bar {cursor}"
            )));
        }
        if sequential {
            Ok(IndicatorOutput::Series(values[..=cursor].to_vec()))
        } else {
            Ok(IndicatorOutput::Scalar(values[cursor]))
        }
    }
}

/// Build bars from close prices: 5-minute spacing, unit volume,
/// open/high/low collapsed onto the close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            timestamp: epoch_plus(i as i64 * 300),
        })
        .collect()
}

fn epoch_plus(seconds: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000 + seconds, 0)
        .expect("fixed epoch timestamp is valid")
}

/// Scripted `TradeContext` implementation.
pub struct PaperBroker {
    timeframe: Timeframe,
    bars: Vec<Bar>,
    cursor: usize,
    indicators: ScriptedIndicators,
    balance: f64,
    fee_rate: f64,
    leverage: f64,
    exchange: ExchangeKind,
    liquidation_price: Option<f64>,
    position: PositionView,
    intents: Vec<OrderIntent>,
}

impl PaperBroker {
    pub fn new(
        exchange: ExchangeKind,
        timeframe: Timeframe,
        bars: Vec<Bar>,
        indicators: ScriptedIndicators,
        balance: f64,
        fee_rate: f64,
        leverage: f64,
    ) -> Self {
        Self {
            timeframe,
            bars,
            cursor: 0,
            indicators,
            balance,
            fee_rate,
            leverage,
            exchange,
            liquidation_price: None,
            position: PositionView::flat(),
            intents: Vec::new(),
        }
    }

    /// Step to the next bar. Returns false once the script runs out.
    pub fn advance(&mut self) -> bool {
        if self.cursor + 1 < self.bars.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn set_volume(&mut self, volume: f64) {
        if let Some(bar) = self.bars.get_mut(self.cursor) {
            bar.volume = volume;
        }
    }

    pub fn set_liquidation_price(&mut self, price: Option<f64>) {
        self.liquidation_price = price;
    }

    /// Open a position, as the external execution layer would after a
    /// fill, strictly between bars.
    pub fn open_position(&mut self, side: PositionSide, qty: f64, entry_price: f64) {
        self.position = PositionView {
            side,
            qty,
            entry_price,
        };
    }

    pub fn close_position(&mut self) {
        self.position = PositionView::flat();
    }

    pub fn intents(&self) -> &[OrderIntent] {
        &self.intents
    }

    pub fn last_intent(&self) -> Option<&OrderIntent> {
        self.intents.last()
    }

    pub fn intents_of(&self, kind: IntentKind) -> Vec<&OrderIntent> {
        self.intents.iter().filter(|i| i.kind == kind).collect()
    }

    pub fn clear_intents(&mut self) {
        self.intents.clear();
    }

    fn record(&mut self, intent: OrderIntent) {
        debug!(kind = %intent.kind, qty = intent.qty, price = intent.price, "intent recorded");
        self.intents.push(intent);
    }
}

impl MarketView for PaperBroker {
    fn bar_index(&self) -> usize {
        self.cursor
    }

    fn close(&self) -> f64 {
        self.bars[self.cursor].close
    }

    fn price(&self) -> f64 {
        self.close()
    }

    fn volume(&self) -> f64 {
        self.bars[self.cursor].volume
    }

    fn candles(&self, timeframe: Timeframe) -> Result<Vec<Bar>> {
        if timeframe != self.timeframe {
            return Err(Error::UnavailableTimeframe(timeframe));
        }
        Ok(self.bars[..=self.cursor].to_vec())
    }

    fn indicator(
        &self,
        timeframe: Timeframe,
        spec: IndicatorSpec,
        sequential: bool,
    ) -> Result<IndicatorOutput> {
        self.indicators.lookup(timeframe, spec, self.cursor, sequential)
    }
}

impl AccountView for PaperBroker {
    fn balance(&self) -> f64 {
        self.balance
    }

    fn available_margin(&self) -> f64 {
        self.balance
    }

    fn leveraged_available_margin(&self) -> f64 {
        self.balance * self.leverage
    }

    fn fee_rate(&self) -> f64 {
        self.fee_rate
    }

    fn leverage(&self) -> f64 {
        self.leverage
    }

    fn exchange_kind(&self) -> ExchangeKind {
        self.exchange
    }

    fn liquidation_price(&self) -> Option<f64> {
        self.liquidation_price
    }

    fn position(&self) -> PositionView {
        self.position
    }
}

impl OrderSink for PaperBroker {
    fn submit_buy(&mut self, qty: f64, price: f64) {
        self.record(OrderIntent::new(IntentKind::Buy, qty, price));
    }

    fn submit_sell(&mut self, qty: f64, price: f64) {
        self.record(OrderIntent::new(IntentKind::Sell, qty, price));
    }

    fn set_stop_loss(&mut self, qty: f64, price: f64) {
        self.record(OrderIntent::new(IntentKind::StopLoss, qty, price));
    }

    fn set_take_profit(&mut self, qty: f64, price: f64) {
        self.record(OrderIntent::new(IntentKind::TakeProfit, qty, price));
    }

    fn liquidate(&mut self) {
        self.record(OrderIntent::liquidate());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker_with_rsi() -> PaperBroker {
        let mut indicators = ScriptedIndicators::new();
        indicators.set(
            Timeframe::Min5,
            IndicatorSpec::Rsi { period: 14 },
            vec![40.0, 35.0, 25.0],
        );
        PaperBroker::new(
            ExchangeKind::Spot,
            Timeframe::Min5,
            bars_from_closes(&[100.0, 99.0, 98.0]),
            indicators,
            10_000.0,
            0.001,
            1.0,
        )
    }

    #[test]
    fn scalar_lookup_tracks_the_cursor() {
        let mut broker = broker_with_rsi();
        let spec = IndicatorSpec::Rsi { period: 14 };
        let v = broker
            .indicator(Timeframe::Min5, spec, false)
            .unwrap()
            .latest()
            .unwrap();
        assert_eq!(v, 40.0);
        broker.advance();
        broker.advance();
        let v = broker
            .indicator(Timeframe::Min5, spec, false)
            .unwrap()
            .latest()
            .unwrap();
        assert_eq!(v, 25.0);
    }

    #[test]
    fn sequential_lookup_returns_prefix() {
        let mut broker = broker_with_rsi();
        broker.advance();
        let series = broker
            .indicator(Timeframe::Min5, IndicatorSpec::Rsi { period: 14 }, true)
            .unwrap()
            .into_series();
        assert_eq!(series, vec![40.0, 35.0]);
    }

    #[test]
    fn unscripted_timeframe_reads_as_unavailable() {
        let broker = broker_with_rsi();
        let err = broker
            .indicator(Timeframe::Hour4, IndicatorSpec::Rsi { period: 14 }, false)
            .unwrap_err();
        assert!(matches!(err, Error::UnavailableTimeframe(Timeframe::Hour4)));
    }

    #[test]
    fn advance_stops_at_the_last_bar() {
        let mut broker = broker_with_rsi();
        assert!(broker.advance());
        assert!(broker.advance());
        assert!(!broker.advance());
        assert_eq!(broker.bar_index(), 2);
    }

    #[test]
    fn intents_are_recorded_in_order() {
        let mut broker = broker_with_rsi();
        broker.submit_buy(1.0, 100.0);
        broker.set_stop_loss(1.0, 95.0);
        broker.liquidate();
        let kinds: Vec<IntentKind> = broker.intents().iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![IntentKind::Buy, IntentKind::StopLoss, IntentKind::Liquidate]
        );
    }
}

//! End-to-end evaluator flows against the scripted paper broker:
//! signal to sized order to protective brackets to exit.

use std::collections::HashMap;

use common::{
    ExchangeKind, HyperParams, IndicatorSpec, IntentKind, ParamValue, PositionSide, Timeframe,
    TradeContext,
};
use paper::{bars_from_closes, PaperBroker, ScriptedIndicators};
use strategy::profile::{OSCILLATOR_PARAMS, TREND_FOLLOWING_PARAMS};
use strategy::{Evaluator, Profile, Strategy};

fn oscillator_evaluator(overrides: &[(&str, ParamValue)]) -> Evaluator {
    let overrides: HashMap<String, ParamValue> = overrides
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    let hp = HyperParams::validate(OSCILLATOR_PARAMS, &overrides).unwrap();
    Evaluator::new(Profile::oscillator(
        "osc test",
        "BTC-USDT",
        Timeframe::Min5,
        Timeframe::Min15,
        &hp,
    ))
}

fn trend_evaluator() -> Evaluator {
    let hp = HyperParams::defaults(TREND_FOLLOWING_PARAMS);
    Evaluator::new(Profile::trend_following(
        "tema test",
        "ETH-USDT",
        Timeframe::Min30,
        Timeframe::Hour4,
        &hp,
    ))
}

/// Oversold RSI script whose trailing window carries bullish momentum:
/// final reading 25 with two of the last three moves up.
const OVERSOLD_BULLISH_RSI: [f64; 5] = [40.0, 20.0, 24.0, 22.0, 25.0];

fn oversold_broker(exchange: ExchangeKind) -> PaperBroker {
    let bars = bars_from_closes(&[100.0; 5]);
    let mut indicators = ScriptedIndicators::new();
    indicators.set(
        Timeframe::Min5,
        IndicatorSpec::Rsi { period: 14 },
        OVERSOLD_BULLISH_RSI.to_vec(),
    );
    indicators.set_constant(Timeframe::Min5, IndicatorSpec::Atr { period: 14 }, 2.0, 5);
    let mut broker = PaperBroker::new(exchange, Timeframe::Min5, bars, indicators, 10_000.0, 0.0, 1.0);
    while broker.advance() {}
    broker
}

#[test]
fn oversold_reversal_produces_sized_long_and_brackets() {
    let mut evaluator = oscillator_evaluator(&[
        ("use_trend_filter", ParamValue::Bool(false)),
        ("use_volume_filter", ParamValue::Bool(false)),
    ]);
    let mut broker = oversold_broker(ExchangeKind::Spot);

    assert!(evaluator.should_long(&mut broker));
    assert!(!evaluator.should_short(&mut broker));

    evaluator.go_long(&mut broker);
    let buy = broker.last_intent().cloned().unwrap();
    assert_eq!(buy.kind, IntentKind::Buy);
    // Market entry at close 100, stop 5 below: 1% of 10_000 at risk
    // over a 5-point stop sizes to 20 units.
    assert_eq!(buy.price, 100.0);
    assert!((buy.qty - 20.0).abs() < 1e-9, "got {}", buy.qty);

    broker.open_position(PositionSide::Long, buy.qty, buy.price);
    evaluator.on_open_position(&mut broker, &buy);

    // ATR 2.0 at fill: stop at entry - 2.5*ATR, target at entry + 3.5*ATR.
    let stops = broker.intents_of(IntentKind::StopLoss);
    let targets = broker.intents_of(IntentKind::TakeProfit);
    assert_eq!(stops.len(), 1);
    assert_eq!(targets.len(), 1);
    assert_eq!(stops[0].price, 95.0);
    assert_eq!(stops[0].qty, 20.0);
    assert_eq!(targets[0].price, 107.0);
}

#[test]
fn spot_venue_suppresses_shorts_futures_does_not() {
    // Overbought RSI with bearish momentum in the trailing window.
    let bars = bars_from_closes(&[100.0; 4]);
    let mut indicators = ScriptedIndicators::new();
    indicators.set(
        Timeframe::Min5,
        IndicatorSpec::Rsi { period: 14 },
        vec![80.0, 76.0, 78.0, 75.0],
    );
    indicators.set_constant(Timeframe::Min5, IndicatorSpec::Atr { period: 14 }, 2.0, 4);

    let mut evaluator = oscillator_evaluator(&[
        ("use_trend_filter", ParamValue::Bool(false)),
        ("use_volume_filter", ParamValue::Bool(false)),
    ]);

    let mut spot = PaperBroker::new(
        ExchangeKind::Spot,
        Timeframe::Min5,
        bars.clone(),
        indicators.clone(),
        10_000.0,
        0.0,
        1.0,
    );
    while spot.advance() {}
    assert!(!evaluator.should_short(&mut spot));

    let mut futures = PaperBroker::new(
        ExchangeKind::Futures,
        Timeframe::Min5,
        bars,
        indicators,
        10_000.0,
        0.0,
        1.0,
    );
    while futures.advance() {}
    assert!(evaluator.should_short(&mut futures));
}

#[test]
fn missing_higher_timeframe_falls_back_to_primary() {
    // Trend filter on, but nothing scripted for 15m: the verdict must
    // come from primary-timeframe recomputation instead of failing.
    let bars = bars_from_closes(&[100.0; 5]);
    let mut indicators = ScriptedIndicators::new();
    indicators.set(
        Timeframe::Min5,
        IndicatorSpec::Rsi { period: 14 },
        OVERSOLD_BULLISH_RSI.to_vec(),
    );
    indicators.set_constant(Timeframe::Min5, IndicatorSpec::Atr { period: 14 }, 2.0, 5);
    indicators.set_constant(Timeframe::Min5, IndicatorSpec::Ema { period: 34 }, 100.0, 5);
    indicators.set_constant(Timeframe::Min5, IndicatorSpec::Ema { period: 100 }, 99.0, 5);

    let mut evaluator = oscillator_evaluator(&[("use_volume_filter", ParamValue::Bool(false))]);
    let mut broker = PaperBroker::new(
        ExchangeKind::Spot,
        Timeframe::Min5,
        bars,
        indicators,
        10_000.0,
        0.0,
        1.0,
    );
    while broker.advance() {}

    // Fast EMA 100 > slow 99 and close 100 > fallback EMA 99: bullish
    // and anchored, so the long goes through.
    assert!(evaluator.should_long(&mut broker));
}

#[test]
fn price_far_below_fast_ema_is_rejected() {
    let bars = bars_from_closes(&[100.0; 5]);
    let mut indicators = ScriptedIndicators::new();
    indicators.set(
        Timeframe::Min5,
        IndicatorSpec::Rsi { period: 14 },
        OVERSOLD_BULLISH_RSI.to_vec(),
    );
    indicators.set_constant(Timeframe::Min5, IndicatorSpec::Ema { period: 34 }, 105.0, 5);
    indicators.set_constant(Timeframe::Min5, IndicatorSpec::Ema { period: 100 }, 99.0, 5);

    let mut evaluator = oscillator_evaluator(&[("use_volume_filter", ParamValue::Bool(false))]);
    let mut broker = PaperBroker::new(
        ExchangeKind::Spot,
        Timeframe::Min5,
        bars,
        indicators,
        10_000.0,
        0.0,
        1.0,
    );
    while broker.advance() {}

    // 100 < 105 * 0.998: outside the proximity band.
    assert!(!evaluator.should_long(&mut broker));
}

#[test]
fn volume_filter_requires_a_surge() {
    let mut evaluator = oscillator_evaluator(&[
        ("use_trend_filter", ParamValue::Bool(false)),
        ("use_volume_filter", ParamValue::Bool(true)),
    ]);

    let bars = bars_from_closes(&[100.0; 5]);
    let mut indicators = ScriptedIndicators::new();
    indicators.set(
        Timeframe::Min5,
        IndicatorSpec::Rsi { period: 14 },
        OVERSOLD_BULLISH_RSI.to_vec(),
    );
    indicators.set_constant(
        Timeframe::Min5,
        IndicatorSpec::VolumeSma { period: 20 },
        100.0,
        5,
    );
    let mut broker = PaperBroker::new(
        ExchangeKind::Spot,
        Timeframe::Min5,
        bars,
        indicators,
        10_000.0,
        0.0,
        1.0,
    );
    while broker.advance() {}

    broker.set_volume(110.0);
    assert!(!evaluator.should_long(&mut broker));

    broker.set_volume(130.0);
    assert!(evaluator.should_long(&mut broker));
}

#[test]
fn zero_capital_entry_is_a_silent_no_op() {
    let mut evaluator = oscillator_evaluator(&[
        ("use_trend_filter", ParamValue::Bool(false)),
        ("use_volume_filter", ParamValue::Bool(false)),
    ]);
    let bars = bars_from_closes(&[100.0; 5]);
    let mut indicators = ScriptedIndicators::new();
    indicators.set(
        Timeframe::Min5,
        IndicatorSpec::Rsi { period: 14 },
        OVERSOLD_BULLISH_RSI.to_vec(),
    );
    indicators.set_constant(Timeframe::Min5, IndicatorSpec::Atr { period: 14 }, 2.0, 5);
    let mut broker = PaperBroker::new(
        ExchangeKind::Spot,
        Timeframe::Min5,
        bars,
        indicators,
        0.0,
        0.0,
        1.0,
    );
    while broker.advance() {}

    assert!(evaluator.should_long(&mut broker));
    evaluator.go_long(&mut broker);
    assert!(broker.intents().is_empty());
}

#[test]
fn max_hold_flattens_at_the_boundary_and_only_once() {
    // Trend filter off so the timeout is the only armed exit besides
    // the always-on oscillator path, which a flat RSI of 50 never trips.
    let mut evaluator = oscillator_evaluator(&[
        ("use_trend_filter", ParamValue::Bool(false)),
        ("use_volume_filter", ParamValue::Bool(false)),
    ]);

    let bars = 60;
    let mut indicators = ScriptedIndicators::new();
    indicators.set_constant(
        Timeframe::Min5,
        IndicatorSpec::Rsi { period: 14 },
        50.0,
        bars,
    );
    indicators.set_constant(Timeframe::Min5, IndicatorSpec::Atr { period: 14 }, 2.0, bars);
    let mut broker = PaperBroker::new(
        ExchangeKind::Spot,
        Timeframe::Min5,
        bars_from_closes(&vec![100.0; bars]),
        indicators,
        10_000.0,
        0.0,
        1.0,
    );

    broker.open_position(PositionSide::Long, 1.0, 100.0);
    let fill = common::OrderIntent::new(IntentKind::Buy, 1.0, 100.0);
    evaluator.on_open_position(&mut broker, &fill);
    broker.clear_intents();

    for _ in 0..49 {
        broker.advance();
        evaluator.update_position(&mut broker);
    }
    assert!(
        broker.intents_of(IntentKind::Liquidate).is_empty(),
        "flattened before the 50-bar boundary"
    );

    broker.advance();
    evaluator.update_position(&mut broker);
    assert_eq!(broker.intents_of(IntentKind::Liquidate).len(), 1);

    // Entry bar is forgotten after the flatten, so later bars do not
    // re-trigger the timeout.
    broker.advance();
    evaluator.update_position(&mut broker);
    assert_eq!(broker.intents_of(IntentKind::Liquidate).len(), 1);
}

#[test]
fn liquidation_guard_outranks_other_exits_on_futures() {
    let mut evaluator = oscillator_evaluator(&[
        ("use_trend_filter", ParamValue::Bool(false)),
        ("use_volume_filter", ParamValue::Bool(false)),
    ]);

    let mut indicators = ScriptedIndicators::new();
    indicators.set_constant(Timeframe::Min5, IndicatorSpec::Rsi { period: 14 }, 50.0, 3);
    indicators.set_constant(Timeframe::Min5, IndicatorSpec::Atr { period: 14 }, 2.0, 3);
    let mut broker = PaperBroker::new(
        ExchangeKind::Futures,
        Timeframe::Min5,
        bars_from_closes(&[100.0; 3]),
        indicators,
        10_000.0,
        0.0,
        3.0,
    );

    broker.open_position(PositionSide::Long, 1.0, 100.0);
    let fill = common::OrderIntent::new(IntentKind::Buy, 1.0, 100.0);
    evaluator.on_open_position(&mut broker, &fill);
    broker.clear_intents();

    // Close 100 is inside the 10% buffer above a liquidation at 95.
    broker.set_liquidation_price(Some(95.0));
    broker.advance();
    evaluator.update_position(&mut broker);
    assert_eq!(broker.intents_of(IntentKind::Liquidate).len(), 1);
}

#[test]
fn trend_following_long_sizes_with_offset_and_multiplier() {
    let mut evaluator = trend_evaluator();

    let n = 2;
    let mut indicators = ScriptedIndicators::new();
    indicators.set_constant(Timeframe::Min30, IndicatorSpec::Tema { period: 10 }, 105.0, n);
    indicators.set_constant(Timeframe::Min30, IndicatorSpec::Tema { period: 80 }, 100.0, n);
    indicators.set_constant(Timeframe::Hour4, IndicatorSpec::Tema { period: 20 }, 104.0, n);
    indicators.set_constant(Timeframe::Hour4, IndicatorSpec::Tema { period: 70 }, 101.0, n);
    indicators.set_constant(Timeframe::Min30, IndicatorSpec::Adx { period: 14 }, 45.0, n);
    indicators.set_constant(Timeframe::Min30, IndicatorSpec::Cmo { period: 14 }, 50.0, n);
    indicators.set_constant(Timeframe::Min30, IndicatorSpec::Atr { period: 14 }, 2.0, n);

    let mut broker = PaperBroker::new(
        ExchangeKind::Futures,
        Timeframe::Min30,
        bars_from_closes(&[100.0; 2]),
        indicators,
        10_000.0,
        0.0,
        2.0,
    );
    broker.advance();

    assert!(evaluator.should_long(&mut broker));
    assert!(!evaluator.should_short(&mut broker));

    evaluator.go_long(&mut broker);
    let buy = broker.last_intent().cloned().unwrap();
    assert_eq!(buy.kind, IntentKind::Buy);
    // Entry one ATR below close: 98. Stop 4 ATRs further: 90. 3% of
    // the 20_000 leveraged margin over an 8-point stop gives 75 units,
    // tripled by the position multiplier.
    assert_eq!(buy.price, 98.0);
    assert!((buy.qty - 225.0).abs() < 1e-9, "got {}", buy.qty);
}

#[test]
fn trend_following_short_needs_cmo_below_lower_threshold() {
    let mut evaluator = trend_evaluator();

    let n = 1;
    let mut indicators = ScriptedIndicators::new();
    indicators.set_constant(Timeframe::Min30, IndicatorSpec::Tema { period: 10 }, 95.0, n);
    indicators.set_constant(Timeframe::Min30, IndicatorSpec::Tema { period: 80 }, 100.0, n);
    indicators.set_constant(Timeframe::Hour4, IndicatorSpec::Tema { period: 20 }, 96.0, n);
    indicators.set_constant(Timeframe::Hour4, IndicatorSpec::Tema { period: 70 }, 99.0, n);
    indicators.set_constant(Timeframe::Min30, IndicatorSpec::Adx { period: 14 }, 45.0, n);
    indicators.set_constant(Timeframe::Min30, IndicatorSpec::Cmo { period: 14 }, -30.0, n);

    let mut broker = PaperBroker::new(
        ExchangeKind::Futures,
        Timeframe::Min30,
        bars_from_closes(&[100.0]),
        indicators,
        10_000.0,
        0.0,
        2.0,
    );

    // CMO -30 sits above the -40 threshold: not weak enough to short.
    assert!(!evaluator.should_short(&mut broker));
}

#[test]
fn pending_entries_are_always_cancelled() {
    let evaluator = oscillator_evaluator(&[]);
    assert!(evaluator.should_cancel_entry());
}

#[test]
fn watch_list_reports_oscillator_readings() {
    let mut evaluator = oscillator_evaluator(&[
        ("use_trend_filter", ParamValue::Bool(false)),
        ("use_volume_filter", ParamValue::Bool(false)),
    ]);
    let mut broker = oversold_broker(ExchangeKind::Spot);

    let list = evaluator.watch_list(&mut broker);
    let labels: Vec<&str> = list.iter().map(|(k, _)| k.as_str()).collect();
    assert!(labels.contains(&"RSI"));
    assert!(labels.contains(&"Entry Signal Long"));
    let rsi = list.iter().find(|(k, _)| k == "RSI").unwrap();
    assert_eq!(rsi.1, "25.00");
}

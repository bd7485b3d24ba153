use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use common::{AccountView, Config, IndicatorSpec, IntentKind, PositionSide, Timeframe};
use paper::{bars_from_closes, PaperBroker, ScriptedIndicators};
use strategy::{EntryRules, Evaluator, Profile, Strategy, StrategyFileConfig};

/// Bars per scripted replay.
const REPLAY_BARS: usize = 64;

fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(exchange = ?cfg.exchange_kind, balance = cfg.starting_balance, "Vigil starting");

    // ── Strategies ────────────────────────────────────────────────────────────
    let strategy_file = StrategyFileConfig::load(&cfg.strategy_config_path);
    let evaluators = strategy_file.build();

    for evaluator in &evaluators {
        for spec in evaluator.hyperparameters() {
            debug!(strategy = evaluator.name(), param = spec.name, kind = ?spec.kind, "hyperparameter");
        }
    }

    // ── Scripted replay ───────────────────────────────────────────────────────
    // Each evaluator is driven bar by bar the way the backtesting host
    // would drive it, against canned indicator series exercising one
    // full entry (and, for the oscillator, one exit) cycle.
    for mut evaluator in evaluators {
        replay(&mut evaluator, &cfg);
    }
}

fn replay(evaluator: &mut Evaluator, cfg: &Config) {
    let mut broker = scripted_broker(evaluator.profile(), cfg);
    info!(strategy = evaluator.name(), symbol = evaluator.symbol(), "replay start");

    loop {
        if broker.position().is_open() {
            evaluator.update_position(&mut broker);
            if broker.last_intent().is_some_and(|i| i.kind == IntentKind::Liquidate) {
                broker.close_position();
            }
        } else if evaluator.should_long(&mut broker) {
            evaluator.go_long(&mut broker);
            fill_last_entry(evaluator, &mut broker, PositionSide::Long);
        } else if evaluator.should_short(&mut broker) {
            evaluator.go_short(&mut broker);
            fill_last_entry(evaluator, &mut broker, PositionSide::Short);
        }

        for (label, value) in evaluator.watch_list(&mut broker) {
            debug!(strategy = evaluator.name(), %label, %value, "watch");
        }

        if !broker.advance() {
            break;
        }
    }

    info!(
        strategy = evaluator.name(),
        intents = broker.intents().len(),
        open = broker.position().is_open(),
        "replay finished"
    );
}

/// Pretend the entry filled at its limit price so the fill hook runs.
fn fill_last_entry(evaluator: &mut Evaluator, broker: &mut PaperBroker, side: PositionSide) {
    let entry_kind = match side {
        PositionSide::Long => IntentKind::Buy,
        PositionSide::Short => IntentKind::Sell,
        PositionSide::Flat => return,
    };
    let Some(intent) = broker
        .last_intent()
        .filter(|i| i.kind == entry_kind)
        .cloned()
    else {
        return;
    };
    broker.open_position(side, intent.qty, intent.price);
    evaluator.on_open_position(broker, &intent);
}

fn scripted_broker(profile: &Profile, cfg: &Config) -> PaperBroker {
    let mut indicators = ScriptedIndicators::new();
    let tf = profile.timeframe;
    let n = REPLAY_BARS;

    indicators.set_constant(
        tf,
        IndicatorSpec::Atr { period: profile.risk.atr_period },
        2.0,
        n,
    );

    match &profile.entry {
        EntryRules::Oscillator(rules) => {
            indicators.set(
                tf,
                IndicatorSpec::Rsi { period: rules.rsi_period },
                oscillator_rsi_script(n, rules.rsi_oversold, rules.rsi_overbought),
            );
            // Trend context scripted on the primary timeframe only; the
            // higher-timeframe read exercises the fallback path.
            indicators.set_constant(
                tf,
                IndicatorSpec::Ema { period: rules.ema_fast_period },
                100.0,
                n,
            );
            indicators.set_constant(
                tf,
                IndicatorSpec::Ema { period: rules.ema_slow_period },
                99.0,
                n,
            );
            indicators.set_constant(
                tf,
                IndicatorSpec::Ema { period: rules.higher_tf_ema_period },
                99.0,
                n,
            );
        }
        EntryRules::TrendFollowing(rules) => {
            indicators.set(
                tf,
                IndicatorSpec::Tema { period: rules.tema_short_period },
                step_script(n, 99.0, 102.0),
            );
            indicators.set_constant(
                tf,
                IndicatorSpec::Tema { period: rules.tema_medium_period },
                100.0,
                n,
            );
            set_higher_tf_tema(&mut indicators, profile.higher_timeframe, rules, n);
            indicators.set_constant(
                tf,
                IndicatorSpec::Adx { period: rules.adx_period },
                45.0,
                n,
            );
            indicators.set(
                tf,
                IndicatorSpec::Cmo { period: rules.cmo_period },
                step_script(n, 0.0, rules.cmo_upper + 10.0),
            );
        }
    }

    PaperBroker::new(
        cfg.exchange_kind,
        tf,
        bars_from_closes(&vec![100.0; n]),
        indicators,
        cfg.starting_balance,
        cfg.fee_rate,
        cfg.leverage,
    )
}

/// A dip through oversold with upward momentum, then a recovery past
/// overbought so the exhaustion exit gets exercised too.
fn oscillator_rsi_script(n: usize, oversold: f64, overbought: f64) -> Vec<f64> {
    (0..n)
        .map(|i| match i {
            0..=9 => 50.0 - i as f64 * 2.0,
            10 => oversold - 5.0,
            11 => oversold - 3.0,
            _ => ((oversold - 3.0) + (i - 11) as f64 * 2.0).min(overbought + 5.0),
        })
        .collect()
}

/// Flat at `before` for the first ten bars, then `after`.
fn step_script(n: usize, before: f64, after: f64) -> Vec<f64> {
    (0..n)
        .map(|i| if i < 10 { before } else { after })
        .collect()
}

fn set_higher_tf_tema(
    indicators: &mut ScriptedIndicators,
    htf: Timeframe,
    rules: &strategy::TrendRules,
    n: usize,
) {
    indicators.set(
        htf,
        IndicatorSpec::Tema { period: rules.tema_htf_short_period },
        step_script(n, 99.5, 101.5),
    );
    indicators.set_constant(
        htf,
        IndicatorSpec::Tema { period: rules.tema_htf_long_period },
        100.0,
        n,
    );
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use common::{HyperParams, ParamValue, Timeframe};

use crate::profile::{Profile, OSCILLATOR_PARAMS, TREND_FOLLOWING_PARAMS};
use crate::Evaluator;

/// Top-level strategy config file (TOML).
///
/// Example `config/strategies.toml`:
/// ```toml
/// [[strategy]]
/// variant = "oscillator"
/// name = "BTC RSI 5m"
/// symbol = "BTC-USDT"
/// timeframe = "5m"
///
/// [strategy.params]
/// rsi_period = 14
/// rsi_oversold = 30
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(rename = "strategy")]
    pub strategies: Vec<StrategyConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Profile variant: "oscillator" or "trend_following".
    pub variant: String,
    /// Human-readable name shown in logs.
    pub name: String,
    /// Instrument, e.g. "BTC-USDT".
    pub symbol: String,
    /// Primary candle interval.
    pub timeframe: Timeframe,
    /// Secondary interval for trend alignment. Defaults per variant
    /// (15m for oscillator, 4h for trend_following).
    pub higher_timeframe: Option<Timeframe>,
    /// Hyperparameter overrides, validated against the variant's
    /// declared table.
    #[serde(default)]
    pub params: HashMap<String, toml::Value>,
}

impl StrategyFileConfig {
    /// Load from a TOML file. Exits process on error.
    pub fn load(path: &str) -> Self {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read strategy config at '{path}': {e}"));
        toml::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse strategy config at '{path}': {e}"))
    }

    /// Build an evaluator per configured strategy, panicking on
    /// unknown variants or invalid hyperparameters.
    pub fn build(&self) -> Vec<Evaluator> {
        self.strategies
            .iter()
            .map(|cfg| {
                let evaluator = build_evaluator(cfg)
                    .unwrap_or_else(|e| panic!("Invalid strategy '{}': {e}", cfg.name));
                info!(
                    name = %cfg.name,
                    variant = %cfg.variant,
                    symbol = %cfg.symbol,
                    timeframe = %cfg.timeframe,
                    "Registered strategy"
                );
                evaluator
            })
            .collect()
    }
}

fn build_evaluator(cfg: &StrategyConfig) -> Result<Evaluator, String> {
    let overrides = convert_params(&cfg.params)?;
    let profile = match cfg.variant.as_str() {
        "oscillator" => {
            let hp = HyperParams::validate(OSCILLATOR_PARAMS, &overrides)
                .map_err(|e| e.to_string())?;
            Profile::oscillator(
                &cfg.name,
                &cfg.symbol,
                cfg.timeframe,
                cfg.higher_timeframe.unwrap_or(Timeframe::Min15),
                &hp,
            )
        }
        "trend_following" => {
            let hp = HyperParams::validate(TREND_FOLLOWING_PARAMS, &overrides)
                .map_err(|e| e.to_string())?;
            Profile::trend_following(
                &cfg.name,
                &cfg.symbol,
                cfg.timeframe,
                cfg.higher_timeframe.unwrap_or(Timeframe::Hour4),
                &hp,
            )
        }
        other => return Err(format!("unknown variant '{other}'")),
    };
    Ok(Evaluator::new(profile))
}

fn convert_params(
    params: &HashMap<String, toml::Value>,
) -> Result<HashMap<String, ParamValue>, String> {
    params
        .iter()
        .map(|(name, value)| {
            let converted = match value {
                toml::Value::Integer(v) => ParamValue::Int(*v),
                toml::Value::Float(v) => ParamValue::Float(*v),
                toml::Value::Boolean(v) => ParamValue::Bool(*v),
                other => {
                    return Err(format!(
                        "parameter '{name}' must be a number or bool, got {other}"
                    ))
                }
            };
            Ok((name.clone(), converted))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::EntryRules;
    use crate::Strategy;

    const SAMPLE: &str = r#"
        [[strategy]]
        variant = "oscillator"
        name = "BTC RSI 5m"
        symbol = "BTC-USDT"
        timeframe = "5m"

        [strategy.params]
        rsi_period = 12
        use_volume_filter = true

        [[strategy]]
        variant = "trend_following"
        name = "ETH TEMA"
        symbol = "ETH-USDT"
        timeframe = "30m"
        higher_timeframe = "4h"

        [strategy.params]
        position_multiplier = 2
    "#;

    #[test]
    fn sample_file_builds_both_variants() {
        let file: StrategyFileConfig = toml::from_str(SAMPLE).unwrap();
        let evaluators = file.build();
        assert_eq!(evaluators.len(), 2);

        let EntryRules::Oscillator(rules) = &evaluators[0].profile().entry else {
            panic!("expected oscillator profile");
        };
        assert_eq!(rules.rsi_period, 12);
        assert!(rules.use_volume_filter);
        assert_eq!(evaluators[0].profile().higher_timeframe, Timeframe::Min15);

        assert_eq!(evaluators[1].profile().risk.position_multiplier, 2);
        assert_eq!(evaluators[1].profile().higher_timeframe, Timeframe::Hour4);
        assert_eq!(evaluators[1].symbol(), "ETH-USDT");
    }

    #[test]
    fn hyperparameter_tables_are_exposed_in_order() {
        let file: StrategyFileConfig = toml::from_str(SAMPLE).unwrap();
        let evaluators = file.build();
        let specs = evaluators[0].hyperparameters();
        assert_eq!(specs[0].name, "rsi_period");
        assert_eq!(specs.len(), OSCILLATOR_PARAMS.len());
    }

    #[test]
    #[should_panic(expected = "unknown variant")]
    fn unknown_variant_panics() {
        let file: StrategyFileConfig = toml::from_str(
            r#"
            [[strategy]]
            variant = "martingale"
            name = "nope"
            symbol = "BTC-USDT"
            timeframe = "5m"
            "#,
        )
        .unwrap();
        let _ = file.build();
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn out_of_range_param_panics() {
        let file: StrategyFileConfig = toml::from_str(
            r#"
            [[strategy]]
            variant = "oscillator"
            name = "bad"
            symbol = "BTC-USDT"
            timeframe = "5m"

            [strategy.params]
            rsi_period = 99
            "#,
        )
        .unwrap();
        let _ = file.build();
    }
}

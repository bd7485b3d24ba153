//! Declared hyperparameter specs and the validated value set built from
//! them. An external optimizer or config loader supplies overrides;
//! everything else falls back to the declared default. The set is
//! immutable for the duration of a run.

use std::collections::HashMap;

use crate::{Error, Result};

/// Declared type/range constraint for one tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Int { min: i64, max: i64, default: i64 },
    Float { min: f64, max: f64, step: f64, default: f64 },
    /// The categorical on/off toggle used by the strategy feature flags.
    Bool { default: bool },
}

/// One entry of the ordered parameter table a strategy exposes to the
/// optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub const fn int(name: &'static str, min: i64, max: i64, default: i64) -> Self {
        Self {
            name,
            kind: ParamKind::Int { min, max, default },
        }
    }

    pub const fn float(name: &'static str, min: f64, max: f64, step: f64, default: f64) -> Self {
        Self {
            name,
            kind: ParamKind::Float {
                min,
                max,
                step,
                default,
            },
        }
    }

    pub const fn bool(name: &'static str, default: bool) -> Self {
        Self {
            name,
            kind: ParamKind::Bool { default },
        }
    }
}

/// An untyped override value before validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Validated hyperparameter set: every declared name resolved to a
/// value within its declared bounds.
#[derive(Debug, Clone)]
pub struct HyperParams {
    values: HashMap<&'static str, ParamValue>,
}

impl HyperParams {
    /// Build the set from declared specs plus overrides. Rejects
    /// unknown names, type mismatches and out-of-range values; absent
    /// overrides take the declared default.
    pub fn validate(specs: &[ParamSpec], overrides: &HashMap<String, ParamValue>) -> Result<Self> {
        for name in overrides.keys() {
            if !specs.iter().any(|s| s.name == name) {
                return Err(Error::Hyperparameter(format!(
                    "unknown hyperparameter '{name}'"
                )));
            }
        }

        let mut values = HashMap::with_capacity(specs.len());
        for spec in specs {
            let value = match (spec.kind, overrides.get(spec.name)) {
                (ParamKind::Int { default, .. }, None) => ParamValue::Int(default),
                (ParamKind::Int { min, max, .. }, Some(&ParamValue::Int(v))) => {
                    if v < min || v > max {
                        return Err(Error::Hyperparameter(format!(
                            "'{}' = {v} outside [{min}, {max}]",
                            spec.name
                        )));
                    }
                    ParamValue::Int(v)
                }
                (ParamKind::Float { default, .. }, None) => ParamValue::Float(default),
                (ParamKind::Float { min, max, .. }, Some(&override_value)) => {
                    // Integer literals are accepted for float parameters.
                    let v = match override_value {
                        ParamValue::Float(v) => v,
                        ParamValue::Int(v) => v as f64,
                        ParamValue::Bool(_) => {
                            return Err(Error::Hyperparameter(format!(
                                "'{}' expects a float, got a bool",
                                spec.name
                            )))
                        }
                    };
                    if !v.is_finite() || v < min || v > max {
                        return Err(Error::Hyperparameter(format!(
                            "'{}' = {v} outside [{min}, {max}]",
                            spec.name
                        )));
                    }
                    ParamValue::Float(v)
                }
                (ParamKind::Bool { default }, None) => ParamValue::Bool(default),
                (ParamKind::Bool { .. }, Some(&ParamValue::Bool(v))) => ParamValue::Bool(v),
                (_, Some(other)) => {
                    return Err(Error::Hyperparameter(format!(
                        "'{}' has the wrong type: {other:?}",
                        spec.name
                    )))
                }
            };
            values.insert(spec.name, value);
        }

        Ok(Self { values })
    }

    /// Defaults only, no overrides.
    pub fn defaults(specs: &[ParamSpec]) -> Self {
        Self::validate(specs, &HashMap::new()).unwrap_or_else(|e| {
            panic!("declared parameter defaults must validate: {e}")
        })
    }

    pub fn int(&self, name: &str) -> i64 {
        match self.values.get(name) {
            Some(ParamValue::Int(v)) => *v,
            other => panic!("hyperparameter '{name}' is not an int: {other:?}"),
        }
    }

    pub fn usize(&self, name: &str) -> usize {
        self.int(name) as usize
    }

    pub fn float(&self, name: &str) -> f64 {
        match self.values.get(name) {
            Some(ParamValue::Float(v)) => *v,
            other => panic!("hyperparameter '{name}' is not a float: {other:?}"),
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        match self.values.get(name) {
            Some(ParamValue::Bool(v)) => *v,
            other => panic!("hyperparameter '{name}' is not a bool: {other:?}"),
        }
    }
}

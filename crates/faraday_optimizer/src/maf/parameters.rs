use fxhash::FxHashMap;
use tracing::{debug, info};

use crate::maf::{
    parameter::{DecodeFailure, DecodedValue, decode_parameter},
    site_config::{default_constraint_enabled, default_constraint_penalty},
};

/// The decoded MAF parameter bag for one site.
#[derive(Debug, Default, Clone)]
pub struct MafParameters {
    values: FxHashMap<String, DecodedValue>,
    failures: Vec<DecodeFailure>,
}

impl MafParameters {
    /// Decode a raw string-to-string parameter map. Unknown keys are kept;
    /// decode failures are recorded and the offending parameter is dropped.
    pub fn decode<'a, I>(raw: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut values = FxHashMap::default();
        let mut failures = Vec::new();

        for (key, value) in raw {
            if let Some(decoded) = decode_parameter(key, value, &mut failures) {
                values.insert(key.to_owned(), decoded);
            }
        }

        if !failures.is_empty() {
            info!(
                failed = failures.len(),
                "some MAF parameters failed to decode and were dropped"
            );
        }

        MafParameters { values, failures }
    }

    pub fn get(&self, key: &str) -> Option<&DecodedValue> {
        self.values.get(key)
    }

    pub fn failures(&self) -> &[DecodeFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(DecodedValue::as_bool).unwrap_or(default)
    }

    /// Integer view of a recognized key. Keys whose suffix carries no type
    /// hint decode as text (and bare `0`/`1` decode as booleans); the
    /// declared type of the closed key enumeration coerces them here.
    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(DecodedValue::Int(value)) => *value,
            Some(DecodedValue::Bool(value)) => *value as i64,
            Some(DecodedValue::Text(text)) => text.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    /// Float view of a recognized key, with the same coercions as
    /// [`MafParameters::int_or`].
    pub fn float_or(&self, key: &str, default: f64) -> f64 {
        match self.get(key) {
            Some(DecodedValue::Bool(value)) => *value as i64 as f64,
            Some(value) => value
                .as_f64()
                .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
                .unwrap_or(default),
            None => default,
        }
    }

    /// Collect the configuration of one named constraint: every key shaped
    /// `constraint_{name}_*` with the prefix stripped, plus the enablement
    /// flag and the penalty (falling back to the per-constraint defaults).
    pub fn constraint_config(&self, name: &str) -> ConstraintConfig {
        let enabled_key = format!("constraint_{name}_enabled");
        let enabled = self
            .get(&enabled_key)
            .and_then(DecodedValue::as_bool)
            .unwrap_or_else(|| default_constraint_enabled(name));

        if !enabled {
            debug!(constraint = name, "constraint disabled");
            return ConstraintConfig {
                enabled: false,
                params: FxHashMap::default(),
                penalty: 0.0,
            };
        }

        let prefix = format!("constraint_{name}_");
        let mut params = FxHashMap::default();
        for (key, value) in &self.values {
            if key.starts_with(&prefix) && *key != enabled_key {
                params.insert(key[prefix.len()..].to_owned(), value.clone());
            }
        }

        let penalty = params
            .get("penalty")
            .and_then(DecodedValue::as_f64)
            .unwrap_or_else(|| default_constraint_penalty(name));

        debug!(
            constraint = name,
            parameters = params.len(),
            penalty,
            "constraint enabled"
        );

        ConstraintConfig {
            enabled: true,
            params,
            penalty,
        }
    }
}

/// Typed configuration of a single constraint as collected from MAF.
#[derive(Debug, Clone)]
pub struct ConstraintConfig {
    pub enabled: bool,
    params: FxHashMap<String, DecodedValue>,
    pub penalty: f64,
}

impl ConstraintConfig {
    pub fn disabled() -> Self {
        ConstraintConfig {
            enabled: false,
            params: FxHashMap::default(),
            penalty: 0.0,
        }
    }

    pub fn param(&self, name: &str) -> Option<&DecodedValue> {
        self.params.get(name)
    }

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.param(name).and_then(DecodedValue::as_bool).unwrap_or(default)
    }

    pub fn int_or(&self, name: &str, default: i64) -> i64 {
        match self.param(name) {
            Some(DecodedValue::Int(value)) => *value,
            Some(DecodedValue::Bool(value)) => *value as i64,
            Some(DecodedValue::Text(text)) => text.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn float_or(&self, name: &str, default: f64) -> f64 {
        match self.param(name) {
            Some(DecodedValue::Bool(value)) => *value as i64 as f64,
            Some(value) => value
                .as_f64()
                .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
                .unwrap_or(default),
            None => default,
        }
    }

    pub fn text_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.param(name).and_then(DecodedValue::as_str).unwrap_or(default)
    }

    pub fn float_array(&self, name: &str) -> Vec<f64> {
        self.param(name)
            .and_then(DecodedValue::as_array)
            .map(|values| values.iter().filter_map(serde_json::Value::as_f64).collect())
            .unwrap_or_default()
    }
}

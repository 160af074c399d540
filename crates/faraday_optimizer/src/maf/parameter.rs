use jiff::civil;

/// A MAF parameter value after type inference.
///
/// MAF stores every parameter as a string pair. The typed value is inferred
/// from the key suffix and the shape of the value, in the fixed rule order
/// implemented by [`decode_parameter`].
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Array(Vec<serde_json::Value>),
    Object(serde_json::Map<String, serde_json::Value>),
    TimeOfDay(civil::Time),
    Text(String),
}

impl DecodedValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DecodedValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DecodedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric view: both integer and floating parameters read as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DecodedValue::Int(value) => Some(*value as f64),
            DecodedValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecodedValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[serde_json::Value]> {
        match self {
            DecodedValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match self {
            DecodedValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_time_of_day(&self) -> Option<civil::Time> {
        match self {
            DecodedValue::TimeOfDay(time) => Some(*time),
            _ => None,
        }
    }
}

/// A recorded decode failure. The parameter is treated as absent (numeric and
/// time rules) or falls back to its raw text (JSON rules); it never aborts
/// the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    pub key: String,
    pub raw: String,
    pub reason: String,
}

const NULL_SENTINELS: [&str; 5] = ["NONE", "None", "none", "NO_VALUE", ""];
const BOOLEAN_VALUES: [&str; 6] = ["true", "false", "yes", "no", "0", "1"];
const TRUTHY_VALUES: [&str; 3] = ["true", "yes", "1"];
const NUMERIC_SUFFIXES: [&str; 10] = [
    "_minutes",
    "_hours",
    "_seconds",
    "_kwh",
    "_penalty",
    "_weight",
    "_bonus",
    "_threshold",
    "_count",
    "_margin",
];

/// Infer the typed value of a MAF string parameter.
///
/// Rules, applied in order:
/// 1. sentinel nulls decode to absent;
/// 2. `_enabled`/`_flag` suffix or a boolean-shaped value decodes to bool;
/// 3. a value starting with `[` decodes as a JSON array;
/// 4. a value starting with `{` decodes as a JSON object;
/// 5. numeric suffixes decode to integer (no `.`) or float;
/// 6. `_period` suffix with a `:` in the value decodes to a time of day;
/// 7. everything else stays text.
///
/// JSON parse failures fall back to text (some legacy parameters carry
/// bracketed non-JSON syntax, e.g. the charger preference map); numeric and
/// time failures yield absent. Both are recorded in `failures`.
pub fn decode_parameter(
    key: &str,
    raw: &str,
    failures: &mut Vec<DecodeFailure>,
) -> Option<DecodedValue> {
    if NULL_SENTINELS.contains(&raw) {
        return None;
    }

    let folded = raw.to_lowercase();
    if key.ends_with("_enabled") || key.ends_with("_flag") || BOOLEAN_VALUES.contains(&folded.as_str())
    {
        return Some(DecodedValue::Bool(TRUTHY_VALUES.contains(&folded.as_str())));
    }

    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
            Ok(values) => return Some(DecodedValue::Array(values)),
            Err(err) => {
                failures.push(DecodeFailure {
                    key: key.to_owned(),
                    raw: raw.to_owned(),
                    reason: format!("invalid JSON array: {err}"),
                });
                return Some(DecodedValue::Text(raw.to_owned()));
            }
        }
    }

    if trimmed.starts_with('{') {
        match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(trimmed) {
            Ok(map) => return Some(DecodedValue::Object(map)),
            Err(err) => {
                failures.push(DecodeFailure {
                    key: key.to_owned(),
                    raw: raw.to_owned(),
                    reason: format!("invalid JSON object: {err}"),
                });
                return Some(DecodedValue::Text(raw.to_owned()));
            }
        }
    }

    if NUMERIC_SUFFIXES.iter().any(|suffix| key.ends_with(suffix)) {
        let parsed = if raw.contains('.') {
            raw.trim()
                .parse::<f64>()
                .map(DecodedValue::Float)
                .map_err(|e| e.to_string())
        } else {
            raw.trim()
                .parse::<i64>()
                .map(DecodedValue::Int)
                .map_err(|e| e.to_string())
        };

        return match parsed {
            Ok(value) => Some(value),
            Err(err) => {
                failures.push(DecodeFailure {
                    key: key.to_owned(),
                    raw: raw.to_owned(),
                    reason: format!("invalid number: {err}"),
                });
                None
            }
        };
    }

    if key.ends_with("_period") && raw.contains(':') {
        return match raw.trim().parse::<civil::Time>() {
            Ok(time) => Some(DecodedValue::TimeOfDay(time)),
            Err(err) => {
                failures.push(DecodeFailure {
                    key: key.to_owned(),
                    raw: raw.to_owned(),
                    reason: format!("invalid time of day: {err}"),
                });
                None
            }
        };
    }

    Some(DecodedValue::Text(raw.to_owned()))
}

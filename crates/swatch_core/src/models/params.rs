//! Renderer parameter values and maps.
//!
//! The renderer accepts a small set of value shapes on its command line.
//! Rather than inspecting dynamic values at render time, parameters are a
//! closed union with one rendering rule per variant.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Ordered mapping of parameter names to values.
///
/// Ordering is deterministic so that command lines and persisted preset
/// entries are stable across runs.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// A single renderer parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean literal, rendered as lowercase `true`/`false`.
    Bool(bool),
    /// Integer or floating-point number, rendered in its literal form.
    Number(Number),
    /// Inclusive numeric range, rendered as a two-element vector.
    NumberRange(Number, Number),
    /// Free-form string, quoted and escaped when rendered.
    Str(String),
}

impl ParamValue {
    /// String value.
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Integer value.
    pub fn int(value: i64) -> Self {
        Self::Number(Number::from(value))
    }

    /// Floating-point value.
    pub fn float(value: f64) -> Self {
        // Non-finite values cannot be represented in JSON; the derivation
        // rules only produce finite numbers.
        match Number::from_f64(value) {
            Some(number) => Self::Number(number),
            None => Self::Number(Number::from(0)),
        }
    }

    /// Integer range value.
    pub fn int_range(low: i64, high: i64) -> Self {
        Self::NumberRange(Number::from(low), Number::from(high))
    }

    /// Render this value as a command-line token for the renderer.
    pub fn render(&self) -> String {
        match self {
            Self::Str(text) => {
                format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Self::Bool(true) => "true".to_string(),
            Self::Bool(false) => "false".to_string(),
            Self::Number(number) => number.to_string(),
            Self::NumberRange(low, high) => format!("[{}, {}]", low, high),
        }
    }
}

/// Human-readable form for the report: strings are shown unquoted.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(text) => write!(f, "{}", text),
            other => write!(f, "{}", other.render()),
        }
    }
}

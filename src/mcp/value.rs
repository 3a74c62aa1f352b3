//! Loose argument comparison used when matching tool calls against test cases.
//!
//! Call arguments arrive as JSON and test case inputs are read from YAML, so the same number can
//! show up as `5`, `5.0` or `-5` depending on who wrote it. [`ArgValue`] normalizes both sides into
//! one tagged representation and [`ArgValue::matches`] defines equality for every pairing.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Seq(Vec<ArgValue>),
    Map(Vec<(String, ArgValue)>),
}

impl ArgValue {
    /// Numeric view of the value, normalized to `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::UInt(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Loose equality between an expected (test case) value and an actual (call) value.
    ///
    /// * numbers compare by value after normalizing to `f64`, whatever their width or sign
    /// * strings and booleans compare exactly
    /// * `null` equals `null`
    /// * sequences and mappings never match, not even against an identical structure: nested
    ///   values are not deep-compared
    /// * any other pairing does not match
    pub fn matches(&self, actual: &ArgValue) -> bool {
        if let (Some(expected), Some(actual)) = (self.as_number(), actual.as_number()) {
            return expected == actual;
        }

        match (self, actual) {
            (Self::Str(expected), Self::Str(actual)) => expected == actual,
            (Self::Bool(expected), Self::Bool(actual)) => expected == actual,
            (Self::Null, Self::Null) => true,
            _ => false,
        }
    }
}

impl From<&Value> for ArgValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Self::Str(s.clone()),
            Value::Array(items) => Self::Seq(items.iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), Self::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Subset match of call arguments against the expected input of a test case.
///
/// An empty expectation matches anything. Otherwise every expected key must be present in
/// `actual` and match under [`ArgValue::matches`]; keys only present in `actual` are ignored.
pub fn arguments_match<'a, I>(expected: I, actual: &Map<String, Value>) -> bool
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    expected.into_iter().all(|(key, expected_value)| {
        actual.get(key).map_or(false, |actual_value| {
            ArgValue::from(expected_value).matches(&ArgValue::from(actual_value))
        })
    })
}

//! Typed values shared by the variable store, the resolver and assertions.
//!
//! [`StoredValue`] is the closed set of shapes a step can keep between
//! steps. Its [`Display`](fmt::Display) implementation is the text that
//! replaces a placeholder during template evaluation.

mod number;

pub use number::{NumberFormat, NumberParseError, NumericLiteral};

use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};

/// A value kept in the [`VariableStore`](crate::store::VariableStore).
///
/// Serialises untagged so stored values read back as plain JSON. Map keys
/// keep insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    /// `true` or `false`.
    Boolean(bool),
    /// 32-bit signed integer.
    Integer(i32),
    /// 64-bit signed integer outside the 32-bit range.
    Long(i64),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 text.
    String(String),
    /// Ordered sequence of values.
    List(Vec<StoredValue>),
    /// Insertion-ordered mapping from names to values.
    Map(IndexMap<String, StoredValue>),
}

impl StoredValue {
    /// Name of the variant, used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Narrow a 64-bit integer to [`StoredValue::Integer`] when it fits.
    #[must_use]
    pub fn from_integral(value: i64) -> Self {
        NumericLiteral::from_integral(value).into()
    }

    /// Borrow the text of a [`StoredValue::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            _ => None,
        }
    }

    /// The value of a [`StoredValue::Boolean`].
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Integral variants widened to `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(i64::from(*value)),
            Self::Long(value) => Some(*value),
            _ => None,
        }
    }

    /// Whether the value is one of the numeric variants.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Long(_) | Self::Double(_))
    }

    /// Convert into a JSON value. Non-finite doubles become `null`.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Boolean(flag) => JsonValue::Bool(*flag),
            Self::Integer(value) => JsonValue::from(*value),
            Self::Long(value) => JsonValue::from(*value),
            Self::Double(value) => Number::from_f64(*value).map_or(JsonValue::Null, JsonValue::Number),
            Self::String(text) => JsonValue::String(text.clone()),
            Self::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    fn from_json_number(number: &Number) -> Self {
        if let Some(value) = number.as_i64() {
            return Self::from_integral(value);
        }
        number
            .as_f64()
            .map_or_else(|| Self::String(number.to_string()), Self::Double)
    }
}

impl From<JsonValue> for StoredValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::String(String::new()),
            JsonValue::Bool(flag) => Self::Boolean(flag),
            JsonValue::Number(number) => Self::from_json_number(&number),
            JsonValue::String(text) => Self::String(text),
            JsonValue::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            JsonValue::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, item)| (key, Self::from(item)))
                    .collect(),
            ),
        }
    }
}

impl From<NumericLiteral> for StoredValue {
    fn from(value: NumericLiteral) -> Self {
        match value {
            NumericLiteral::Integer(number) => Self::Integer(number),
            NumericLiteral::Long(number) => Self::Long(number),
            NumericLiteral::Double(number) => Self::Double(number),
        }
    }
}

impl From<bool> for StoredValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for StoredValue {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<i64> for StoredValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for StoredValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for StoredValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for StoredValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for StoredValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Self>> for StoredValue {
    fn from(entries: IndexMap<String, Self>) -> Self {
        Self::Map(entries)
    }
}

impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(flag) => write!(f, "{flag}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Long(value) => write!(f, "{value}"),
            Self::Double(value) => f.write_str(&format_double(*value)),
            Self::String(text) => f.write_str(text),
            Self::List(items) => write!(f, "[{}]", items.iter().join(", ")),
            Self::Map(entries) => write!(
                f,
                "{{{}}}",
                entries
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .join(", ")
            ),
        }
    }
}

/// Plain decimal rendering that always carries a fractional part.
fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        let text = if value.is_sign_positive() {
            "Infinity"
        } else {
            "-Infinity"
        };
        return text.to_owned();
    }
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(StoredValue::Boolean(true), "true")]
    #[case(StoredValue::Integer(-12), "-12")]
    #[case(StoredValue::Long(10_000_000_000), "10000000000")]
    #[case(StoredValue::Double(2.0), "2.0")]
    #[case(StoredValue::Double(1.5), "1.5")]
    #[case(StoredValue::Double(1e10), "10000000000.0")]
    #[case(StoredValue::Double(f64::NAN), "NaN")]
    #[case(StoredValue::Double(f64::NEG_INFINITY), "-Infinity")]
    #[case(StoredValue::from("text"), "text")]
    fn renders_scalars(#[case] value: StoredValue, #[case] expected: &str) {
        assert_eq!(value.to_string(), expected);
    }

    #[test]
    fn renders_collections_in_order() {
        let mut entries = IndexMap::new();
        entries.insert("z".to_owned(), StoredValue::Integer(1));
        entries.insert("a".to_owned(), StoredValue::from(vec!["x", "y"]));
        assert_eq!(StoredValue::Map(entries).to_string(), "{z=1, a=[x, y]}");
    }

    #[test]
    fn converts_json_with_narrowing() {
        let value = StoredValue::from(json!({
            "small": 7,
            "large": 3_000_000_000_i64,
            "ratio": 0.5,
            "missing": null,
            "tags": ["a", true]
        }));
        let StoredValue::Map(entries) = value else {
            panic!("expected a map");
        };
        assert_eq!(entries.get("small"), Some(&StoredValue::Integer(7)));
        assert_eq!(entries.get("large"), Some(&StoredValue::Long(3_000_000_000)));
        assert_eq!(entries.get("ratio"), Some(&StoredValue::Double(0.5)));
        assert_eq!(entries.get("missing"), Some(&StoredValue::from("")));
        assert_eq!(
            entries.get("tags"),
            Some(&StoredValue::List(vec![
                StoredValue::from("a"),
                StoredValue::Boolean(true)
            ]))
        );
    }

    #[test]
    fn json_round_trip_keeps_shape() {
        let source = json!({"name": "svc", "ports": [80, 443], "ratio": 1.25});
        assert_eq!(StoredValue::from(source.clone()).to_json(), source);
    }

    #[test]
    fn deserialises_untagged_values() {
        let value: StoredValue = serde_json::from_str("[1, 5000000000, 2.5, \"s\"]")
            .expect("valid JSON");
        assert_eq!(
            value,
            StoredValue::List(vec![
                StoredValue::Integer(1),
                StoredValue::Long(5_000_000_000),
                StoredValue::Double(2.5),
                StoredValue::from("s"),
            ])
        );
    }
}

//! Assertions on fields of decoded JSON response bodies.
//!
//! Fields are addressed with the same dotted and indexed paths the variable
//! store accepts. Numbers compare by value across integer and floating
//! representations.

mod error;

pub use error::AssertionError;

use std::{cmp::Ordering, fmt, str::FromStr};

use serde_json::Value as JsonValue;
use tracing::{debug, error};

use crate::{store::FieldPath, value::StoredValue};

/// Comparison applied by [`assert_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertOperator {
    /// Field equals the expected value.
    EqualTo,
    /// Field text contains the expected text.
    ContainsString,
    /// Field is an array holding exactly the expected items, in any order.
    ContainsInAnyOrder,
    /// Field is a number greater than the expected number.
    GreaterThan,
    /// Field is a number less than the expected number.
    LessThan,
}

impl AssertOperator {
    /// Canonical camel-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EqualTo => "equalTo",
            Self::ContainsString => "containsString",
            Self::ContainsInAnyOrder => "containsInAnyOrder",
            Self::GreaterThan => "greaterThan",
            Self::LessThan => "lessThan",
        }
    }
}

impl fmt::Display for AssertOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AssertOperator {
    type Err = AssertionError;

    /// Parse case-insensitively, ignoring `_` and `-`, so `equalTo`,
    /// `equal_to` and `EQUALTO` are the same operator.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised: String = value
            .trim()
            .chars()
            .filter(|ch| !matches!(ch, '_' | '-'))
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        match normalised.as_str() {
            "equalto" => Ok(Self::EqualTo),
            "containsstring" => Ok(Self::ContainsString),
            "containsinanyorder" => Ok(Self::ContainsInAnyOrder),
            "greaterthan" => Ok(Self::GreaterThan),
            "lessthan" => Ok(Self::LessThan),
            _ => {
                error!(operator = value, "unsupported assertion operator");
                Err(AssertionError::UnsupportedOperator {
                    operator: value.to_owned(),
                })
            }
        }
    }
}

/// Assert that the field at `path` in `body` satisfies `operator` against
/// `expected`.
///
/// # Errors
///
/// Returns [`AssertionError::FieldNotFound`] for a missing or `null` field
/// or a malformed path, [`AssertionError::UnsupportedType`] when the operator
/// cannot compare the values and [`AssertionError::Failed`] when the check
/// does not hold. Every failure is also logged.
pub fn assert_field(
    body: &JsonValue,
    path: &str,
    operator: AssertOperator,
    expected: &StoredValue,
) -> Result<(), AssertionError> {
    let outcome = check_field(body, path, operator, expected);
    match &outcome {
        Ok(()) => debug!(path, %operator, %expected, "response assertion passed"),
        Err(err) => error!(path, %operator, error = %err, "response assertion failed"),
    }
    outcome
}

fn check_field(
    body: &JsonValue,
    path: &str,
    operator: AssertOperator,
    expected: &StoredValue,
) -> Result<(), AssertionError> {
    let not_found = || AssertionError::FieldNotFound {
        path: path.to_owned(),
    };
    let field_path = FieldPath::parse(path).map_err(|_| not_found())?;
    let field = field_path
        .lookup_json(body)
        .filter(|value| !value.is_null())
        .ok_or_else(not_found)?;
    let actual = StoredValue::from(field.clone());

    let holds = match operator {
        AssertOperator::EqualTo => values_equal(&actual, expected),
        AssertOperator::ContainsString => actual.to_string().contains(&expected.to_string()),
        AssertOperator::ContainsInAnyOrder => {
            let StoredValue::List(items) = &actual else {
                return Err(unsupported(path, operator, &actual, expected));
            };
            let wanted = match expected {
                StoredValue::List(values) => values.as_slice(),
                scalar => std::slice::from_ref(scalar),
            };
            same_items(items, wanted)
        }
        AssertOperator::GreaterThan | AssertOperator::LessThan => {
            let ordering = compare_numbers(&actual, expected)
                .ok_or_else(|| unsupported(path, operator, &actual, expected))?;
            let wanted = if operator == AssertOperator::GreaterThan {
                Ordering::Greater
            } else {
                Ordering::Less
            };
            ordering == wanted
        }
    };

    if holds {
        Ok(())
    } else {
        Err(AssertionError::Failed {
            path: path.to_owned(),
            operator,
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

fn unsupported(
    path: &str,
    operator: AssertOperator,
    actual: &StoredValue,
    expected: &StoredValue,
) -> AssertionError {
    AssertionError::UnsupportedType {
        path: path.to_owned(),
        operator,
        actual: actual.type_name(),
        expected: expected.type_name(),
    }
}

/// Structural equality that compares numbers by value.
fn values_equal(left: &StoredValue, right: &StoredValue) -> bool {
    match (left, right) {
        (StoredValue::List(a), StoredValue::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (StoredValue::Map(a), StoredValue::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ if left.is_numeric() && right.is_numeric() => {
            compare_numbers(left, right) == Some(Ordering::Equal)
        }
        _ => left == right,
    }
}

/// Multiset equality under [`values_equal`].
fn same_items(actual: &[StoredValue], expected: &[StoredValue]) -> bool {
    if actual.len() != expected.len() {
        return false;
    }
    let mut used = vec![false; actual.len()];
    expected.iter().all(|wanted| {
        let slot = actual
            .iter()
            .zip(used.iter_mut())
            .find(|(item, taken)| !**taken && values_equal(item, wanted));
        slot.map(|(_, taken)| *taken = true).is_some()
    })
}

fn compare_numbers(left: &StoredValue, right: &StoredValue) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        return Some(a.cmp(&b));
    }
    as_f64(left)?.partial_cmp(&as_f64(right)?)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "mixed integer and floating comparisons happen in f64"
)]
fn as_f64(value: &StoredValue) -> Option<f64> {
    match value {
        StoredValue::Integer(number) => Some(f64::from(*number)),
        StoredValue::Long(number) => Some(*number as f64),
        StoredValue::Double(number) => Some(*number),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn body() -> JsonValue {
        json!({
            "name": "widget",
            "count": 3,
            "price": 9.5,
            "tags": ["red", "blue", "green"],
            "owner": {"id": 7, "roles": ["admin"]}
        })
    }

    #[rstest]
    #[case("name", AssertOperator::EqualTo, StoredValue::from("widget"))]
    #[case("count", AssertOperator::EqualTo, StoredValue::Double(3.0))]
    #[case("owner.id", AssertOperator::EqualTo, StoredValue::Long(7))]
    #[case("name", AssertOperator::ContainsString, StoredValue::from("dge"))]
    #[case(
        "tags",
        AssertOperator::ContainsInAnyOrder,
        StoredValue::from(vec!["green", "red", "blue"])
    )]
    #[case("owner.roles", AssertOperator::ContainsInAnyOrder, StoredValue::from("admin"))]
    #[case("price", AssertOperator::GreaterThan, StoredValue::Integer(9))]
    #[case("count", AssertOperator::LessThan, StoredValue::Double(3.5))]
    fn passing_assertions(
        body: JsonValue,
        #[case] path: &str,
        #[case] operator: AssertOperator,
        #[case] expected: StoredValue,
    ) {
        assert_field(&body, path, operator, &expected).expect("assertion holds");
    }

    #[rstest]
    #[case("name", AssertOperator::EqualTo, StoredValue::from("gadget"))]
    #[case("tags", AssertOperator::ContainsInAnyOrder, StoredValue::from(vec!["red", "blue"]))]
    #[case("count", AssertOperator::GreaterThan, StoredValue::Integer(3))]
    fn failing_assertions(
        body: JsonValue,
        #[case] path: &str,
        #[case] operator: AssertOperator,
        #[case] expected: StoredValue,
    ) {
        let err = assert_field(&body, path, operator, &expected).expect_err("assertion fails");
        assert!(matches!(err, AssertionError::Failed { .. }), "unexpected: {err:?}");
    }

    #[rstest]
    fn missing_field_is_reported(body: JsonValue) {
        let err = assert_field(&body, "owner.email", AssertOperator::EqualTo, &"x".into())
            .expect_err("missing field");
        assert!(matches!(err, AssertionError::FieldNotFound { ref path } if path == "owner.email"));
    }

    #[test]
    fn null_field_counts_as_missing() {
        let body = json!({"nickname": null});
        let err = assert_field(&body, "nickname", AssertOperator::EqualTo, &"".into())
            .expect_err("null is not a value");
        assert!(matches!(err, AssertionError::FieldNotFound { ref path } if path == "nickname"));
    }

    #[rstest]
    #[case("name", AssertOperator::GreaterThan, StoredValue::Integer(1))]
    #[case("count", AssertOperator::LessThan, StoredValue::from("ten"))]
    #[case("name", AssertOperator::ContainsInAnyOrder, StoredValue::from("widget"))]
    fn unsupported_types_are_reported(
        body: JsonValue,
        #[case] path: &str,
        #[case] operator: AssertOperator,
        #[case] expected: StoredValue,
    ) {
        let err = assert_field(&body, path, operator, &expected).expect_err("unsupported");
        assert!(matches!(err, AssertionError::UnsupportedType { .. }), "unexpected: {err:?}");
    }

    #[rstest]
    #[case("equalTo", AssertOperator::EqualTo)]
    #[case("CONTAINSSTRING", AssertOperator::ContainsString)]
    #[case("contains_in_any_order", AssertOperator::ContainsInAnyOrder)]
    #[case("greater-than", AssertOperator::GreaterThan)]
    #[case(" lessThan ", AssertOperator::LessThan)]
    fn parses_operator_names(#[case] input: &str, #[case] expected: AssertOperator) {
        assert_eq!(input.parse::<AssertOperator>().expect("known operator"), expected);
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = "matches".parse::<AssertOperator>().expect_err("unknown");
        assert!(matches!(err, AssertionError::UnsupportedOperator { .. }));
    }
}

//! Turn step tokens into typed values.
//!
//! A token is tried, in order, as a boolean literal, as a numeric literal
//! under the active [`NumberFormat`], as a key in the [`VariableStore`] and
//! finally taken verbatim as text.

use std::{fmt, ops::Deref};

use tracing::{debug, warn};

use crate::{
    store::VariableStore,
    value::{NumberFormat, StoredValue},
};

/// Which rule produced a [`ResolvedValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// `true` or `false`, case-insensitive.
    Boolean,
    /// A numeric literal.
    Numeric,
    /// A value read from the store.
    Stored,
    /// The token itself.
    Literal,
}

/// A resolved token and the rule that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    value: StoredValue,
    resolution: Resolution,
}

impl ResolvedValue {
    /// The resolved value.
    #[must_use]
    pub const fn value(&self) -> &StoredValue {
        &self.value
    }

    /// The rule that matched.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Take the value, discarding the resolution.
    #[must_use]
    pub fn into_value(self) -> StoredValue {
        self.value
    }
}

impl Deref for ResolvedValue {
    type Target = StoredValue;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

/// Resolves tokens against a borrowed store.
#[derive(Debug, Clone, Copy)]
pub struct TypedValueResolver<'a> {
    store: &'a VariableStore,
    format: NumberFormat,
}

impl<'a> TypedValueResolver<'a> {
    /// Resolve against `store` with the default number format.
    #[must_use]
    pub fn new(store: &'a VariableStore) -> Self {
        Self {
            store,
            format: NumberFormat::default(),
        }
    }

    /// Use `format` for numeric literals.
    #[must_use]
    pub const fn with_number_format(mut self, format: NumberFormat) -> Self {
        self.format = format;
        self
    }

    /// The store being read.
    #[must_use]
    pub const fn store(&self) -> &'a VariableStore {
        self.store
    }

    /// Resolve `token` to a typed value. Never fails.
    #[must_use]
    pub fn resolve(&self, token: &str) -> ResolvedValue {
        let resolved = self.resolve_inner(token);
        debug!(
            token,
            rule = ?resolved.resolution,
            kind = resolved.value.type_name(),
            "resolved token"
        );
        resolved
    }

    fn resolve_inner(&self, token: &str) -> ResolvedValue {
        if let Some(flag) = parse_boolean(token) {
            return ResolvedValue {
                value: StoredValue::Boolean(flag),
                resolution: Resolution::Boolean,
            };
        }
        match self.format.parse(token) {
            Some(Ok(number)) => {
                return ResolvedValue {
                    value: number.into(),
                    resolution: Resolution::Numeric,
                };
            }
            Some(Err(err)) => warn!(token, error = %err, "numeric-looking token did not parse"),
            None => {}
        }
        if let Some(stored) = self.store.get(token) {
            return ResolvedValue {
                value: stored.clone(),
                resolution: Resolution::Stored,
            };
        }
        ResolvedValue {
            value: StoredValue::from(token),
            resolution: Resolution::Literal,
        }
    }
}

fn parse_boolean(token: &str) -> Option<bool> {
    if token.eq_ignore_ascii_case("true") {
        Some(true)
    } else if token.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn store() -> VariableStore {
        let mut store = VariableStore::new();
        store.put("user", "alice");
        store.put("a", StoredValue::from(json!({"b": 42})));
        store.put("42", "never read");
        store
    }

    #[rstest]
    #[case("true", StoredValue::Boolean(true), Resolution::Boolean)]
    #[case("FALSE", StoredValue::Boolean(false), Resolution::Boolean)]
    #[case("42", StoredValue::Integer(42), Resolution::Numeric)]
    #[case("3000000000", StoredValue::Long(3_000_000_000), Resolution::Numeric)]
    #[case("1.5", StoredValue::Double(1.5), Resolution::Numeric)]
    #[case("user", StoredValue::from("alice"), Resolution::Stored)]
    #[case("a.b", StoredValue::Integer(42), Resolution::Stored)]
    #[case("unknown", StoredValue::from("unknown"), Resolution::Literal)]
    #[case("", StoredValue::from(""), Resolution::Literal)]
    fn resolves_by_rule_order(
        store: VariableStore,
        #[case] token: &str,
        #[case] value: StoredValue,
        #[case] resolution: Resolution,
    ) {
        let resolved = TypedValueResolver::new(&store).resolve(token);
        assert_eq!(resolved.value(), &value);
        assert_eq!(resolved.resolution(), resolution);
    }

    #[rstest]
    fn overflowing_numbers_fall_through_to_literal(store: VariableStore) {
        let resolved = TypedValueResolver::new(&store).resolve("1e999");
        assert_eq!(resolved.resolution(), Resolution::Literal);
        assert_eq!(resolved.to_string(), "1e999");
    }

    #[rstest]
    fn comma_separated_lists_stay_strings(store: VariableStore) {
        let resolved = TypedValueResolver::new(&store).resolve("100,200");
        assert_eq!(resolved.value(), &StoredValue::from("100,200"));
        assert_eq!(resolved.resolution(), Resolution::Literal);
    }

    #[rstest]
    fn honours_number_format(store: VariableStore) {
        let resolver = TypedValueResolver::new(&store)
            .with_number_format(NumberFormat::from_locale("de-DE"));
        assert_eq!(resolver.resolve("2,5").value(), &StoredValue::Double(2.5));
    }

    #[rstest]
    fn resolution_does_not_mutate_store(store: VariableStore) {
        let before = store.clone();
        let _resolved = TypedValueResolver::new(&store).resolve("user");
        assert_eq!(store, before);
    }
}

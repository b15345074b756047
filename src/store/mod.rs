//! Scenario-scoped variable storage.
//!
//! Steps save values under a key and later steps read them back, either
//! directly or through `${ctx.key}` placeholders. Lookups try the exact key
//! first and then treat the key as a [`FieldPath`] into a stored value, so
//! `order.id` finds the `id` member of a map saved as `order`.

mod path;

pub use path::{FieldPath, PathSyntaxError, Segment};

use indexmap::IndexMap;
use tracing::debug;

use crate::value::StoredValue;

/// Key/value storage owned by one scenario.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    entries: IndexMap<String, StoredValue>,
}

impl VariableStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value stored under `key`.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<StoredValue>) {
        let name = key.into();
        let stored = value.into();
        debug!(key = %name, kind = stored.type_name(), "storing value");
        self.entries.insert(name, stored);
    }

    /// Look up `key` exactly, then as a dotted or indexed path.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&StoredValue> {
        if let Some(value) = self.entries.get(key) {
            return Some(value);
        }
        let path = FieldPath::parse(key).ok()?;
        let (root, rest) = path.split_root()?;
        let base = self.entries.get(root)?;
        rest.lookup(base)
    }

    /// Whether [`VariableStore::get`] would find `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over top-level entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StoredValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<StoredValue>> FromIterator<(K, V)> for VariableStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (key, value) in iter {
            store.put(key, value);
        }
        store
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
        store.put("name", "widget");
        store.put("a", StoredValue::from(json!({"b": 42, "list": [1, {"c": "deep"}]})));
        store.put("a.b", "shadow");
        store
    }

    #[rstest]
    fn exact_key_wins_over_path(store: VariableStore) {
        assert_eq!(store.get("a.b"), Some(&StoredValue::from("shadow")));
    }

    #[rstest]
    #[case("a.list[0]", StoredValue::Integer(1))]
    #[case("a.list[1].c", StoredValue::from("deep"))]
    fn resolves_nested_paths(
        store: VariableStore,
        #[case] key: &str,
        #[case] expected: StoredValue,
    ) {
        assert_eq!(store.get(key), Some(&expected));
    }

    #[rstest]
    #[case("missing")]
    #[case("name.length")]
    #[case("a.list[9]")]
    #[case("a..b")]
    fn missing_keys_return_none(store: VariableStore, #[case] key: &str) {
        assert!(store.get(key).is_none());
        assert!(!store.contains(key));
    }

    #[rstest]
    fn put_overwrites_and_clear_empties(mut store: VariableStore) {
        store.put("name", 7);
        assert_eq!(store.get("name"), Some(&StoredValue::Integer(7)));
        assert_eq!(store.len(), 3);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn collects_from_pairs() {
        let store: VariableStore = [("x", 1), ("y", 2)].into_iter().collect();
        let keys: Vec<&str> = store.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ["x", "y"]);
    }
}

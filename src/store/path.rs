//! Dotted and indexed field paths such as `order.items[0].sku`.

use std::fmt;

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::value::StoredValue;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Map or object member.
    Key(String),
    /// Zero-based list or array position.
    Index(usize),
}

/// A path rejected by [`FieldPath::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid field path '{path}': {reason}")]
pub struct PathSyntaxError {
    /// The rejected path.
    pub path: String,
    /// Why the path was rejected.
    pub reason: &'static str,
}

/// A parsed field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Parse `path` into segments.
    ///
    /// # Errors
    ///
    /// Returns [`PathSyntaxError`] for empty paths or segments, unbalanced
    /// brackets and non-numeric indices.
    pub fn parse(path: &str) -> Result<Self, PathSyntaxError> {
        let fail = |reason| PathSyntaxError {
            path: path.to_owned(),
            reason,
        };
        let mut segments = Vec::new();
        for part in path.split('.') {
            let (name, brackets) = part
                .split_once('[')
                .map_or((part, None), |(head, tail)| (head, Some(tail)));
            if name.is_empty() && (brackets.is_none() || segments.is_empty()) {
                return Err(fail("empty segment"));
            }
            if !name.is_empty() {
                segments.push(Segment::Key(name.to_owned()));
            }
            let Some(mut rest) = brackets else {
                continue;
            };
            loop {
                let (index, tail) = rest.split_once(']').ok_or_else(|| fail("unclosed '['"))?;
                let position = index
                    .parse::<usize>()
                    .map_err(|_| fail("index must be a non-negative integer"))?;
                segments.push(Segment::Index(position));
                match tail.strip_prefix('[') {
                    Some(next) => rest = next,
                    None if tail.is_empty() => break,
                    None => return Err(fail("unexpected text after ']'")),
                }
            }
        }
        Ok(Self { segments })
    }

    /// The parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walk `root` along the path.
    #[must_use]
    pub fn lookup<'a>(&self, root: &'a StoredValue) -> Option<&'a StoredValue> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| match (segment, current) {
                (Segment::Key(key), StoredValue::Map(entries)) => entries.get(key),
                (Segment::Index(index), StoredValue::List(items)) => items.get(*index),
                _ => None,
            })
    }

    /// Walk a JSON document along the path.
    #[must_use]
    pub fn lookup_json<'a>(&self, root: &'a JsonValue) -> Option<&'a JsonValue> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| match segment {
                Segment::Key(key) => current.get(key.as_str()),
                Segment::Index(index) => current.get(*index),
            })
    }

    /// Split off the leading key, returning it with the remaining path.
    #[must_use]
    pub fn split_root(&self) -> Option<(&str, Self)> {
        match self.segments.split_first() {
            Some((Segment::Key(key), rest)) => Some((
                key.as_str(),
                Self {
                    segments: rest.to_vec(),
                },
            )),
            _ => None,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if position == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("a", vec![Segment::Key("a".into())])]
    #[case("a.b", vec![Segment::Key("a".into()), Segment::Key("b".into())])]
    #[case(
        "items[2].sku",
        vec![Segment::Key("items".into()), Segment::Index(2), Segment::Key("sku".into())]
    )]
    #[case(
        "grid[1][0]",
        vec![Segment::Key("grid".into()), Segment::Index(1), Segment::Index(0)]
    )]
    fn parses_paths(#[case] input: &str, #[case] expected: Vec<Segment>) {
        let path = FieldPath::parse(input).expect("valid path");
        assert_eq!(path.segments(), expected.as_slice());
        assert_eq!(path.to_string(), input);
    }

    #[rstest]
    #[case("")]
    #[case("a..b")]
    #[case("a[")]
    #[case("a[x]")]
    #[case("a[0]b")]
    #[case("[0]")]
    fn rejects_malformed_paths(#[case] input: &str) {
        assert!(FieldPath::parse(input).is_err(), "{input:?} should be rejected");
    }

    #[test]
    fn walks_json_documents() {
        let body = json!({"order": {"items": [{"sku": "A1"}, {"sku": "B2"}]}});
        let path = FieldPath::parse("order.items[1].sku").expect("valid path");
        assert_eq!(path.lookup_json(&body), Some(&json!("B2")));
        let missing = FieldPath::parse("order.items[5].sku").expect("valid path");
        assert_eq!(missing.lookup_json(&body), None);
    }

    #[test]
    fn walks_stored_values() {
        let root = StoredValue::from(json!({"b": [10, 20]}));
        let path = FieldPath::parse("b[1]").expect("valid path");
        assert_eq!(path.lookup(&root), Some(&StoredValue::Integer(20)));
    }
}

//! Reference paths into JSON documents.
//!
//! States address parts of their input with a small subset of JSONPath:
//! the root `$`, dotted field access (`$.order.id`) and array indexing
//! (`$.items[0]`). Paths are parsed once at load time and evaluated many
//! times during execution.

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Errors produced while parsing or applying a reference path.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PathError {
    #[error("invalid reference path '{path}': {reason}")]
    Invalid { path: String, reason: String },

    #[error("path '{path}' could not be resolved against the input")]
    Unresolved { path: String },

    #[error("cannot write to path '{path}': {reason}")]
    NotWritable { path: String, reason: String },
}

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Field(String),
    Index(usize),
}

/// A parsed reference path such as `$.order.items[2].sku`.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferencePath {
    raw: String,
    segments: Vec<Segment>,
}

impl ReferencePath {
    /// The root path `$`.
    pub fn root() -> Self {
        Self {
            raw: "$".to_string(),
            segments: Vec::new(),
        }
    }

    /// Parse a reference path.
    ///
    /// # Example
    ///
    /// ```rust
    /// use stepgraph::core::ReferencePath;
    /// use serde_json::json;
    ///
    /// let path = ReferencePath::parse("$.order.items[1]").unwrap();
    /// let input = json!({"order": {"items": ["a", "b"]}});
    /// assert_eq!(path.select(&input), Some(&json!("b")));
    /// ```
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let invalid = |reason: &str| PathError::Invalid {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let rest = path
            .strip_prefix('$')
            .ok_or_else(|| invalid("must start with '$'"))?;

        let chars: Vec<char> = rest.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && chars[end] != '.' && chars[end] != '[' {
                        end += 1;
                    }
                    if end == start {
                        return Err(invalid("empty field name"));
                    }
                    segments.push(Segment::Field(chars[start..end].iter().collect()));
                    i = end;
                }
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|offset| i + offset)
                        .ok_or_else(|| invalid("unterminated '['"))?;
                    let digits: String = chars[i + 1..close].iter().collect();
                    let index = digits
                        .parse::<usize>()
                        .map_err(|_| invalid("array index must be a non-negative integer"))?;
                    segments.push(Segment::Index(index));
                    i = close + 1;
                }
                _ => return Err(invalid("expected '.' or '['")),
            }
        }

        Ok(Self {
            raw: path.to_string(),
            segments,
        })
    }

    /// True for `$`.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path as written in the definition.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Look up the value this path points at, if any.
    pub fn select<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match segment {
                Segment::Field(name) => current.as_object()?.get(name),
                Segment::Index(index) => current.as_array()?.get(*index),
            })
    }

    /// Like [`select`](Self::select), but a missing value is an error.
    pub fn resolve<'a>(&self, value: &'a Value) -> Result<&'a Value, PathError> {
        self.select(value).ok_or_else(|| PathError::Unresolved {
            path: self.raw.clone(),
        })
    }

    /// Return `target` with `value` placed at this path.
    ///
    /// Missing or null intermediate fields are created as objects; writing
    /// through any other non-object value fails.
    pub fn insert(&self, mut target: Value, value: Value) -> Result<Value, PathError> {
        insert_at(&mut target, &self.segments, value).map_err(|reason| {
            PathError::NotWritable {
                path: self.raw.clone(),
                reason,
            }
        })?;
        Ok(target)
    }
}

impl fmt::Display for ReferencePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn insert_at(target: &mut Value, segments: &[Segment], value: Value) -> Result<(), String> {
    let Some((first, rest)) = segments.split_first() else {
        *target = value;
        return Ok(());
    };

    match first {
        Segment::Field(name) => {
            if target.is_null() {
                *target = Value::Object(Map::new());
            }
            let Value::Object(map) = target else {
                return Err(format!("field '{name}' is inside a non-object value"));
            };
            let slot = map.entry(name.clone()).or_insert(Value::Null);
            insert_at(slot, rest, value)
        }
        Segment::Index(index) => {
            let Value::Array(items) = target else {
                return Err(format!("index {index} is inside a non-array value"));
            };
            let slot = items
                .get_mut(*index)
                .ok_or_else(|| format!("index {index} is out of bounds"))?;
            insert_at(slot, rest, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_selects_whole_value() {
        let path = ReferencePath::parse("$").unwrap();
        let input = json!({"a": 1});

        assert!(path.is_root());
        assert_eq!(path.select(&input), Some(&input));
    }

    #[test]
    fn nested_fields_and_indexes_resolve() {
        let path = ReferencePath::parse("$.order.lines[1].sku").unwrap();
        let input = json!({"order": {"lines": [{"sku": "a"}, {"sku": "b"}]}});

        assert_eq!(path.select(&input), Some(&json!("b")));
    }

    #[test]
    fn missing_field_is_none() {
        let path = ReferencePath::parse("$.missing.deeper").unwrap();
        assert_eq!(path.select(&json!({"present": true})), None);
        assert!(matches!(
            path.resolve(&json!({})),
            Err(PathError::Unresolved { .. })
        ));
    }

    #[test]
    fn parse_rejects_bad_paths() {
        for bad in ["order", "$.", "$..a", "$[x]", "$[1", "$a"] {
            assert!(
                matches!(ReferencePath::parse(bad), Err(PathError::Invalid { .. })),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn insert_at_root_replaces_target() {
        let path = ReferencePath::root();
        let result = path.insert(json!({"a": 1}), json!("new")).unwrap();
        assert_eq!(result, json!("new"));
    }

    #[test]
    fn insert_creates_intermediate_objects() {
        let path = ReferencePath::parse("$.result.value").unwrap();
        let result = path.insert(json!({"keep": true}), json!(42)).unwrap();
        assert_eq!(result, json!({"keep": true, "result": {"value": 42}}));
    }

    #[test]
    fn insert_through_scalar_fails() {
        let path = ReferencePath::parse("$.name.first").unwrap();
        let err = path.insert(json!({"name": "ada"}), json!("x")).unwrap_err();
        assert!(matches!(err, PathError::NotWritable { .. }));
    }

    #[test]
    fn display_round_trips_raw_text() {
        let path = ReferencePath::parse("$.a[0]").unwrap();
        assert_eq!(path.to_string(), "$.a[0]");
    }
}

//! # Error Paths
//!
//! A [`FieldPath`] locates a value inside nested wire or typed data. Every
//! segment is a string: object property names, list indices rendered in
//! decimal, map keys followed by a `"key"` or `"value"` marker, and the
//! root object name contributed by a scope.
//!
//! Paths are cheap to extend: [`FieldPath::child`] returns a new path and
//! leaves the parent untouched, so sibling branches of a recursive descent
//! never observe each other's segments.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered list of segments identifying a nesting location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// The empty path (top of the data).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns a new path extended by one segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend(self.0.iter().cloned());
        segments.push(segment.into());
        Self(segments)
    }

    /// Borrow the segments in nesting order.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Renders as `a -> b -> c`; the root path renders as an empty string.
impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_does_not_mutate_parent() {
        let parent = FieldPath::root().child("a");
        let left = parent.child("b");
        let right = parent.child("c");
        assert_eq!(parent.segments(), ["a"]);
        assert_eq!(left.segments(), ["a", "b"]);
        assert_eq!(right.segments(), ["a", "c"]);
    }

    #[test]
    fn display_joins_with_arrows() {
        let path: FieldPath = ["Root", "items", "3"].into_iter().collect();
        assert_eq!(path.to_string(), "Root -> items -> 3");
        assert_eq!(FieldPath::root().to_string(), "");
    }

    #[test]
    fn serializes_as_plain_list() {
        let path: FieldPath = ["a", "key"].into_iter().collect();
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json, serde_json::json!(["a", "key"]));
    }
}

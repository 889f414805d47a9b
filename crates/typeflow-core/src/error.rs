//! # Error Types — Data Errors vs. Build Errors
//!
//! Two families of errors exist and they never mix:
//!
//! - [`ConstraintError`] is a data-level error raised by decode, validate
//!   or encode when a value or its shape is wrong. It always carries the
//!   full [`FieldPath`] to the offending value.
//! - [`BuildError`] is raised while a schema tree is being constructed
//!   (malformed property combinations, duplicate identifiers, constraints
//!   on kinds that do not support them). A tree that produced a
//!   `BuildError` is never handed out, so no call can observe one.
//!
//! Step-level classification of constraint errors (invalid input vs.
//! invalid output) lives in the plugin crate.

use thiserror::Error;

use crate::path::FieldPath;

/// The passed data violated one or more constraints of the schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", render(.path, .msg))]
pub struct ConstraintError {
    /// Location of the violating value, outermost segment first.
    pub path: FieldPath,
    /// Human-readable reason.
    pub msg: String,
}

impl ConstraintError {
    pub fn new(path: FieldPath, msg: impl Into<String>) -> Self {
        Self {
            path,
            msg: msg.into(),
        }
    }

    /// Path segments as plain strings, outermost first.
    pub fn segments(&self) -> &[String] {
        self.path.segments()
    }
}

/// The root path is left out of the message.
fn render(path: &FieldPath, msg: &str) -> String {
    if path.is_empty() {
        format!("Validation failed: {msg}")
    } else {
        format!("Validation failed for '{path}': {msg}")
    }
}

/// Schema construction failed. Raised only at build time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// An invalid argument was passed to a schema component constructor.
    #[error("{0}")]
    BadArgument(String),

    /// A component was valid on its own but the assembled tree is not.
    #[error("invalid schema definition at '{path}': {msg}")]
    InvalidDefinition {
        /// Where in the schema tree the problem was found.
        path: FieldPath,
        /// What is wrong.
        msg: String,
    },
}

impl BuildError {
    pub fn bad_argument(msg: impl Into<String>) -> Self {
        Self::BadArgument(msg.into())
    }

    pub fn invalid(path: FieldPath, msg: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            path,
            msg: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_error_has_no_path_prefix() {
        let err = ConstraintError::new(FieldPath::root(), "Must be a string");
        assert_eq!(err.to_string(), "Validation failed: Must be a string");
    }

    #[test]
    fn constraint_error_is_a_leaf_error() {
        let err: Box<dyn std::error::Error> =
            Box::new(ConstraintError::new(FieldPath::root().child("a"), "bad"));
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "Validation failed for 'a': bad");
    }

    #[test]
    fn nested_error_renders_path() {
        let path: FieldPath = ["Root", "tags", "0"].into_iter().collect();
        let err = ConstraintError::new(path, "Must be a string");
        assert_eq!(
            err.to_string(),
            "Validation failed for 'Root -> tags -> 0': Must be a string"
        );
        assert_eq!(err.segments(), ["Root", "tags", "0"]);
    }

    #[test]
    fn build_error_display() {
        let err = BuildError::invalid(
            ["Root", "a"].into_iter().collect(),
            "required conflicts with required_if",
        );
        assert_eq!(
            err.to_string(),
            "invalid schema definition at 'Root -> a': required conflicts with required_if"
        );
        assert_eq!(
            BuildError::bad_argument("Duplicate step ID x").to_string(),
            "Duplicate step ID x"
        );
    }
}

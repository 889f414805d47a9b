//! # Identifiers
//!
//! Scope object ids, reference targets, step ids and output ids share one
//! lexical rule: 1 to 255 characters drawn from ASCII letters, digits and
//! `-`, `_`, `$`, `@`.
//!
//! [`Identifier`] validates that rule at construction time, including when
//! deserialized, so an identifier held by a schema tree is always valid.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Maximum identifier length in characters.
pub const MAX_ID_LEN: usize = 255;

/// Returns true if `c` may appear in an identifier.
fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '$' | '@')
}

/// Check `id` against the identifier rule without allocating.
pub fn validate_id(id: &str) -> Result<(), BuildError> {
    if id.is_empty() || id.len() > MAX_ID_LEN {
        return Err(BuildError::bad_argument(format!(
            "identifier '{id}' must be between 1 and {MAX_ID_LEN} characters"
        )));
    }
    if let Some(bad) = id.chars().find(|c| !is_id_char(*c)) {
        return Err(BuildError::bad_argument(format!(
            "identifier '{id}' contains invalid character '{bad}'"
        )));
    }
    Ok(())
}

/// A validated scope/step/output identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Validate and wrap an identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, BuildError> {
        let id = id.into();
        validate_id(&id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Identifier {
    type Error = BuildError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_full_alphabet() {
        for id in ["a", "Node", "step-1", "out_put", "$ref", "@meta", "A9"] {
            assert!(Identifier::new(id).is_ok(), "{id} should be valid");
        }
    }

    #[test]
    fn rejects_empty_and_too_long() {
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new("a".repeat(MAX_ID_LEN)).is_ok());
        assert!(Identifier::new("a".repeat(MAX_ID_LEN + 1)).is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        for id in ["with space", "dot.ted", "slash/", "é"] {
            assert!(Identifier::new(id).is_err(), "{id} should be rejected");
        }
    }

    #[test]
    fn deserialize_validates() {
        let ok: Identifier = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(ok.as_str(), "hello");
        assert!(serde_json::from_str::<Identifier>("\"no way\"").is_err());
    }

    #[test]
    fn borrow_allows_str_lookup() {
        let mut map = std::collections::HashMap::new();
        map.insert(Identifier::new("x").unwrap(), 1);
        assert_eq!(map.get("x"), Some(&1));
    }
}

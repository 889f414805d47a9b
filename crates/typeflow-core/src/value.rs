//! # Typed Values
//!
//! [`TypedValue`] is the strongly-typed, in-memory side of every node:
//! decode produces it from wire data, validate checks it, encode projects
//! it back to wire form.
//!
//! Objects are represented by [`Record`], the host-record binding: a record
//! type identifier plus an ordered table of host field values. A field that
//! is missing from the table is *unset*. Object nodes compare the record
//! type identifier against their own id, and one-of nodes use it to pick
//! the member definition for a value.

use std::fmt;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::BuildError;

/// A compiled regular expression. Equality compares the source text.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    /// Compile a pattern supplied while building a schema.
    pub fn parse(source: &str) -> Result<Self, BuildError> {
        Self::new(source)
            .map_err(|e| BuildError::bad_argument(format!("invalid pattern '{source}': {e}")))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn regex(&self) -> &Regex {
        &self.0
    }

    /// True if the expression matches at the start of `text`.
    ///
    /// Anchor with `$` in the expression to require a whole-string match.
    pub fn matches_prefix(&self, text: &str) -> bool {
        self.0.find(text).is_some_and(|m| m.start() == 0)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Key of a typed map. Only string-like and integer-like keys exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    Int(i64),
    String(String),
}

impl MapKey {
    /// Convert a decoded key value. Only `Int` and `String` qualify.
    pub fn from_typed(value: TypedValue) -> Option<Self> {
        match value {
            TypedValue::Int(i) => Some(Self::Int(i)),
            TypedValue::String(s) => Some(Self::String(s)),
            _ => None,
        }
    }

    pub fn to_typed(&self) -> TypedValue {
        match self {
            Self::Int(i) => TypedValue::Int(*i),
            Self::String(s) => TypedValue::String(s.clone()),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for MapKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for MapKey {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// An instance of an object definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_id: String,
    fields: IndexMap<String, TypedValue>,
}

impl Record {
    /// An empty record of the given type; every field starts unset.
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<TypedValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Unset a field, returning its previous value.
    pub fn unset(&mut self, field: &str) -> Option<TypedValue> {
        self.fields.shift_remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&TypedValue> {
        self.fields.get(field)
    }

    pub fn is_set(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A decoded, strongly-typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Pattern(Pattern),
    List(Vec<TypedValue>),
    Map(IndexMap<MapKey, TypedValue>),
    Object(Record),
}

impl TypedValue {
    /// Short name of the value's kind for error messages.
    pub fn kind(&self) -> &str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Pattern(_) => "pattern",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object(record) => record.type_id(),
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Object(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Pattern> for TypedValue {
    fn from(value: Pattern) -> Self {
        Self::Pattern(value)
    }
}

impl From<Record> for TypedValue {
    fn from(value: Record) -> Self {
        Self::Object(value)
    }
}

impl<T: Into<TypedValue>> From<Vec<T>> for TypedValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

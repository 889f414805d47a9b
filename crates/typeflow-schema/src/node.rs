//! # Node Dispatch
//!
//! [`TypeNode`] is the closed set of node kinds. Every kind implements
//! [`Node`], the three-operation contract:
//!
//! - `decode`: loosely-typed wire data in, [`TypedValue`] out. Coerces,
//!   then applies the same checks as `validate`.
//! - `validate`: checks an already-typed value without coercion.
//! - `encode`: a validating projection back to wire data. It performs the
//!   checks of `validate` in the same order while it projects, so no
//!   subtree is walked twice.
//!
//! All three operations receive a [`Cursor`]: the error path so far plus
//! the innermost enclosing [`ScopeType`], against which [`RefType`] nodes
//! resolve at call time.

use serde::Serialize;
use serde_json::Value;
use typeflow_core::{BuildError, ConstraintError, FieldPath, TypedValue};

use crate::collection::{ListType, MapType};
use crate::enums::{IntEnumType, StringEnumType};
use crate::object::ObjectType;
use crate::oneof::OneOfType;
use crate::scalar::{BoolType, FloatType, IntType, PatternType, StringType};
use crate::scope::{RefType, ScopeType};

/// Position of an operation inside nested data.
#[derive(Debug, Clone, Default)]
pub struct Cursor<'s> {
    path: FieldPath,
    scope: Option<&'s ScopeType>,
}

impl<'s> Cursor<'s> {
    /// The empty path with no enclosing scope.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(path: FieldPath, scope: Option<&'s ScopeType>) -> Self {
        Self { path, scope }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn scope(&self) -> Option<&'s ScopeType> {
        self.scope
    }

    /// Descend one segment, keeping the enclosing scope.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        Self {
            path: self.path.child(segment),
            scope: self.scope,
        }
    }

    /// A constraint error at the current position.
    pub fn fail(&self, msg: impl Into<String>) -> ConstraintError {
        ConstraintError::new(self.path.clone(), msg)
    }

    /// Resolve an object id against the enclosing scope.
    pub fn lookup(&self, id: &str) -> Result<&'s ObjectType, ConstraintError> {
        match self.scope {
            Some(scope) => scope
                .object(id)
                .ok_or_else(|| self.fail(format!("Unresolved reference '{id}'"))),
            None => Err(self.fail(format!(
                "Unresolved reference '{id}': no enclosing scope"
            ))),
        }
    }
}

/// The decode/validate/encode contract shared by every node kind.
pub trait Node {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError>;

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError>;

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError>;

    /// Decode from the top of the data.
    fn decode(&self, raw: &Value) -> Result<TypedValue, ConstraintError> {
        self.decode_in(raw, &Cursor::root())
    }

    fn validate(&self, value: &TypedValue) -> Result<(), ConstraintError> {
        self.validate_in(value, &Cursor::root())
    }

    fn encode(&self, value: &TypedValue) -> Result<Value, ConstraintError> {
        self.encode_in(value, &Cursor::root())
    }
}

/// Name of a wire value's shape for error messages.
pub(crate) fn wire_kind(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

/// `'a', 'b', 'c'` for error messages.
pub(crate) fn quoted_list<I, T>(items: I) -> String
where
    I: IntoIterator<Item = T>,
    T: std::fmt::Display,
{
    items
        .into_iter()
        .map(|item| format!("'{item}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reject `min > max` for any bounded constraint.
pub(crate) fn check_bounds<T>(
    min: Option<T>,
    max: Option<T>,
    what: &str,
    path: &FieldPath,
) -> Result<(), BuildError>
where
    T: PartialOrd + std::fmt::Display,
{
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(BuildError::invalid(
            path.clone(),
            format!("{what}: min ({min}) is greater than max ({max})"),
        )),
        _ => Ok(()),
    }
}

/// A schema node. Serialises to its descriptive document, tagged by
/// `type_id`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type_id")]
pub enum TypeNode {
    #[serde(rename = "bool")]
    Bool(BoolType),
    #[serde(rename = "string")]
    String(StringType),
    #[serde(rename = "pattern")]
    Pattern(PatternType),
    #[serde(rename = "integer")]
    Int(IntType),
    #[serde(rename = "float")]
    Float(FloatType),
    #[serde(rename = "enum_string")]
    StringEnum(StringEnumType),
    #[serde(rename = "enum_integer")]
    IntEnum(IntEnumType),
    #[serde(rename = "list")]
    List(ListType),
    #[serde(rename = "map")]
    Map(MapType),
    #[serde(rename = "object")]
    Object(ObjectType),
    #[serde(rename = "one_of_string")]
    OneOfString(OneOfType<String>),
    #[serde(rename = "one_of_int")]
    OneOfInt(OneOfType<i64>),
    #[serde(rename = "ref")]
    Ref(RefType),
    #[serde(rename = "scope")]
    Scope(ScopeType),
}

impl TypeNode {
    /// The serialised `type_id` tag of this node.
    pub fn type_id(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Pattern(_) => "pattern",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::StringEnum(_) => "enum_string",
            Self::IntEnum(_) => "enum_integer",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
            Self::OneOfString(_) => "one_of_string",
            Self::OneOfInt(_) => "one_of_int",
            Self::Ref(_) => "ref",
            Self::Scope(_) => "scope",
        }
    }

    /// Shorthand for a reference node.
    pub fn reference(id: &str) -> Result<Self, BuildError> {
        RefType::new(id).map(Self::Ref)
    }

    /// Check the construction rules of this node and of the plain nodes
    /// nested in it. Objects, unions and scopes check themselves when
    /// constructed, so they are not re-entered here.
    pub fn check(&self, path: &FieldPath) -> Result<(), BuildError> {
        match self {
            Self::String(t) => t.check(path),
            Self::Int(t) => t.check(path),
            Self::Float(t) => t.check(path),
            Self::StringEnum(t) => t.check(path),
            Self::IntEnum(t) => t.check(path),
            Self::List(t) => t.check(path),
            Self::Map(t) => t.check(path),
            Self::Bool(_)
            | Self::Pattern(_)
            | Self::Object(_)
            | Self::OneOfString(_)
            | Self::OneOfInt(_)
            | Self::Ref(_)
            | Self::Scope(_) => Ok(()),
        }
    }

    /// Visit this node and every node nested in it, depth first.
    ///
    /// Nested scopes are visited but not entered: their references
    /// resolve against themselves.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a TypeNode)) {
        visit(self);
        match self {
            Self::List(t) => t.items().walk(visit),
            Self::Map(t) => {
                t.keys().walk(visit);
                t.values().walk(visit);
            }
            Self::Object(t) => {
                for property in t.properties().values() {
                    property.ty().walk(visit);
                }
            }
            Self::OneOfString(t) => {
                for member in t.types().values() {
                    member.walk(visit);
                }
            }
            Self::OneOfInt(t) => {
                for member in t.types().values() {
                    member.walk(visit);
                }
            }
            Self::Bool(_)
            | Self::String(_)
            | Self::Pattern(_)
            | Self::Int(_)
            | Self::Float(_)
            | Self::StringEnum(_)
            | Self::IntEnum(_)
            | Self::Ref(_)
            | Self::Scope(_) => {}
        }
    }

    /// True if a reference is reachable without entering a nested scope.
    pub fn has_refs(&self) -> bool {
        let mut found = false;
        self.walk(&mut |node: &TypeNode| found |= matches!(node, TypeNode::Ref(_)));
        found
    }
}

impl Node for TypeNode {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        match self {
            Self::Bool(t) => t.decode_in(raw, cx),
            Self::String(t) => t.decode_in(raw, cx),
            Self::Pattern(t) => t.decode_in(raw, cx),
            Self::Int(t) => t.decode_in(raw, cx),
            Self::Float(t) => t.decode_in(raw, cx),
            Self::StringEnum(t) => t.decode_in(raw, cx),
            Self::IntEnum(t) => t.decode_in(raw, cx),
            Self::List(t) => t.decode_in(raw, cx),
            Self::Map(t) => t.decode_in(raw, cx),
            Self::Object(t) => t.decode_in(raw, cx),
            Self::OneOfString(t) => t.decode_in(raw, cx),
            Self::OneOfInt(t) => t.decode_in(raw, cx),
            Self::Ref(t) => t.decode_in(raw, cx),
            Self::Scope(t) => t.decode_in(raw, cx),
        }
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        match self {
            Self::Bool(t) => t.validate_in(value, cx),
            Self::String(t) => t.validate_in(value, cx),
            Self::Pattern(t) => t.validate_in(value, cx),
            Self::Int(t) => t.validate_in(value, cx),
            Self::Float(t) => t.validate_in(value, cx),
            Self::StringEnum(t) => t.validate_in(value, cx),
            Self::IntEnum(t) => t.validate_in(value, cx),
            Self::List(t) => t.validate_in(value, cx),
            Self::Map(t) => t.validate_in(value, cx),
            Self::Object(t) => t.validate_in(value, cx),
            Self::OneOfString(t) => t.validate_in(value, cx),
            Self::OneOfInt(t) => t.validate_in(value, cx),
            Self::Ref(t) => t.validate_in(value, cx),
            Self::Scope(t) => t.validate_in(value, cx),
        }
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        match self {
            Self::Bool(t) => t.encode_in(value, cx),
            Self::String(t) => t.encode_in(value, cx),
            Self::Pattern(t) => t.encode_in(value, cx),
            Self::Int(t) => t.encode_in(value, cx),
            Self::Float(t) => t.encode_in(value, cx),
            Self::StringEnum(t) => t.encode_in(value, cx),
            Self::IntEnum(t) => t.encode_in(value, cx),
            Self::List(t) => t.encode_in(value, cx),
            Self::Map(t) => t.encode_in(value, cx),
            Self::Object(t) => t.encode_in(value, cx),
            Self::OneOfString(t) => t.encode_in(value, cx),
            Self::OneOfInt(t) => t.encode_in(value, cx),
            Self::Ref(t) => t.encode_in(value, cx),
            Self::Scope(t) => t.encode_in(value, cx),
        }
    }
}

macro_rules! node_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for TypeNode {
                fn from(node: $ty) -> Self {
                    Self::$variant(node)
                }
            }
        )*
    };
}

node_from!(
    Bool(BoolType),
    String(StringType),
    Pattern(PatternType),
    Int(IntType),
    Float(FloatType),
    StringEnum(StringEnumType),
    IntEnum(IntEnumType),
    List(ListType),
    Map(MapType),
    Object(ObjectType),
    OneOfString(OneOfType<String>),
    OneOfInt(OneOfType<i64>),
    Ref(RefType),
    Scope(ScopeType),
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_kind_names() {
        assert_eq!(wire_kind(&json!(null)), "null");
        assert_eq!(wire_kind(&json!(3)), "integer");
        assert_eq!(wire_kind(&json!(3.5)), "float");
        assert_eq!(wire_kind(&json!({})), "map");
    }

    #[test]
    fn cursor_child_keeps_scope_and_extends_path() {
        let cx = Cursor::root().child("a").child("0");
        assert_eq!(cx.path().segments(), ["a", "0"]);
        assert!(cx.scope().is_none());
        let err = cx.fail("boom");
        assert_eq!(err.to_string(), "Validation failed for 'a -> 0': boom");
    }

    #[test]
    fn lookup_without_scope_is_an_error() {
        let err = Cursor::root().child("x").lookup("Node").unwrap_err();
        assert_eq!(err.segments(), ["x"]);
        assert!(err.msg.contains("Unresolved reference 'Node'"));
    }

    #[test]
    fn serialises_with_type_id_tag() {
        let node = TypeNode::from(BoolType::new());
        assert_eq!(serde_json::to_value(&node).unwrap(), json!({"type_id": "bool"}));
        assert_eq!(node.type_id(), "bool");

        let node = TypeNode::from(IntType::new().min(1));
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"type_id": "integer", "min": 1})
        );
    }

    #[test]
    fn has_refs_finds_nested_references() {
        let list = TypeNode::from(ListType::new(TypeNode::reference("Node").unwrap()));
        assert!(list.has_refs());
        assert!(!TypeNode::from(ListType::new(BoolType::new())).has_refs());
    }
}

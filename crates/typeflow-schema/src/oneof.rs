//! # Discriminated Unions
//!
//! [`OneOfType`] selects one of several object definitions by a tag field
//! on the wire (`"_type"` unless configured otherwise). The tag is either a
//! string or an integer, captured by the [`Discriminator`] trait.
//!
//! A member may or may not declare the tag as one of its own properties:
//!
//! - **Declared**: the tag travels through the member like any other
//!   field. Its type must match the discriminator kind, and its value must
//!   equal the member's key.
//! - **Not declared**: decode strips the tag before handing the map to the
//!   member, and encode injects it into the member's output.
//!
//! In typed data, the member is selected by the record type of the value.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use typeflow_core::{BuildError, ConstraintError, FieldPath, Record, TypedValue};

use crate::node::{quoted_list, wire_kind, Cursor, Node, TypeNode};
use crate::object::ObjectType;
use crate::scope::ScopeType;

/// Default name of the tag field.
pub const DEFAULT_DISCRIMINATOR: &str = "_type";

/// Key type of a discriminated union.
pub trait Discriminator:
    Clone + Eq + Hash + fmt::Debug + fmt::Display + Serialize + Send + Sync + 'static
{
    /// Kind name used in build errors.
    const KIND: &'static str;

    /// Coerce a wire tag with the rules of the matching scalar node.
    fn from_wire(raw: &Value) -> Result<Self, String>;

    fn to_wire(&self) -> Value;

    fn to_typed(&self) -> TypedValue;

    /// True if a member property of this type may carry the tag.
    fn fits_property(node: &TypeNode) -> bool;
}

impl Discriminator for String {
    const KIND: &'static str = "string";

    fn from_wire(raw: &Value) -> Result<Self, String> {
        match raw {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
            other => Err(format!("Must be a string, {} given", wire_kind(other))),
        }
    }

    fn to_wire(&self) -> Value {
        Value::String(self.clone())
    }

    fn to_typed(&self) -> TypedValue {
        TypedValue::String(self.clone())
    }

    fn fits_property(node: &TypeNode) -> bool {
        matches!(node, TypeNode::String(_) | TypeNode::StringEnum(_))
    }
}

impl Discriminator for i64 {
    const KIND: &'static str = "integer";

    fn from_wire(raw: &Value) -> Result<Self, String> {
        match raw {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| format!("Must be an integer, {n} given")),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("Must be an integer, '{s}' given")),
            other => Err(format!("Must be an integer, {} given", wire_kind(other))),
        }
    }

    fn to_wire(&self) -> Value {
        Value::from(*self)
    }

    fn to_typed(&self) -> TypedValue {
        TypedValue::Int(*self)
    }

    fn fits_property(node: &TypeNode) -> bool {
        matches!(node, TypeNode::Int(_) | TypeNode::IntEnum(_))
    }
}

/// A union of object definitions keyed by a discriminator value.
#[derive(Debug, Clone, Serialize)]
pub struct OneOfType<K: Discriminator> {
    types: IndexMap<K, TypeNode>,
    discriminator_field_name: String,
}

impl<K: Discriminator> OneOfType<K> {
    /// Build a union over `types`, tagged by `discriminator_field_name`.
    ///
    /// Members must be objects or references to objects. Inline members are
    /// checked here; members behind references are checked when the
    /// enclosing scope links.
    pub fn new(
        discriminator_field_name: &str,
        types: impl IntoIterator<Item = (K, TypeNode)>,
    ) -> Result<Self, BuildError> {
        if discriminator_field_name.is_empty() {
            return Err(BuildError::bad_argument(
                "discriminator field name must not be empty",
            ));
        }
        let mut table = IndexMap::new();
        for (key, member) in types {
            if !matches!(member, TypeNode::Object(_) | TypeNode::Ref(_)) {
                return Err(BuildError::bad_argument(format!(
                    "one-of member '{key}' must be an object or a reference, {} given",
                    member.type_id()
                )));
            }
            if table.contains_key(&key) {
                return Err(BuildError::bad_argument(format!(
                    "duplicate discriminator value '{key}'"
                )));
            }
            table.insert(key, member);
        }
        if table.is_empty() {
            return Err(BuildError::bad_argument("one-of needs at least one member"));
        }
        let union = Self {
            types: table,
            discriminator_field_name: discriminator_field_name.to_string(),
        };
        union.check_members(None, &FieldPath::root())?;
        Ok(union)
    }

    /// Build a union tagged by [`DEFAULT_DISCRIMINATOR`].
    pub fn tagged(types: impl IntoIterator<Item = (K, TypeNode)>) -> Result<Self, BuildError> {
        Self::new(DEFAULT_DISCRIMINATOR, types)
    }

    pub fn types(&self) -> &IndexMap<K, TypeNode> {
        &self.types
    }

    pub fn discriminator_field_name(&self) -> &str {
        &self.discriminator_field_name
    }

    /// Re-check the members once `scope` can resolve references.
    pub(crate) fn check_linked(&self, scope: &ScopeType, path: &FieldPath) -> Result<(), BuildError> {
        self.check_members(Some(scope), path)
    }

    fn check_members(&self, scope: Option<&ScopeType>, path: &FieldPath) -> Result<(), BuildError> {
        let mut seen: IndexMap<&str, &K> = IndexMap::new();
        for (key, member) in &self.types {
            let object = match (member, scope) {
                (TypeNode::Object(object), _) => object,
                (TypeNode::Ref(r), Some(scope)) => scope.object(r.id()).ok_or_else(|| {
                    BuildError::invalid(
                        path.clone(),
                        format!("one-of member '{key}' refers to undefined object '{}'", r.id()),
                    )
                })?,
                _ => continue,
            };
            if let Some(other) = seen.insert(object.id(), key) {
                return Err(BuildError::invalid(
                    path.clone(),
                    format!(
                        "record type '{}' is bound to both '{other}' and '{key}'",
                        object.id()
                    ),
                ));
            }
            self.check_tag_property(key, object, path)?;
        }
        Ok(())
    }

    fn check_tag_property(
        &self,
        key: &K,
        object: &ObjectType,
        path: &FieldPath,
    ) -> Result<(), BuildError> {
        let field = &self.discriminator_field_name;
        let Some(property) = object.property(field) else {
            return Ok(());
        };
        if !K::fits_property(property.ty()) {
            return Err(BuildError::invalid(
                path.clone(),
                format!(
                    "discriminator field '{field}' on '{}' must be of {} type, {} given",
                    object.id(),
                    K::KIND,
                    property.ty().type_id()
                ),
            ));
        }
        property.ty().validate(&key.to_typed()).map_err(|e| {
            BuildError::invalid(
                path.clone(),
                format!(
                    "discriminator value '{key}' is not valid for '{field}' on '{}': {}",
                    object.id(),
                    e.msg
                ),
            )
        })
    }

    fn member_names(&self) -> String {
        quoted_list(self.types.values().map(member_name))
    }

    /// The member bound to `record`'s type, with its key.
    fn select<'a>(
        &'a self,
        value: &'a TypedValue,
        cx: &Cursor<'a>,
    ) -> Result<(&'a K, &'a ObjectType, &'a Record), ConstraintError> {
        let record = value.as_record().ok_or_else(|| {
            cx.fail(format!(
                "Invalid type: '{}', expected one of: {}",
                value.kind(),
                self.member_names()
            ))
        })?;
        let (key, member) = self
            .types
            .iter()
            .find(|(_, member)| member_name(member) == record.type_id())
            .ok_or_else(|| {
                cx.fail(format!(
                    "Invalid type: '{}', expected one of: {}",
                    record.type_id(),
                    self.member_names()
                ))
            })?;
        Ok((key, member_object(member, cx)?, record))
    }

    /// A declared tag property must hold exactly the member's key.
    fn check_declared_tag(
        &self,
        key: &K,
        object: &ObjectType,
        record: &Record,
        cx: &Cursor<'_>,
    ) -> Result<(), ConstraintError> {
        let field = &self.discriminator_field_name;
        if let Some(property) = object.property(field) {
            if record.get(property.field_name(field)) != Some(&key.to_typed()) {
                return Err(cx.child(field.as_str()).fail(format!(
                    "Invalid value for '{field}' on '{}', should be: '{key}'",
                    object.id()
                )));
            }
        }
        Ok(())
    }
}

/// Record type name of a member without resolving it.
fn member_name(member: &TypeNode) -> &str {
    match member {
        TypeNode::Object(object) => object.id(),
        TypeNode::Ref(r) => r.id(),
        other => other.type_id(),
    }
}

fn member_object<'a>(
    member: &'a TypeNode,
    cx: &Cursor<'a>,
) -> Result<&'a ObjectType, ConstraintError> {
    match member {
        TypeNode::Object(object) => Ok(object),
        TypeNode::Ref(r) => cx.lookup(r.id()),
        other => Err(cx.fail(format!(
            "one-of member must be an object, {} found",
            other.type_id()
        ))),
    }
}

impl<K: Discriminator> Node for OneOfType<K> {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        let field = &self.discriminator_field_name;
        let map = raw
            .as_object()
            .ok_or_else(|| cx.fail(format!("Must be a map, {} given", wire_kind(raw))))?;
        let tag_cx = cx.child(field.as_str());
        let tag = map
            .get(field)
            .ok_or_else(|| tag_cx.fail("Required discriminator field not found"))?;
        let key = K::from_wire(tag).map_err(|msg| tag_cx.fail(msg))?;
        let member = self.types.get(&key).ok_or_else(|| {
            tag_cx.fail(format!(
                "Invalid value for field: '{key}', expected one of: {}",
                quoted_list(self.types.keys())
            ))
        })?;
        let object = member_object(member, cx)?;
        if object.property(field).is_some() {
            object.decode_in(raw, cx)
        } else {
            let mut stripped = map.clone();
            stripped.remove(field);
            object.decode_in(&Value::Object(stripped), cx)
        }
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        let (key, object, record) = self.select(value, cx)?;
        object.validate_in(value, cx)?;
        self.check_declared_tag(key, object, record, cx)
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        let (key, object, record) = self.select(value, cx)?;
        let mut encoded = object.encode_in(value, cx)?;
        self.check_declared_tag(key, object, record, cx)?;
        if object.property(&self.discriminator_field_name).is_none() {
            if let Value::Object(map) = &mut encoded {
                map.insert(self.discriminator_field_name.clone(), key.to_wire());
            }
        }
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::StringEnumType;
    use crate::object::PropertyType;
    use crate::scalar::{IntType, StringType};
    use serde_json::json;

    fn circle() -> ObjectType {
        ObjectType::new("Circle", [("r", PropertyType::new(IntType::new()).required())]).unwrap()
    }

    fn square() -> ObjectType {
        ObjectType::new("Square", [("side", PropertyType::new(IntType::new()))]).unwrap()
    }

    fn shapes() -> OneOfType<String> {
        OneOfType::tagged([
            ("circle".to_string(), circle().into()),
            ("square".to_string(), square().into()),
        ])
        .unwrap()
    }

    #[test]
    fn undeclared_tag_is_stripped_and_reinstated() {
        let union = shapes();
        let raw = json!({"_type": "circle", "r": 1});
        let value = union.decode(&raw).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.type_id(), "Circle");
        assert!(!record.is_set("_type"));
        assert_eq!(union.encode(&value), Ok(raw));
    }

    #[test]
    fn decode_errors_point_at_the_tag() {
        let union = shapes();
        let err = union.decode(&json!({"r": 1})).unwrap_err();
        assert_eq!(err.segments(), ["_type"]);
        assert_eq!(err.msg, "Required discriminator field not found");

        let err = union.decode(&json!({"_type": "hexagon"})).unwrap_err();
        assert_eq!(
            err.msg,
            "Invalid value for field: 'hexagon', expected one of: 'circle', 'square'"
        );
        assert!(union.decode(&json!([1])).is_err());
    }

    #[test]
    fn member_errors_keep_the_union_path() {
        let union = shapes();
        let err = union.decode(&json!({"_type": "circle"})).unwrap_err();
        assert_eq!(err.segments(), ["r"]);
    }

    #[test]
    fn validate_selects_by_record_type() {
        let union = shapes();
        assert!(union
            .validate(&Record::new("Square").with("side", 2i64).into())
            .is_ok());
        let err = union
            .validate(&Record::new("Triangle").into())
            .unwrap_err();
        assert_eq!(
            err.msg,
            "Invalid type: 'Triangle', expected one of: 'Circle', 'Square'"
        );
        assert!(union.validate(&TypedValue::Int(1)).is_err());
    }

    #[test]
    fn declared_tag_must_match_the_key() {
        let tagged_circle = ObjectType::new(
            "Circle",
            [
                ("kind", PropertyType::new(StringType::new()).required()),
                ("r", PropertyType::new(IntType::new())),
            ],
        )
        .unwrap();
        let union =
            OneOfType::<String>::new("kind", [("circle".to_string(), tagged_circle.into())]).unwrap();

        let raw = json!({"kind": "circle", "r": 2});
        let value = union.decode(&raw).unwrap();
        assert_eq!(
            value.as_record().unwrap().get("kind"),
            Some(&TypedValue::from("circle"))
        );
        assert_eq!(union.encode(&value), Ok(raw));

        let wrong = Record::new("Circle").with("kind", "square");
        let err = union.validate(&wrong.clone().into()).unwrap_err();
        assert_eq!(err.segments(), ["kind"]);
        assert!(union.encode(&wrong.into()).is_err());
    }

    #[test]
    fn int_union_coerces_and_injects_numbers() {
        let union = OneOfType::<i64>::tagged([(1, circle().into()), (2, square().into())]).unwrap();
        let value = union.decode(&json!({"_type": "2", "side": 3})).unwrap();
        assert_eq!(value.as_record().unwrap().type_id(), "Square");
        assert_eq!(union.encode(&value), Ok(json!({"_type": 2, "side": 3})));
    }

    #[test]
    fn build_rules() {
        // Members must be objects.
        assert!(OneOfType::<String>::tagged([("a".to_string(), IntType::new().into())]).is_err());
        // At least one member.
        assert!(OneOfType::<String>::tagged([]).is_err());
        // The same record type cannot be bound twice.
        assert!(OneOfType::<String>::tagged([
            ("a".to_string(), circle().into()),
            ("b".to_string(), circle().into()),
        ])
        .is_err());
        // A declared tag must have the discriminator's kind.
        let int_tag = ObjectType::new("C", [("_type", PropertyType::new(IntType::new()))]).unwrap();
        assert!(OneOfType::<String>::tagged([("c".to_string(), int_tag.into())]).is_err());
        // And the key must be a valid value for it.
        let enum_tag = ObjectType::new(
            "C",
            [("_type", PropertyType::new(StringEnumType::of(["x"])))],
        )
        .unwrap();
        assert!(OneOfType::<String>::tagged([("c".to_string(), enum_tag.clone().into())]).is_err());
        assert!(OneOfType::<String>::tagged([("x".to_string(), enum_tag.into())]).is_ok());
    }

    #[test]
    fn serialises_members_and_field_name() {
        let doc = serde_json::to_value(&TypeNode::from(shapes())).unwrap();
        assert_eq!(doc["type_id"], json!("one_of_string"));
        assert_eq!(doc["discriminator_field_name"], json!("_type"));
        assert_eq!(doc["types"]["circle"]["id"], json!("Circle"));
    }
}

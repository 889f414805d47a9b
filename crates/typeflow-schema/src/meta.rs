//! # Meta-Schema
//!
//! Every node serialises to a descriptive document tagged by `type_id`.
//! [`scope_schema`] builds, with this crate's own nodes, a scope that
//! describes that document format. [`check_scope`] serialises a scope and
//! decodes the result against it, so a schema description can be checked
//! by the same engine that checks data. The meta-schema accepts its own
//! description.

use serde_json::Value;
use typeflow_core::{BuildError, ConstraintError, FieldPath, Pattern, TypedValue};

use crate::collection::{ListType, MapType};
use crate::node::{Node, TypeNode};
use crate::object::{ObjectType, PropertyType};
use crate::oneof::OneOfType;
use crate::scalar::{BoolType, FloatType, IntType, PatternType, StringType};
use crate::scope::ScopeType;

/// Tag name to object id for every node kind.
const VALUE_TYPES: [(&str, &str); 14] = [
    ("bool", "BoolType"),
    ("string", "StringType"),
    ("pattern", "PatternType"),
    ("integer", "IntType"),
    ("float", "FloatType"),
    ("enum_string", "StringEnumType"),
    ("enum_integer", "IntEnumType"),
    ("list", "ListType"),
    ("map", "MapType"),
    ("object", "Object"),
    ("one_of_string", "OneOfStringType"),
    ("one_of_int", "OneOfIntType"),
    ("ref", "RefType"),
    ("scope", "Scope"),
];

/// Node kinds allowed as map keys.
const KEY_TYPES: [(&str, &str); 4] = [
    ("string", "StringType"),
    ("integer", "IntType"),
    ("enum_string", "StringEnumType"),
    ("enum_integer", "IntEnumType"),
];

fn union_of(members: &[(&str, &str)]) -> Result<TypeNode, BuildError> {
    let types = members
        .iter()
        .map(|(tag, id)| Ok((tag.to_string(), TypeNode::reference(id)?)))
        .collect::<Result<Vec<_>, BuildError>>()?;
    OneOfType::<String>::new("type_id", types).map(TypeNode::from)
}

fn id_string() -> Result<StringType, BuildError> {
    Ok(StringType::new()
        .min(1)
        .max(typeflow_core::MAX_ID_LEN)
        .pattern(Pattern::parse(r"^[a-zA-Z0-9_$@-]+$")?))
}

fn text() -> PropertyType {
    PropertyType::new(StringType::new())
}

fn names() -> PropertyType {
    PropertyType::new(ListType::new(StringType::new().min(1)))
}

fn reference(id: &str) -> Result<PropertyType, BuildError> {
    TypeNode::reference(id).map(PropertyType::new)
}

fn count() -> PropertyType {
    PropertyType::new(IntType::new().min(0))
}

/// The meta-schema: a scope rooted at `Scope` describing serialised
/// scopes, objects, properties and every node kind.
pub fn scope_schema() -> Result<ScopeType, BuildError> {
    let value_type = || union_of(&VALUE_TYPES);

    let display = ObjectType::new(
        "Display",
        [
            ("name", text().description("Short name or title.")),
            ("description", text()),
            ("icon", text().description("SVG icon, 64x64.")),
        ],
    )?;
    let unit = ObjectType::new(
        "Unit",
        [
            ("name_short_singular", text().required()),
            ("name_short_plural", text().required()),
            ("name_long_singular", text().required()),
            ("name_long_plural", text().required()),
        ],
    )?;
    let units = ObjectType::new(
        "Units",
        [
            ("base_unit", reference("Unit")?.required()),
            (
                "multipliers",
                PropertyType::new(MapType::new(
                    IntType::new().min(1),
                    TypeNode::reference("Unit")?,
                )),
            ),
        ],
    )?;
    let property = ObjectType::new(
        "Property",
        [
            ("type", PropertyType::new(value_type()?).required()),
            ("display", reference("Display")?),
            ("default", text().description("Default value as JSON text.")),
            ("examples", PropertyType::new(ListType::new(StringType::new()))),
            ("required", PropertyType::new(BoolType::new())),
            ("required_if", names()),
            ("required_if_not", names()),
            ("conflicts", names()),
        ],
    )?;
    let object = ObjectType::new(
        "Object",
        [
            ("id", PropertyType::new(id_string()?).required()),
            (
                "properties",
                PropertyType::new(MapType::new(
                    StringType::new().min(1),
                    TypeNode::reference("Property")?,
                ))
                .required(),
            ),
        ],
    )?;
    let scope = ObjectType::new(
        "Scope",
        [
            ("root", PropertyType::new(id_string()?).required()),
            (
                "objects",
                PropertyType::new(MapType::new(id_string()?, TypeNode::reference("Object")?))
                    .required(),
            ),
        ],
    )?;

    let bool_type = ObjectType::new("BoolType", Vec::<(String, PropertyType)>::new())?;
    let pattern_type = ObjectType::new("PatternType", Vec::<(String, PropertyType)>::new())?;
    let string_type = ObjectType::new(
        "StringType",
        [
            ("min", count()),
            ("max", count()),
            ("pattern", PropertyType::new(PatternType::new())),
        ],
    )?;
    let int_type = ObjectType::new(
        "IntType",
        [
            ("min", PropertyType::new(IntType::new())),
            ("max", PropertyType::new(IntType::new())),
            ("units", reference("Units")?),
        ],
    )?;
    let float_type = ObjectType::new(
        "FloatType",
        [
            ("min", PropertyType::new(FloatType::new())),
            ("max", PropertyType::new(FloatType::new())),
            ("units", reference("Units")?),
        ],
    )?;
    let string_enum = ObjectType::new(
        "StringEnumType",
        [(
            "values",
            PropertyType::new(
                MapType::new(StringType::new(), TypeNode::reference("Display")?).min(1),
            )
            .required(),
        )],
    )?;
    let int_enum = ObjectType::new(
        "IntEnumType",
        [
            (
                "values",
                PropertyType::new(
                    MapType::new(IntType::new(), TypeNode::reference("Display")?).min(1),
                )
                .required(),
            ),
            ("units", reference("Units")?),
        ],
    )?;
    let list_type = ObjectType::new(
        "ListType",
        [
            ("items", PropertyType::new(value_type()?).required()),
            ("min", count()),
            ("max", count()),
        ],
    )?;
    let map_type = ObjectType::new(
        "MapType",
        [
            ("keys", PropertyType::new(union_of(&KEY_TYPES)?).required()),
            ("values", PropertyType::new(value_type()?).required()),
            ("min", count()),
            ("max", count()),
        ],
    )?;
    let discriminator = || {
        PropertyType::new(StringType::new().min(1))
            .required()
            .default_json(r#""_type""#)
    };
    let one_of_string = ObjectType::new(
        "OneOfStringType",
        [
            (
                "types",
                PropertyType::new(MapType::new(StringType::new(), value_type()?).min(1))
                    .required(),
            ),
            ("discriminator_field_name", discriminator()),
        ],
    )?;
    let one_of_int = ObjectType::new(
        "OneOfIntType",
        [
            (
                "types",
                PropertyType::new(MapType::new(IntType::new(), value_type()?).min(1)).required(),
            ),
            ("discriminator_field_name", discriminator()),
        ],
    )?;
    let ref_type = ObjectType::new("RefType", [("id", PropertyType::new(id_string()?).required())])?;

    ScopeType::new(
        "Scope",
        [
            scope,
            object,
            property,
            display,
            unit,
            units,
            bool_type,
            string_type,
            pattern_type,
            int_type,
            float_type,
            string_enum,
            int_enum,
            list_type,
            map_type,
            one_of_string,
            one_of_int,
            ref_type,
        ],
    )
}

/// Serialise `scope` and decode the description against the meta-schema.
pub fn check_scope(scope: &ScopeType) -> Result<TypedValue, ConstraintError> {
    let meta = scope_schema().map_err(|e| {
        ConstraintError::new(FieldPath::root(), format!("meta-schema is invalid: {e}"))
    })?;
    let doc: Value = serde_json::to_value(scope).map_err(|e| {
        ConstraintError::new(FieldPath::root(), format!("scope cannot be serialised: {e}"))
    })?;
    meta.decode(&doc)
}

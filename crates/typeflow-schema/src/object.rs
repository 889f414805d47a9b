//! # Objects and Properties
//!
//! An [`ObjectType`] is an ordered table of [`PropertyType`] descriptors
//! bound to a record type. Its id doubles as the record type identifier
//! that typed values must carry.
//!
//! ## Requiredness
//!
//! When a property has no value (missing, or `null` on the wire) the rules
//! are applied in this order, first match wins:
//!
//! 1. `required` set: "This field is required".
//! 2. a `required_if` sibling is present.
//! 3. `required_if_not` is non-empty and none of its siblings are present.
//!
//! When the property has a value, it fails if any `conflicts` sibling is
//! present too. The same rules run in decode, validate and encode.
//!
//! ## Host Fields
//!
//! Each property reads and writes the record field of the same name unless
//! [`PropertyType::field`] overrides it. Host field names are unique within
//! an object, and validate rejects records carrying undeclared fields.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use typeflow_core::{
    BuildError, ConstraintError, DisplayValue, FieldPath, Identifier, Record, TypedValue,
};

use crate::node::{quoted_list, wire_kind, Cursor, Node, TypeNode};

/// A named field of an object: its type, metadata and presence rules.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyType {
    #[serde(rename = "type")]
    ty: TypeNode,
    #[serde(skip_serializing_if = "DisplayValue::is_empty")]
    display: DisplayValue,
    /// Pre-encoded JSON text.
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<String>,
    /// Pre-encoded JSON texts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    examples: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    required_if: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    required_if_not: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    conflicts: Vec<String>,
    #[serde(skip)]
    field: Option<String>,
}

impl PropertyType {
    pub fn new(ty: impl Into<TypeNode>) -> Self {
        Self {
            ty: ty.into(),
            display: DisplayValue::default(),
            default: None,
            examples: Vec::new(),
            required: false,
            required_if: Vec::new(),
            required_if_not: Vec::new(),
            conflicts: Vec::new(),
            field: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Required whenever `sibling` is present.
    pub fn required_if(mut self, sibling: impl Into<String>) -> Self {
        self.required_if.push(sibling.into());
        self
    }

    /// Required whenever none of the `required_if_not` siblings is present.
    pub fn required_if_not(mut self, sibling: impl Into<String>) -> Self {
        self.required_if_not.push(sibling.into());
        self
    }

    pub fn conflicts(mut self, sibling: impl Into<String>) -> Self {
        self.conflicts.push(sibling.into());
        self
    }

    pub fn display(mut self, display: DisplayValue) -> Self {
        self.display = display;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.display.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.display.description = Some(description.into());
        self
    }

    /// Default value as JSON text. Checked when the object is built.
    pub fn default_json(mut self, text: impl Into<String>) -> Self {
        self.default = Some(text.into());
        self
    }

    pub fn default_value(self, value: &Value) -> Self {
        self.default_json(value.to_string())
    }

    /// Example value as JSON text. Checked when the object is built.
    pub fn example_json(mut self, text: impl Into<String>) -> Self {
        self.examples.push(text.into());
        self
    }

    pub fn example_value(self, value: &Value) -> Self {
        self.example_json(value.to_string())
    }

    /// Bind to a host record field with a different name than the property.
    pub fn field(mut self, host_field: impl Into<String>) -> Self {
        self.field = Some(host_field.into());
        self
    }

    pub fn ty(&self) -> &TypeNode {
        &self.ty
    }

    pub fn display_value(&self) -> &DisplayValue {
        &self.display
    }

    pub fn default_text(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Host field this property reads and writes when named `name`.
    pub fn field_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.field.as_deref().unwrap_or(name)
    }

    /// Parse the default and examples; decode them too when `cx` is given.
    pub(crate) fn check_samples(
        &self,
        path: &FieldPath,
        cx: Option<&Cursor<'_>>,
    ) -> Result<(), BuildError> {
        for text in self.default.iter().chain(&self.examples) {
            let raw: Value = serde_json::from_str(text).map_err(|e| {
                BuildError::invalid(path.clone(), format!("'{text}' is not valid JSON: {e}"))
            })?;
            if let Some(cx) = cx {
                self.ty.decode_in(&raw, cx).map_err(|e| {
                    BuildError::invalid(
                        path.clone(),
                        format!("'{text}' does not match the property type: {e}"),
                    )
                })?;
            }
        }
        Ok(())
    }

    /// Apply the conflict rule (present) or the requiredness rules (absent).
    fn check_presence(
        &self,
        is_present: bool,
        present: &dyn Fn(&str) -> bool,
        cx: &Cursor<'_>,
    ) -> Result<(), ConstraintError> {
        if is_present {
            if let Some(other) = self.conflicts.iter().find(|name| present(name.as_str())) {
                return Err(cx.fail(format!(
                    "Field conflicts with '{other}', set one of the two, not both"
                )));
            }
            return Ok(());
        }
        if self.required {
            return Err(cx.fail("This field is required"));
        }
        if let Some(other) = self.required_if.iter().find(|name| present(name.as_str())) {
            return Err(cx.fail(format!(
                "This field is required because '{other}' is set"
            )));
        }
        let any_alternative = self.required_if_not.iter().any(|n| present(n.as_str()));
        if !self.required_if_not.is_empty() && !any_alternative {
            return Err(match self.required_if_not.as_slice() {
                [only] => cx.fail(format!(
                    "This field is required because '{only}' is not set"
                )),
                names => cx.fail(format!(
                    "This field is required because none of {} are set",
                    quoted_list(names)
                )),
            });
        }
        Ok(())
    }
}

/// A record definition: an ordered mapping of property names to
/// descriptors.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectType {
    id: Identifier,
    properties: IndexMap<String, PropertyType>,
}

impl ObjectType {
    /// Build and check an object definition.
    ///
    /// Defaults and examples are decoded here unless the property's type
    /// contains a reference, in which case the enclosing scope checks them
    /// once it is linked.
    pub fn new<N: Into<String>>(
        id: &str,
        properties: impl IntoIterator<Item = (N, PropertyType)>,
    ) -> Result<Self, BuildError> {
        let id = Identifier::new(id)?;
        let mut table = IndexMap::new();
        for (name, property) in properties {
            let name = name.into();
            if name.is_empty() {
                return Err(BuildError::bad_argument(format!(
                    "object '{id}' has a property with an empty name"
                )));
            }
            if table.contains_key(&name) {
                return Err(BuildError::bad_argument(format!(
                    "duplicate property '{name}' on object '{id}'"
                )));
            }
            table.insert(name, property);
        }
        let object = Self {
            id,
            properties: table,
        };
        object.check()?;
        Ok(object)
    }

    fn check(&self) -> Result<(), BuildError> {
        let base = FieldPath::root().child(self.id.as_str());
        let mut host_fields = HashSet::new();
        for (name, property) in &self.properties {
            let path = base.child(name.as_str());
            if property.required
                && !(property.required_if.is_empty() && property.required_if_not.is_empty())
            {
                return Err(BuildError::invalid(
                    path,
                    "a required property cannot also be conditionally required",
                ));
            }
            let rules = [
                ("required_if", &property.required_if),
                ("required_if_not", &property.required_if_not),
                ("conflicts", &property.conflicts),
            ];
            for (rule, siblings) in rules {
                for sibling in siblings {
                    if sibling == name {
                        return Err(BuildError::invalid(
                            path,
                            format!("{rule} refers to the property itself"),
                        ));
                    }
                    if !self.properties.contains_key(sibling) {
                        return Err(BuildError::invalid(
                            path,
                            format!("{rule} refers to undeclared property '{sibling}'"),
                        ));
                    }
                }
            }
            let field = property.field_name(name);
            if !host_fields.insert(field) {
                return Err(BuildError::invalid(
                    path,
                    format!("host field '{field}' is bound to more than one property"),
                ));
            }
            property.ty.check(&path)?;
            let root = Cursor::root();
            let cx = (!property.ty.has_refs()).then_some(&root);
            property.check_samples(&path, cx)?;
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn properties(&self) -> &IndexMap<String, PropertyType> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyType> {
        self.properties.get(name)
    }

    /// The record behind `value`, if it is an instance of this object.
    fn record_of<'v>(
        &self,
        value: &'v TypedValue,
        cx: &Cursor<'_>,
    ) -> Result<&'v Record, ConstraintError> {
        let record = match value {
            TypedValue::Object(record) if record.type_id() == self.id.as_str() => record,
            other => {
                return Err(cx.fail(format!(
                    "Must be an instance of {}, {} given",
                    self.id,
                    other.kind()
                )))
            }
        };
        for (field, _) in record.fields() {
            let declared = self
                .properties
                .iter()
                .any(|(name, property)| property.field_name(name) == field);
            if !declared {
                return Err(cx.fail(format!(
                    "Field '{field}' is not declared on {}",
                    self.id
                )));
            }
        }
        Ok(record)
    }

    /// Second pass over all properties once presence is known.
    fn check_presence(
        &self,
        present: &HashSet<&str>,
        cx: &Cursor<'_>,
    ) -> Result<(), ConstraintError> {
        let is_present = |name: &str| present.contains(name);
        for (name, property) in &self.properties {
            property.check_presence(
                present.contains(name.as_str()),
                &is_present,
                &cx.child(name.as_str()),
            )?;
        }
        Ok(())
    }
}

impl Node for ObjectType {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        let map = raw
            .as_object()
            .ok_or_else(|| cx.fail(format!("Must be a map, {} given", wire_kind(raw))))?;
        if let Some(unknown) = map.keys().find(|key| !self.properties.contains_key(*key)) {
            return Err(cx.fail(format!(
                "Invalid parameter '{unknown}', expected one of: {}",
                quoted_list(self.properties.keys())
            )));
        }

        let present = |name: &str| map.get(name).is_some_and(|v| !v.is_null());
        let mut record = Record::new(self.id.as_str());
        for (name, property) in &self.properties {
            let field_cx = cx.child(name.as_str());
            match map.get(name).filter(|v| !v.is_null()) {
                Some(raw_value) => {
                    let value = property.ty.decode_in(raw_value, &field_cx)?;
                    record.set(property.field_name(name), value);
                    property.check_presence(true, &present, &field_cx)?;
                }
                None => property.check_presence(false, &present, &field_cx)?,
            }
        }
        Ok(TypedValue::Object(record))
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        let record = self.record_of(value, cx)?;
        let mut present = HashSet::new();
        for (name, property) in &self.properties {
            if let Some(field_value) = record.get(property.field_name(name)) {
                property
                    .ty
                    .validate_in(field_value, &cx.child(name.as_str()))?;
                present.insert(name.as_str());
            }
        }
        self.check_presence(&present, cx)
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        let record = self.record_of(value, cx)?;
        let mut present = HashSet::new();
        let mut out = Map::new();
        for (name, property) in &self.properties {
            if let Some(field_value) = record.get(property.field_name(name)) {
                let encoded = property
                    .ty
                    .encode_in(field_value, &cx.child(name.as_str()))?;
                out.insert(name.clone(), encoded);
                present.insert(name.as_str());
            }
        }
        self.check_presence(&present, cx)?;
        Ok(Value::Object(out))
    }
}

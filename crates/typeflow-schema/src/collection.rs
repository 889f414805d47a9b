//! # Collection Nodes
//!
//! Lists and maps. Both bound their element count; elements are decoded,
//! validated and encoded by the nested item/key/value nodes with the path
//! extended by the list index, or by the map key followed by a `"key"` or
//! `"value"` marker segment.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use typeflow_core::{BuildError, ConstraintError, FieldPath, MapKey, TypedValue};

use crate::node::{check_bounds, wire_kind, Cursor, Node, TypeNode};

fn check_count(
    len: usize,
    min: Option<usize>,
    max: Option<usize>,
    what: &str,
    cx: &Cursor<'_>,
) -> Result<(), ConstraintError> {
    if let Some(min) = min {
        if len < min {
            return Err(cx.fail(format!(
                "Must have at least {min} {what}, {len} given"
            )));
        }
    }
    if let Some(max) = max {
        if len > max {
            return Err(cx.fail(format!("Must have at most {max} {what}, {len} given")));
        }
    }
    Ok(())
}

/// A sequence of items of one node type.
#[derive(Debug, Clone, Serialize)]
pub struct ListType {
    items: Box<TypeNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<usize>,
}

impl ListType {
    pub fn new(items: impl Into<TypeNode>) -> Self {
        Self {
            items: Box::new(items.into()),
            min: None,
            max: None,
        }
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn items(&self) -> &TypeNode {
        &self.items
    }

    pub(crate) fn check(&self, path: &FieldPath) -> Result<(), BuildError> {
        check_bounds(self.min, self.max, "list", path)?;
        self.items.check(&path.child("items"))
    }

    fn items_of<'v>(
        &self,
        value: &'v TypedValue,
        cx: &Cursor<'_>,
    ) -> Result<&'v [TypedValue], ConstraintError> {
        match value {
            TypedValue::List(items) => {
                check_count(items.len(), self.min, self.max, "items", cx)?;
                Ok(items)
            }
            other => Err(cx.fail(format!("Must be a list, {} given", other.kind()))),
        }
    }
}

impl Node for ListType {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        let raw_items = raw
            .as_array()
            .ok_or_else(|| cx.fail(format!("Must be a list, {} given", wire_kind(raw))))?;
        let items = raw_items
            .iter()
            .enumerate()
            .map(|(i, item)| self.items.decode_in(item, &cx.child(i.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        check_count(items.len(), self.min, self.max, "items", cx)?;
        Ok(TypedValue::List(items))
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        for (i, item) in self.items_of(value, cx)?.iter().enumerate() {
            self.items.validate_in(item, &cx.child(i.to_string()))?;
        }
        Ok(())
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        self.items_of(value, cx)?
            .iter()
            .enumerate()
            .map(|(i, item)| self.items.encode_in(item, &cx.child(i.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

/// A mapping from string-like or integer-like keys to values.
#[derive(Debug, Clone, Serialize)]
pub struct MapType {
    keys: Box<TypeNode>,
    values: Box<TypeNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<usize>,
}

impl MapType {
    pub fn new(keys: impl Into<TypeNode>, values: impl Into<TypeNode>) -> Self {
        Self {
            keys: Box::new(keys.into()),
            values: Box::new(values.into()),
            min: None,
            max: None,
        }
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn keys(&self) -> &TypeNode {
        &self.keys
    }

    pub fn values(&self) -> &TypeNode {
        &self.values
    }

    pub(crate) fn check(&self, path: &FieldPath) -> Result<(), BuildError> {
        if !matches!(
            *self.keys,
            TypeNode::String(_) | TypeNode::Int(_) | TypeNode::StringEnum(_) | TypeNode::IntEnum(_)
        ) {
            return Err(BuildError::invalid(
                path.child("keys"),
                format!(
                    "map keys must be string, integer or an enum of those, {} given",
                    self.keys.type_id()
                ),
            ));
        }
        check_bounds(self.min, self.max, "map", path)?;
        self.keys.check(&path.child("keys"))?;
        self.values.check(&path.child("values"))
    }

    fn entries_of<'v>(
        &self,
        value: &'v TypedValue,
        cx: &Cursor<'_>,
    ) -> Result<&'v IndexMap<MapKey, TypedValue>, ConstraintError> {
        match value {
            TypedValue::Map(entries) => {
                check_count(entries.len(), self.min, self.max, "entries", cx)?;
                Ok(entries)
            }
            other => Err(cx.fail(format!("Must be a map, {} given", other.kind()))),
        }
    }
}

impl Node for MapType {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        let raw_entries = raw
            .as_object()
            .ok_or_else(|| cx.fail(format!("Must be a map, {} given", wire_kind(raw))))?;

        let mut entries = IndexMap::with_capacity(raw_entries.len());
        for (raw_key, raw_value) in raw_entries {
            let entry_cx = cx.child(raw_key.as_str());
            let key_cx = entry_cx.child("key");
            let decoded = self
                .keys
                .decode_in(&Value::String(raw_key.clone()), &key_cx)?;
            let key = MapKey::from_typed(decoded).ok_or_else(|| {
                key_cx.fail("Map keys must decode to a string or an integer")
            })?;
            if entries.contains_key(&key) {
                return Err(key_cx.fail(format!("Key '{key}' already exists in the map")));
            }
            let value = self.values.decode_in(raw_value, &entry_cx.child("value"))?;
            entries.insert(key, value);
        }
        check_count(entries.len(), self.min, self.max, "entries", cx)?;
        Ok(TypedValue::Map(entries))
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        for (key, item) in self.entries_of(value, cx)? {
            let entry_cx = cx.child(key.to_string());
            self.keys.validate_in(&key.to_typed(), &entry_cx.child("key"))?;
            self.values.validate_in(item, &entry_cx.child("value"))?;
        }
        Ok(())
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        let entries = self.entries_of(value, cx)?;
        let mut out = Map::new();
        for (key, item) in entries {
            let entry_cx = cx.child(key.to_string());
            let key_cx = entry_cx.child("key");
            let wire_key = match self.keys.encode_in(&key.to_typed(), &key_cx)? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(key_cx.fail(format!(
                        "Map keys must encode to a string or an integer, {} given",
                        wire_kind(&other)
                    )))
                }
            };
            if out.contains_key(&wire_key) {
                return Err(key_cx.fail(format!("Key '{wire_key}' already exists in the map")));
            }
            let encoded = self.values.encode_in(item, &entry_cx.child("value"))?;
            out.insert(wire_key, encoded);
        }
        Ok(Value::Object(out))
    }
}

//! String and integer enumerations. Members are plain strings or integers
//! in typed data, each with optional display metadata.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use typeflow_core::{BuildError, ConstraintError, DisplayValue, FieldPath, TypedValue, Units};

use crate::node::{quoted_list, wire_kind, Cursor, Node};

/// A closed set of strings.
#[derive(Debug, Clone, Serialize)]
pub struct StringEnumType {
    values: IndexMap<String, DisplayValue>,
}

impl StringEnumType {
    pub fn new<K: Into<String>>(values: impl IntoIterator<Item = (K, DisplayValue)>) -> Self {
        Self {
            values: values.into_iter().map(|(k, d)| (k.into(), d)).collect(),
        }
    }

    /// Members without display metadata.
    pub fn of<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(values.into_iter().map(|v| (v, DisplayValue::default())))
    }

    pub fn values(&self) -> &IndexMap<String, DisplayValue> {
        &self.values
    }

    pub(crate) fn check(&self, path: &FieldPath) -> Result<(), BuildError> {
        if self.values.is_empty() {
            return Err(BuildError::invalid(path.clone(), "enum has no members"));
        }
        Ok(())
    }

    fn check_member<'v>(&self, s: &'v str, cx: &Cursor<'_>) -> Result<&'v str, ConstraintError> {
        if self.values.contains_key(s) {
            Ok(s)
        } else {
            Err(cx.fail(format!(
                "'{s}' is not a valid value, expected one of: {}",
                quoted_list(self.values.keys())
            )))
        }
    }
}

impl Node for StringEnumType {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        match raw {
            Value::String(s) => self.check_member(s, cx).map(TypedValue::from),
            other => Err(cx.fail(format!("Must be a string, {} given", wire_kind(other)))),
        }
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        match value {
            TypedValue::String(s) => self.check_member(s, cx).map(|_| ()),
            other => Err(cx.fail(format!("Must be a string, {} given", other.kind()))),
        }
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        match value {
            TypedValue::String(s) => self.check_member(s, cx).map(Value::from),
            other => Err(cx.fail(format!("Must be a string, {} given", other.kind()))),
        }
    }
}

/// A closed set of integers, optionally carrying units for display.
#[derive(Debug, Clone, Serialize)]
pub struct IntEnumType {
    values: IndexMap<i64, DisplayValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    units: Option<Units>,
}

impl IntEnumType {
    pub fn new(values: impl IntoIterator<Item = (i64, DisplayValue)>) -> Self {
        Self {
            values: values.into_iter().collect(),
            units: None,
        }
    }

    pub fn of(values: impl IntoIterator<Item = i64>) -> Self {
        Self::new(values.into_iter().map(|v| (v, DisplayValue::default())))
    }

    pub fn units(mut self, units: Units) -> Self {
        self.units = Some(units);
        self
    }

    pub fn values(&self) -> &IndexMap<i64, DisplayValue> {
        &self.values
    }

    pub(crate) fn check(&self, path: &FieldPath) -> Result<(), BuildError> {
        if self.values.is_empty() {
            return Err(BuildError::invalid(path.clone(), "enum has no members"));
        }
        Ok(())
    }

    fn check_member(&self, i: i64, cx: &Cursor<'_>) -> Result<i64, ConstraintError> {
        if self.values.contains_key(&i) {
            Ok(i)
        } else {
            Err(cx.fail(format!(
                "{i} is not a valid value, expected one of: {}",
                quoted_list(self.values.keys())
            )))
        }
    }
}

impl Node for IntEnumType {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        let i = match raw {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| cx.fail(format!("Must be an integer, {n} given")))?,
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| cx.fail(format!("Must be an integer, '{s}' given")))?,
            other => {
                return Err(cx.fail(format!("Must be an integer, {} given", wire_kind(other))))
            }
        };
        self.check_member(i, cx).map(TypedValue::Int)
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        match value {
            TypedValue::Int(i) => self.check_member(*i, cx).map(|_| ()),
            other => Err(cx.fail(format!("Must be an integer, {} given", other.kind()))),
        }
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        match value {
            TypedValue::Int(i) => self.check_member(*i, cx).map(Value::from),
            other => Err(cx.fail(format!("Must be an integer, {} given", other.kind()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_enum_lists_accepted_values() {
        let node = StringEnumType::of(["apple", "banana"]);
        assert_eq!(node.decode(&json!("apple")), Ok(TypedValue::from("apple")));
        let err = node.decode(&json!("cherry")).unwrap_err();
        assert_eq!(
            err.msg,
            "'cherry' is not a valid value, expected one of: 'apple', 'banana'"
        );
        assert!(node.decode(&json!(1)).is_err());
        assert_eq!(node.encode(&TypedValue::from("banana")), Ok(json!("banana")));
    }

    #[test]
    fn int_enum_accepts_numeric_strings() {
        let node = IntEnumType::of([1, 2, 3]);
        assert_eq!(node.decode(&json!(2)), Ok(TypedValue::Int(2)));
        assert_eq!(node.decode(&json!("3")), Ok(TypedValue::Int(3)));
        let err = node.decode(&json!(4)).unwrap_err();
        assert_eq!(err.msg, "4 is not a valid value, expected one of: '1', '2', '3'");
        assert!(node.validate(&TypedValue::from("1")).is_err());
    }

    #[test]
    fn empty_enum_fails_the_build() {
        let none: [&str; 0] = [];
        assert!(StringEnumType::of(none).check(&FieldPath::root()).is_err());
        assert!(IntEnumType::of([]).check(&FieldPath::root()).is_err());
    }

    #[test]
    fn display_metadata_serialises() {
        let node = StringEnumType::new([("a", DisplayValue::named("Letter A"))]);
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"values": {"a": {"name": "Letter A"}}})
        );
    }
}

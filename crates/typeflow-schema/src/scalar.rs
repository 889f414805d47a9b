//! # Scalar Nodes
//!
//! Bool, string, pattern, integer and float nodes. Decode coerces the
//! loosely-typed wire forms each kind accepts, then runs the same checks
//! as validate.

use serde::Serialize;
use serde_json::{Number, Value};
use typeflow_core::{BuildError, ConstraintError, FieldPath, Pattern, TypedValue, Units};

use crate::node::{check_bounds, wire_kind, Cursor, Node};

const TRUE_WORDS: [&str; 6] = ["yes", "on", "true", "enable", "enabled", "1"];
const FALSE_WORDS: [&str; 6] = ["no", "off", "false", "disable", "disabled", "0"];

/// A boolean.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BoolType {}

impl BoolType {
    pub fn new() -> Self {
        Self {}
    }
}

impl Node for BoolType {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        match raw {
            Value::Bool(b) => Ok(TypedValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(TypedValue::Bool(false)),
                Some(1) => Ok(TypedValue::Bool(true)),
                _ => Err(cx.fail(format!(
                    "Boolean value expected, number found ({n}), only 0 and 1 are accepted"
                ))),
            },
            Value::String(s) => {
                let word = s.to_lowercase();
                if TRUE_WORDS.contains(&word.as_str()) {
                    Ok(TypedValue::Bool(true))
                } else if FALSE_WORDS.contains(&word.as_str()) {
                    Ok(TypedValue::Bool(false))
                } else {
                    Err(cx.fail(format!(
                        "Boolean value expected, string found ({s}), accepted: {}, {}",
                        TRUE_WORDS.join("/"),
                        FALSE_WORDS.join("/")
                    )))
                }
            }
            other => Err(cx.fail(format!(
                "Boolean value expected, {} found",
                wire_kind(other)
            ))),
        }
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        match value {
            TypedValue::Bool(_) => Ok(()),
            other => Err(cx.fail(format!("Boolean value expected, {} found", other.kind()))),
        }
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        match value {
            TypedValue::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(cx.fail(format!("Boolean value expected, {} found", other.kind()))),
        }
    }
}

/// A string with optional length bounds (in characters) and pattern.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StringType {
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pattern: Option<Pattern>,
}

impl StringType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub(crate) fn check(&self, path: &FieldPath) -> Result<(), BuildError> {
        check_bounds(self.min, self.max, "string length", path)
    }

    fn check_value<'v>(
        &self,
        value: &'v TypedValue,
        cx: &Cursor<'_>,
    ) -> Result<&'v str, ConstraintError> {
        let s = match value {
            TypedValue::String(s) => s,
            other => return Err(cx.fail(format!("Must be a string, {} given", other.kind()))),
        };
        let len = s.chars().count();
        if let Some(min) = self.min {
            if len < min {
                return Err(cx.fail(format!(
                    "String must be at least {min} characters, {len} given"
                )));
            }
        }
        if let Some(max) = self.max {
            if len > max {
                return Err(cx.fail(format!(
                    "String must be at most {max} characters, {len} given"
                )));
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.matches_prefix(s) {
                return Err(cx.fail(format!("String must match the pattern {pattern}")));
            }
        }
        Ok(s)
    }
}

impl Node for StringType {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        let value = match raw {
            Value::String(s) => TypedValue::String(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => TypedValue::String(n.to_string()),
            other => {
                return Err(cx.fail(format!("Must be a string, {} given", wire_kind(other))))
            }
        };
        self.check_value(&value, cx)?;
        Ok(value)
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        self.check_value(value, cx).map(|_| ())
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        self.check_value(value, cx)
            .map(|s| Value::String(s.to_string()))
    }
}

/// A regular expression, written on the wire as its source text.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatternType {}

impl PatternType {
    pub fn new() -> Self {
        Self {}
    }
}

impl Node for PatternType {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        match raw {
            Value::String(s) => Pattern::new(s)
                .map(TypedValue::Pattern)
                .map_err(|e| cx.fail(format!("Invalid regular expression ({e})"))),
            other => Err(cx.fail(format!("Must be a string, {} given", wire_kind(other)))),
        }
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        match value {
            TypedValue::Pattern(_) => Ok(()),
            other => Err(cx.fail(format!(
                "Must be a regular expression, {} given",
                other.kind()
            ))),
        }
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        match value {
            TypedValue::Pattern(p) => Ok(Value::String(p.as_str().to_string())),
            other => Err(cx.fail(format!(
                "Must be a regular expression, {} given",
                other.kind()
            ))),
        }
    }
}

/// A signed 64-bit integer with optional inclusive bounds and units.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntType {
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    units: Option<Units>,
}

impl IntType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn units(mut self, units: Units) -> Self {
        self.units = Some(units);
        self
    }

    pub(crate) fn check(&self, path: &FieldPath) -> Result<(), BuildError> {
        check_bounds(self.min, self.max, "integer", path)
    }

    fn parse(&self, s: &str, cx: &Cursor<'_>) -> Result<i64, ConstraintError> {
        if let Ok(i) = s.trim().parse::<i64>() {
            return Ok(i);
        }
        match &self.units {
            Some(units) => units
                .parse_int(s)
                .map_err(|e| cx.fail(format!("Must be an integer, {e}"))),
            None => Err(cx.fail(format!("Must be an integer, '{s}' given"))),
        }
    }

    fn check_value(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<i64, ConstraintError> {
        let i = match value {
            TypedValue::Int(i) => *i,
            other => return Err(cx.fail(format!("Must be an integer, {} given", other.kind()))),
        };
        if let Some(min) = self.min {
            if i < min {
                return Err(cx.fail(format!("Must be at least {min}, {i} given")));
            }
        }
        if let Some(max) = self.max {
            if i > max {
                return Err(cx.fail(format!("Must be at most {max}, {i} given")));
            }
        }
        Ok(i)
    }
}

impl Node for IntType {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        let i = match raw {
            Value::Number(n) => match n.as_i64() {
                Some(i) => i,
                None if n.is_u64() => {
                    return Err(cx.fail(format!("Integer {n} is out of the 64-bit range")))
                }
                None => return Err(cx.fail(format!("Must be an integer, float given ({n})"))),
            },
            Value::String(s) => self.parse(s, cx)?,
            other => {
                return Err(cx.fail(format!("Must be an integer, {} given", wire_kind(other))))
            }
        };
        let value = TypedValue::Int(i);
        self.check_value(&value, cx)?;
        Ok(value)
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        self.check_value(value, cx).map(|_| ())
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        self.check_value(value, cx).map(Value::from)
    }
}

/// A 64-bit float with optional inclusive bounds and units.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FloatType {
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    units: Option<Units>,
}

impl FloatType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn units(mut self, units: Units) -> Self {
        self.units = Some(units);
        self
    }

    pub(crate) fn check(&self, path: &FieldPath) -> Result<(), BuildError> {
        for bound in [self.min, self.max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(BuildError::invalid(
                    path.clone(),
                    format!("float bound {bound} is not finite"),
                ));
            }
        }
        check_bounds(self.min, self.max, "float", path)
    }

    fn parse(&self, s: &str, cx: &Cursor<'_>) -> Result<f64, ConstraintError> {
        if let Ok(f) = s.trim().parse::<f64>() {
            return Ok(f);
        }
        match &self.units {
            Some(units) => units
                .parse_float(s)
                .map_err(|e| cx.fail(format!("Must be a float, {e}"))),
            None => Err(cx.fail(format!("Must be a float, '{s}' given"))),
        }
    }

    fn check_value(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<f64, ConstraintError> {
        let f = match value {
            TypedValue::Float(f) => *f,
            other => return Err(cx.fail(format!("Must be a float, {} given", other.kind()))),
        };
        // NaN would slip past both bound comparisons.
        if !f.is_finite() {
            return Err(cx.fail(format!("Must be a finite number, {f} given")));
        }
        if let Some(min) = self.min {
            if f < min {
                return Err(cx.fail(format!("Must be at least {min}, {f} given")));
            }
        }
        if let Some(max) = self.max {
            if f > max {
                return Err(cx.fail(format!("Must be at most {max}, {f} given")));
            }
        }
        Ok(f)
    }
}

impl Node for FloatType {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        let f = match raw {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| cx.fail(format!("Must be a float, {n} given")))?,
            Value::String(s) => self.parse(s, cx)?,
            other => return Err(cx.fail(format!("Must be a float, {} given", wire_kind(other)))),
        };
        let value = TypedValue::Float(f);
        self.check_value(&value, cx)?;
        Ok(value)
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        self.check_value(value, cx).map(|_| ())
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        let f = self.check_value(value, cx)?;
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| cx.fail(format!("Float {f} cannot be represented on the wire")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bool_accepts_words_and_digits() {
        let node = BoolType::new();
        for raw in [json!(true), json!(1), json!("YES"), json!("on"), json!("Enabled")] {
            assert_eq!(node.decode(&raw), Ok(TypedValue::Bool(true)), "{raw}");
        }
        for raw in [json!(false), json!(0), json!("no"), json!("OFF"), json!("disable")] {
            assert_eq!(node.decode(&raw), Ok(TypedValue::Bool(false)), "{raw}");
        }
    }

    #[test]
    fn bool_rejects_everything_else() {
        let node = BoolType::new();
        for raw in [json!("maybe"), json!(2), json!(0.5), json!(null), json!([])] {
            assert!(node.decode(&raw).is_err(), "{raw}");
        }
        assert!(node.validate(&TypedValue::Int(1)).is_err());
        assert!(node.validate(&TypedValue::from("yes")).is_err());
    }

    #[test]
    fn string_stringifies_integers() {
        let node = StringType::new();
        assert_eq!(node.decode(&json!(42)), Ok(TypedValue::from("42")));
        assert!(node.decode(&json!(4.2)).is_err());
        assert!(node.decode(&json!(true)).is_err());
    }

    #[test]
    fn string_length_counts_characters() {
        let node = StringType::new().min(2).max(3);
        assert!(node.decode(&json!("ab")).is_ok());
        assert!(node.decode(&json!("äöü")).is_ok());
        let err = node.decode(&json!("a")).unwrap_err();
        assert_eq!(err.msg, "String must be at least 2 characters, 1 given");
        let err = node.validate(&TypedValue::from("abcd")).unwrap_err();
        assert_eq!(err.msg, "String must be at most 3 characters, 4 given");
    }

    #[test]
    fn string_pattern_matches_from_the_start() {
        let node = StringType::new().pattern(Pattern::new("[a-z]+").unwrap());
        assert!(node.validate(&TypedValue::from("abc1")).is_ok());
        assert!(node.validate(&TypedValue::from("1abc")).is_err());
    }

    #[test]
    fn pattern_decode_compiles() {
        let node = PatternType::new();
        let value = node.decode(&json!("^a+$")).unwrap();
        assert_eq!(node.encode(&value), Ok(json!("^a+$")));
        let err = node.decode(&json!("(")).unwrap_err();
        assert!(err.msg.starts_with("Invalid regular expression"));
    }

    #[test]
    fn int_decode_coercions() {
        let node = IntType::new();
        assert_eq!(node.decode(&json!(5)), Ok(TypedValue::Int(5)));
        assert_eq!(node.decode(&json!("-12")), Ok(TypedValue::Int(-12)));
        assert!(node.decode(&json!(1.5)).is_err());
        assert!(node.decode(&json!(u64::MAX)).is_err());
        assert!(node.decode(&json!("five")).is_err());
    }

    #[test]
    fn int_bounds_are_inclusive() {
        let node = IntType::new().min(1).max(3);
        assert!(node.validate(&TypedValue::Int(1)).is_ok());
        assert!(node.validate(&TypedValue::Int(3)).is_ok());
        assert_eq!(
            node.validate(&TypedValue::Int(0)).unwrap_err().msg,
            "Must be at least 1, 0 given"
        );
        assert!(node.encode(&TypedValue::Int(4)).is_err());
    }

    #[test]
    fn int_with_units_parses_compact_strings() {
        let node = IntType::new().units(Units::time());
        assert_eq!(node.decode(&json!("1s")), Ok(TypedValue::Int(1_000_000_000)));
        assert_eq!(node.decode(&json!("15")), Ok(TypedValue::Int(15)));
        assert!(node.decode(&json!("1 fortnight")).is_err());
        assert_eq!(node.encode(&TypedValue::Int(7)), Ok(json!(7)));
    }

    #[test]
    fn float_accepts_integers_and_units() {
        let node = FloatType::new().units(Units::byte());
        assert_eq!(node.decode(&json!(2)), Ok(TypedValue::Float(2.0)));
        assert_eq!(node.decode(&json!("0.5")), Ok(TypedValue::Float(0.5)));
        assert_eq!(node.decode(&json!("1.5kB")), Ok(TypedValue::Float(1536.0)));
        assert!(node.validate(&TypedValue::Int(2)).is_err());
    }

    #[test]
    fn float_encode_rejects_non_finite() {
        let node = FloatType::new();
        assert!(node.encode(&TypedValue::Float(f64::NAN)).is_err());
        assert_eq!(node.encode(&TypedValue::Float(0.25)), Ok(json!(0.25)));
    }

    #[test]
    fn float_decode_rejects_non_finite_text() {
        let bounded = FloatType::new().min(0.0).max(1.0);
        let err = bounded.decode(&json!("NaN")).unwrap_err();
        assert_eq!(err.msg, "Must be a finite number, NaN given");
        assert!(bounded.validate(&TypedValue::Float(f64::NAN)).is_err());

        let open = FloatType::new();
        for text in ["inf", "-infinity", "1e999"] {
            assert!(open.decode(&json!(text)).is_err(), "{text}");
        }
        assert!(open.validate(&TypedValue::Float(f64::INFINITY)).is_err());

        let sized = FloatType::new().units(Units::byte());
        let huge = format!("{}PB", "9".repeat(400));
        let err = sized.decode(&json!(huge)).unwrap_err();
        assert!(err.msg.ends_with("is out of range"), "{}", err.msg);
        let two_pb = 2.0 * (1u64 << 50) as f64;
        assert_eq!(sized.decode(&json!("2PB")), Ok(TypedValue::Float(two_pb)));
    }

    #[test]
    fn inverted_bounds_fail_the_build() {
        let root = FieldPath::root();
        assert!(IntType::new().min(5).max(1).check(&root).is_err());
        assert!(StringType::new().min(5).max(1).check(&root).is_err());
        assert!(FloatType::new().min(f64::INFINITY).check(&root).is_err());
        assert!(FloatType::new().min(0.0).max(1.0).check(&root).is_ok());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every integer survives encode followed by decode.
        #[test]
        fn int_round_trip(i in any::<i64>()) {
            let node = IntType::new();
            let wire = node.encode(&TypedValue::Int(i)).unwrap();
            prop_assert_eq!(node.decode(&wire), Ok(TypedValue::Int(i)));
        }

        /// Integers decoded through their decimal string form are unchanged.
        #[test]
        fn int_string_coercion(i in any::<i64>()) {
            prop_assert_eq!(IntType::new().decode(&Value::String(i.to_string())), Ok(TypedValue::Int(i)));
        }

        /// Case never changes the meaning of a boolean word.
        #[test]
        fn bool_words_ignore_case(upper in proptest::collection::vec(any::<bool>(), 8)) {
            for (word, expected) in TRUE_WORDS.iter().map(|w| (w, true)).chain(FALSE_WORDS.iter().map(|w| (w, false))) {
                let mixed: String = word
                    .chars()
                    .zip(upper.iter().cycle())
                    .map(|(c, up)| if *up { c.to_ascii_uppercase() } else { c })
                    .collect();
                prop_assert_eq!(BoolType::new().decode(&Value::String(mixed)), Ok(TypedValue::Bool(expected)));
            }
        }
    }
}

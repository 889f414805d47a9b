//! # Units of Measurement
//!
//! A [`Units`] set describes several scales of the same quantity, for
//! example bytes/kilobytes/megabytes. Int and float nodes may carry a unit
//! set, which lets them accept compact unit-qualified strings such as
//! `"5m30s"` or `"1.5GB"` on decode.
//!
//! ## Grammar
//!
//! ```text
//! value   := segment+
//! segment := number unit-name
//! ```
//!
//! `unit-name` matches any of the four names of the base unit or of a
//! multiplier. The result is the sum of `number × multiplier` over all
//! segments. Whitespace between segments is ignored.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A unit-qualified string could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("empty value")]
    Empty,

    #[error("expected a number in '{input}'")]
    ExpectedNumber { input: String },

    #[error("missing unit after '{number}' in '{input}'")]
    MissingUnit { number: String, input: String },

    #[error("invalid number '{number}' in '{input}'")]
    InvalidNumber { number: String, input: String },

    #[error("unknown unit '{unit}' in '{input}'")]
    UnknownUnit { unit: String, input: String },

    /// The sum does not fit the target type.
    #[error("'{input}' is out of range")]
    Overflow { input: String },
}

/// One scale of measurement, such as "second".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub name_short_singular: String,
    pub name_short_plural: String,
    pub name_long_singular: String,
    pub name_long_plural: String,
}

impl Unit {
    pub fn new(
        short_singular: &str,
        short_plural: &str,
        long_singular: &str,
        long_plural: &str,
    ) -> Self {
        Self {
            name_short_singular: short_singular.to_string(),
            name_short_plural: short_plural.to_string(),
            name_long_singular: long_singular.to_string(),
            name_long_plural: long_plural.to_string(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.name_short_singular == name
            || self.name_short_plural == name
            || self.name_long_singular == name
            || self.name_long_plural == name
    }

    fn short(&self, amount: i64) -> &str {
        if amount == 1 {
            &self.name_short_singular
        } else {
            &self.name_short_plural
        }
    }
}

/// Several scales of magnitude of the same unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Units {
    /// The smallest unit of scale.
    pub base_unit: Unit,
    /// Larger scales keyed by how many base units they contain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multipliers: Option<IndexMap<i64, Unit>>,
}

impl Units {
    pub fn new(base_unit: Unit) -> Self {
        Self {
            base_unit,
            multipliers: None,
        }
    }

    pub fn with_multiplier(mut self, factor: i64, unit: Unit) -> Self {
        self.multipliers
            .get_or_insert_with(IndexMap::new)
            .insert(factor, unit);
        self
    }

    /// Bytes with binary multipliers up to petabytes.
    pub fn byte() -> Self {
        Self::new(Unit::new("B", "B", "byte", "bytes"))
            .with_multiplier(1 << 10, Unit::new("kB", "kB", "kilobyte", "kilobytes"))
            .with_multiplier(1 << 20, Unit::new("MB", "MB", "megabyte", "megabytes"))
            .with_multiplier(1 << 30, Unit::new("GB", "GB", "gigabyte", "gigabytes"))
            .with_multiplier(1 << 40, Unit::new("TB", "TB", "terabyte", "terabytes"))
            .with_multiplier(1 << 50, Unit::new("PB", "PB", "petabyte", "petabytes"))
    }

    /// Durations with a nanosecond base.
    pub fn time() -> Self {
        Self::new(Unit::new("ns", "ns", "nanosecond", "nanoseconds"))
            .with_multiplier(1_000, Unit::new("μs", "μs", "microsecond", "microseconds"))
            .with_multiplier(1_000_000, Unit::new("ms", "ms", "millisecond", "milliseconds"))
            .with_multiplier(1_000_000_000, Unit::new("s", "s", "second", "seconds"))
            .with_multiplier(60_000_000_000, Unit::new("m", "m", "minute", "minutes"))
            .with_multiplier(3_600_000_000_000, Unit::new("H", "H", "hour", "hours"))
            .with_multiplier(86_400_000_000_000, Unit::new("d", "d", "day", "days"))
    }

    pub fn character() -> Self {
        Self::new(Unit::new("char", "chars", "character", "characters"))
    }

    pub fn percent() -> Self {
        Self::new(Unit::new("%", "%", "percent", "percent"))
    }

    /// Number of base units in the unit named `name`.
    fn factor_of(&self, name: &str, input: &str) -> Result<i64, UnitsError> {
        if self.base_unit.matches(name) {
            return Ok(1);
        }
        self.multipliers
            .iter()
            .flat_map(|m| m.iter())
            .find(|(_, unit)| unit.matches(name))
            .map(|(factor, _)| *factor)
            .ok_or_else(|| UnitsError::UnknownUnit {
                unit: name.to_string(),
                input: input.to_string(),
            })
    }

    /// Parse a unit-qualified integer such as `"5m30s"`.
    pub fn parse_int(&self, input: &str) -> Result<i64, UnitsError> {
        let mut total: i64 = 0;
        for (number, unit) in segments(input, false)? {
            let amount: i64 = number.parse().map_err(|_| UnitsError::InvalidNumber {
                number: number.to_string(),
                input: input.to_string(),
            })?;
            let factor = self.factor_of(unit, input)?;
            total = amount
                .checked_mul(factor)
                .and_then(|v| total.checked_add(v))
                .ok_or_else(|| UnitsError::Overflow {
                    input: input.to_string(),
                })?;
        }
        Ok(total)
    }

    /// Parse a unit-qualified float such as `"1.5GB"`. The sum must stay
    /// finite.
    pub fn parse_float(&self, input: &str) -> Result<f64, UnitsError> {
        let mut total: f64 = 0.0;
        for (number, unit) in segments(input, true)? {
            let amount: f64 = number.parse().map_err(|_| UnitsError::InvalidNumber {
                number: number.to_string(),
                input: input.to_string(),
            })?;
            let factor = self.factor_of(unit, input)?;
            total += amount * factor as f64;
            if !total.is_finite() {
                return Err(UnitsError::Overflow {
                    input: input.to_string(),
                });
            }
        }
        Ok(total)
    }

    /// Render `value` in the compact form accepted by [`Units::parse_int`],
    /// largest scale first.
    pub fn format(&self, value: i64) -> String {
        let mut scales: Vec<(i64, &Unit)> = self
            .multipliers
            .iter()
            .flat_map(|m| m.iter().map(|(f, u)| (*f, u)))
            .filter(|(factor, _)| *factor > 1)
            .collect();
        scales.sort_by(|a, b| b.0.cmp(&a.0));
        scales.push((1, &self.base_unit));

        if value == 0 {
            return format!("0{}", self.base_unit.short(0));
        }
        let mut out = String::new();
        if value < 0 {
            out.push('-');
        }
        let mut remaining = value.unsigned_abs();
        for (factor, unit) in scales {
            let factor = factor.unsigned_abs();
            let amount = remaining / factor;
            if amount > 0 {
                remaining %= factor;
                out.push_str(&amount.to_string());
                out.push_str(unit.short(i64::try_from(amount).unwrap_or(i64::MAX)));
            }
        }
        out
    }
}

/// Split `input` into `(number, unit)` pairs.
fn segments(input: &str, allow_fraction: bool) -> Result<Vec<(&str, &str)>, UnitsError> {
    let mut out = Vec::new();
    let mut rest = input.trim_start();
    if rest.is_empty() {
        return Err(UnitsError::Empty);
    }
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || (allow_fraction && c == '.')))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(UnitsError::ExpectedNumber {
                input: input.to_string(),
            });
        }
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.' || c.is_whitespace())
            .unwrap_or(tail.len());
        if unit_len == 0 {
            return Err(UnitsError::MissingUnit {
                number: number.to_string(),
                input: input.to_string(),
            });
        }
        let (unit, tail) = tail.split_at(unit_len);
        out.push((number, unit));
        rest = tail.trim_start();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compound_durations() {
        let time = Units::time();
        assert_eq!(time.parse_int("5m30s"), Ok(330_000_000_000));
        assert_eq!(time.parse_int("1H 2m"), Ok(3_720_000_000_000));
        assert_eq!(time.parse_int("250ms"), Ok(250_000_000));
        assert_eq!(time.parse_int("3 seconds").ok(), None);
        assert_eq!(time.parse_int("3seconds"), Ok(3_000_000_000));
    }

    #[test]
    fn parses_bytes_and_fractions() {
        let bytes = Units::byte();
        assert_eq!(bytes.parse_int("2kB"), Ok(2048));
        assert_eq!(bytes.parse_float("1.5kB"), Ok(1536.0));
        assert!(bytes.parse_int("1.5kB").is_err());
    }

    #[test]
    fn rejects_unknown_or_missing_units() {
        let bytes = Units::byte();
        assert_eq!(
            bytes.parse_int("5XB"),
            Err(UnitsError::UnknownUnit { unit: "XB".into(), input: "5XB".into() })
        );
        assert!(matches!(bytes.parse_int("5"), Err(UnitsError::MissingUnit { .. })));
        assert_eq!(bytes.parse_int(""), Err(UnitsError::Empty));
        assert!(matches!(bytes.parse_int("kB"), Err(UnitsError::ExpectedNumber { .. })));
    }

    #[test]
    fn detects_overflow() {
        let bytes = Units::byte();
        assert!(matches!(
            bytes.parse_int("99999999PB"),
            Err(UnitsError::Overflow { .. })
        ));
        let huge = format!("{}PB", "9".repeat(400));
        let err = bytes.parse_float(&huge).unwrap_err();
        assert_eq!(err, UnitsError::Overflow { input: huge.clone() });
        assert_eq!(err.to_string(), format!("'{huge}' is out of range"));
    }

    #[test]
    fn format_round_trips_through_parse() {
        let time = Units::time();
        let rendered = time.format(330_000_000_000);
        assert_eq!(rendered, "5m30s");
        assert_eq!(time.parse_int(&rendered), Ok(330_000_000_000));
        assert_eq!(Units::character().format(1), "1char");
        assert_eq!(Units::character().format(0), "0chars");
        assert_eq!(Units::byte().format(-2048), "-2kB");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Formatting a non-negative value and parsing it back is lossless.
        #[test]
        fn format_then_parse_is_identity(value in 0i64..i64::MAX) {
            for units in [Units::time(), Units::byte(), Units::character()] {
                let rendered = units.format(value);
                prop_assert_eq!(units.parse_int(&rendered), Ok(value), "rendered: {}", rendered);
            }
        }
    }
}

//! # typeflow-core — Foundational Types
//!
//! The leaf crate of the typeflow workspace. It defines everything the
//! type-node system and the step dispatcher share, and depends on no
//! other typeflow crate.
//!
//! ## Contents
//!
//! - [`error`]: [`ConstraintError`] (data errors, always path-qualified)
//!   and [`BuildError`] (schema construction errors).
//! - [`path`]: [`FieldPath`], the ordered segment list that locates a
//!   value inside nested data.
//! - [`identity`]: [`Identifier`], the validated id used for scope
//!   objects, references, steps and outputs.
//! - [`display`] and [`units`]: descriptive metadata carried by nodes.
//! - [`value`]: [`TypedValue`] and [`Record`], the strongly-typed
//!   in-memory representation that decode produces and encode consumes.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Wire data is always `serde_json::Value`; this crate never performs I/O.

pub mod display;
pub mod error;
pub mod identity;
pub mod path;
pub mod units;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use display::DisplayValue;
pub use error::{BuildError, ConstraintError};
pub use identity::{validate_id, Identifier, MAX_ID_LEN};
pub use path::FieldPath;
pub use units::{Unit, Units, UnitsError};
pub use value::{MapKey, Pattern, Record, TypedValue};

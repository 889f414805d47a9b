//! # typeflow-schema — The Type-Node System
//!
//! A closed set of composable type nodes that decode loosely-typed wire
//! data (`serde_json::Value`) into [`TypedValue`]s, validate typed values,
//! and encode them back, with the same constraint semantics in all three
//! directions and a precise [`FieldPath`] on every failure.
//!
//! ## Node Kinds
//!
//! - [`scalar`]: bool, string, pattern, integer, float.
//! - [`enums`]: string and integer enumerations.
//! - [`collection`]: lists and maps.
//! - [`object`]: objects and properties, including conditional
//!   requiredness (`required`, `required_if`, `required_if_not`) and
//!   `conflicts`.
//! - [`scope`]: owning tables of objects plus name-based references,
//!   which is how recursive and mutually recursive types are expressed.
//! - [`oneof`]: unions discriminated by a string or integer tag field.
//!
//! [`TypeNode`] closes over all of them and dispatches by exhaustive
//! match. [`meta`] describes the serialised form of every node with a
//! scope built from these same nodes.
//!
//! ## Build Time vs. Call Time
//!
//! Constructors of objects, unions and scopes return [`BuildError`] for
//! malformed definitions, so a tree that exists is usable. Only
//! [`ConstraintError`] is returned by decode, validate and encode.
//!
//! ## Crate Policy
//!
//! - Depends only on `typeflow-core` internally.
//! - Trees are immutable once built and are `Send + Sync`; any number of
//!   callers may run operations on one tree concurrently.
//! - No I/O. Wire data arrives and leaves as `serde_json::Value`.
//!
//! [`TypedValue`]: typeflow_core::TypedValue
//! [`FieldPath`]: typeflow_core::FieldPath
//! [`BuildError`]: typeflow_core::BuildError
//! [`ConstraintError`]: typeflow_core::ConstraintError

pub mod collection;
pub mod enums;
pub mod meta;
pub mod node;
pub mod object;
pub mod oneof;
pub mod scalar;
pub mod scope;

pub use collection::{ListType, MapType};
pub use enums::{IntEnumType, StringEnumType};
pub use node::{Cursor, Node, TypeNode};
pub use object::{ObjectType, PropertyType};
pub use oneof::{Discriminator, OneOfType, DEFAULT_DISCRIMINATOR};
pub use scalar::{BoolType, FloatType, IntType, PatternType, StringType};
pub use scope::{RefType, ScopeType};

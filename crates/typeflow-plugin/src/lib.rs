//! # typeflow-plugin — Step & Schema Dispatch
//!
//! Binds named operations ("steps") to the type-node system. A step has
//! an input [`ScopeType`], a handler, and named outputs, each with its own
//! scope and a flag marking error results. A [`Schema`] is a table of
//! steps and the surface an outer harness calls.
//!
//! ## Error Classification
//!
//! | Failure | Error | Exit code |
//! |---|---|---|
//! | unknown or unselected step | [`StepError::NoSuchStep`], [`StepError::StepRequired`] | 64 |
//! | input does not decode | [`StepError::InvalidInput`] | 65 |
//! | output does not validate or encode | [`StepError::InvalidOutput`] | 70 |
//! | handler returns an undeclared output id | [`StepError::UndeclaredOutput`] | 70 |
//!
//! ## Crate Policy
//!
//! - Depends on `typeflow-core` and `typeflow-schema` internally.
//! - Handlers are `Fn + Send + Sync`; a schema is shared read-only across
//!   threads without locking.
//! - Reads no files and parses no arguments; that belongs to the harness.
//!
//! [`ScopeType`]: typeflow_schema::ScopeType

pub mod error;
pub mod schema;
pub mod step;

pub use error::StepError;
pub use schema::Schema;
pub use step::{CallOptions, Handler, Step, StepBuilder, StepOutput};

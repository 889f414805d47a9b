//! # Schema Dispatch
//!
//! A [`Schema`] is the external call surface: a table of steps keyed by id.
//! [`Schema::invoke`] runs the full pipeline on wire data:
//!
//! ```text
//! raw input ─decode─▶ typed input ─handler─▶ (output id, typed output) ─encode─▶ raw output
//! ```
//!
//! Decode failures surface as [`StepError::InvalidInput`], encode failures
//! as [`StepError::InvalidOutput`]. No [`ConstraintError`] leaves this
//! module unclassified.
//!
//! [`ConstraintError`]: typeflow_core::ConstraintError

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use typeflow_core::{BuildError, Identifier, TypedValue};
use typeflow_schema::Node;

use crate::error::StepError;
use crate::step::{CallOptions, Step};

/// A name-unique table of steps.
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    steps: IndexMap<Identifier, Step>,
}

impl Schema {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Result<Self, BuildError> {
        let mut table = IndexMap::new();
        for step in steps {
            let id = Identifier::new(step.id())?;
            if table.contains_key(&id) {
                return Err(BuildError::bad_argument(format!("Duplicate step ID {id}")));
            }
            table.insert(id, step);
        }
        if table.is_empty() {
            return Err(BuildError::bad_argument("a schema needs at least one step"));
        }
        Ok(Self { steps: table })
    }

    pub fn steps(&self) -> &IndexMap<Identifier, Step> {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Result<&Step, StepError> {
        self.steps
            .get(id)
            .ok_or_else(|| StepError::NoSuchStep(id.to_string()))
    }

    /// Resolve an optional step selector. Without one, the schema must
    /// have exactly one step.
    pub fn select(&self, id: Option<&str>) -> Result<&Step, StepError> {
        match id {
            Some(id) => self.step(id),
            None => match self.steps.values().collect::<Vec<_>>().as_slice() {
                [only] => Ok(*only),
                _ => Err(StepError::StepRequired {
                    available: self.steps.keys().map(|k| k.to_string()).collect(),
                }),
            },
        }
    }

    /// Decode raw data against the step's input scope.
    pub fn decode_input(&self, step_id: &str, raw: &Value) -> Result<TypedValue, StepError> {
        let step = self.step(step_id)?;
        step.input()
            .decode(raw)
            .map_err(|source| StepError::InvalidInput {
                step: step_id.to_string(),
                source,
            })
    }

    /// Call a step with typed input, validating input and output.
    pub fn call_step(
        &self,
        step_id: &str,
        input: TypedValue,
    ) -> Result<(String, TypedValue), StepError> {
        self.step(step_id)?.call(input, CallOptions::validated())
    }

    /// Encode a typed output against the scope of `output_id`.
    pub fn encode_output(
        &self,
        step_id: &str,
        output_id: &str,
        value: &TypedValue,
    ) -> Result<Value, StepError> {
        let output = self.step(step_id)?.output(output_id)?;
        output.schema().encode(value).map_err(|source| {
            tracing::error!(
                step = %step_id,
                output = %output_id,
                error = %source,
                "step produced output that cannot be encoded"
            );
            StepError::InvalidOutput {
                step: step_id.to_string(),
                output: output_id.to_string(),
                source,
            }
        })
    }

    /// Decode, call and encode in one pass over wire data.
    ///
    /// Decode already validates the input and encode validates the output,
    /// so the step itself runs with both checks skipped.
    pub fn invoke(&self, step_id: &str, raw: &Value) -> Result<(String, Value), StepError> {
        tracing::debug!(step = %step_id, "decoding input");
        let input = self.decode_input(step_id, raw)?;
        tracing::debug!(step = %step_id, "calling step");
        let (output_id, value) = self.step(step_id)?.call(input, CallOptions::unchecked())?;
        tracing::debug!(step = %step_id, output = %output_id, "encoding output");
        let wire = self.encode_output(step_id, &output_id, &value)?;
        Ok((output_id, wire))
    }

    /// Decode and call, returning the validated typed output.
    pub fn invoke_typed(
        &self,
        step_id: &str,
        raw: &Value,
    ) -> Result<(String, TypedValue), StepError> {
        tracing::debug!(step = %step_id, "decoding input");
        let input = self.decode_input(step_id, raw)?;
        tracing::debug!(step = %step_id, "calling step");
        self.step(step_id)?.call(
            input,
            CallOptions {
                skip_input_validation: true,
                skip_output_validation: false,
            },
        )
    }
}

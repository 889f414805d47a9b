//! # Steps
//!
//! A [`Step`] binds an input scope, a handler and a set of named outputs,
//! each with its own scope. The handler is a plain function from the typed
//! input to an `(output id, typed output)` pair; it is shared read-only and
//! may run on any number of threads at once.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use typeflow_core::{BuildError, DisplayValue, Identifier, TypedValue};
use typeflow_schema::{Node, ScopeType};

use crate::error::StepError;

/// Business logic of a step.
pub type Handler = Arc<dyn Fn(TypedValue) -> (String, TypedValue) + Send + Sync>;

/// Which checks [`Step::call`] performs around the handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Skip validating the input, e.g. because it was just decoded.
    pub skip_input_validation: bool,
    /// Skip validating the output, e.g. because it is about to be encoded.
    pub skip_output_validation: bool,
}

impl CallOptions {
    /// Validate both sides.
    pub fn validated() -> Self {
        Self::default()
    }

    /// Skip both checks; the caller decodes and encodes around the call.
    pub fn unchecked() -> Self {
        Self {
            skip_input_validation: true,
            skip_output_validation: true,
        }
    }
}

/// One possible result of a step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutput {
    schema: ScopeType,
    #[serde(skip_serializing_if = "DisplayValue::is_empty")]
    display: DisplayValue,
    /// True if this output reports a failure of the step.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    error: bool,
}

impl StepOutput {
    pub fn new(schema: ScopeType) -> Self {
        Self {
            schema,
            display: DisplayValue::default(),
            error: false,
        }
    }

    pub fn display(mut self, display: DisplayValue) -> Self {
        self.display = display;
        self
    }

    /// Mark this output as an error result.
    pub fn error(mut self) -> Self {
        self.error = true;
        self
    }

    pub fn schema(&self) -> &ScopeType {
        &self.schema
    }

    pub fn is_error(&self) -> bool {
        self.error
    }
}

/// A named operation: input scope, handler, declared outputs.
#[derive(Clone, Serialize)]
pub struct Step {
    id: Identifier,
    #[serde(skip_serializing_if = "DisplayValue::is_empty")]
    display: DisplayValue,
    input: ScopeType,
    outputs: IndexMap<Identifier, StepOutput>,
    #[serde(skip)]
    handler: Handler,
}

impl Step {
    pub fn builder<F>(id: &str, input: ScopeType, handler: F) -> StepBuilder
    where
        F: Fn(TypedValue) -> (String, TypedValue) + Send + Sync + 'static,
    {
        StepBuilder {
            id: id.to_string(),
            display: DisplayValue::default(),
            input,
            outputs: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn display(&self) -> &DisplayValue {
        &self.display
    }

    pub fn input(&self) -> &ScopeType {
        &self.input
    }

    pub fn outputs(&self) -> &IndexMap<Identifier, StepOutput> {
        &self.outputs
    }

    pub fn output(&self, id: &str) -> Result<&StepOutput, StepError> {
        self.outputs
            .get(id)
            .ok_or_else(|| StepError::UndeclaredOutput {
                step: self.id.to_string(),
                output: id.to_string(),
            })
    }

    /// Run the handler on `input`.
    ///
    /// An output id the step does not declare is always an error, whatever
    /// the options say: it means the handler itself is wrong.
    pub fn call(
        &self,
        input: TypedValue,
        options: CallOptions,
    ) -> Result<(String, TypedValue), StepError> {
        if !options.skip_input_validation {
            self.input
                .validate(&input)
                .map_err(|source| StepError::InvalidInput {
                    step: self.id.to_string(),
                    source,
                })?;
        }

        let (output_id, value) = (self.handler)(input);

        let output = self.output(&output_id).map_err(|e| {
            tracing::error!(step = %self.id, output = %output_id, "step returned an undeclared output");
            e
        })?;
        if !options.skip_output_validation {
            output.schema.validate(&value).map_err(|source| {
                tracing::error!(
                    step = %self.id,
                    output = %output_id,
                    error = %source,
                    "step produced invalid output"
                );
                StepError::InvalidOutput {
                    step: self.id.to_string(),
                    output: output_id.clone(),
                    source,
                }
            })?;
        }
        if output.error {
            tracing::warn!(step = %self.id, output = %output_id, "step returned an error output");
        }
        Ok((output_id, value))
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("display", &self.display)
            .field("input", &self.input.root())
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Collects the parts of a [`Step`] and checks them on [`build`](Self::build).
pub struct StepBuilder {
    id: String,
    display: DisplayValue,
    input: ScopeType,
    outputs: Vec<(String, StepOutput)>,
    handler: Handler,
}

impl StepBuilder {
    pub fn display(mut self, display: DisplayValue) -> Self {
        self.display = display;
        self
    }

    pub fn output(mut self, id: &str, output: StepOutput) -> Self {
        self.outputs.push((id.to_string(), output));
        self
    }

    pub fn build(self) -> Result<Step, BuildError> {
        let id = Identifier::new(self.id)?;
        if self.outputs.is_empty() {
            return Err(BuildError::bad_argument(format!(
                "step '{id}' must declare at least one output"
            )));
        }
        let mut outputs = IndexMap::with_capacity(self.outputs.len());
        for (output_id, output) in self.outputs {
            let output_id = Identifier::new(output_id)?;
            if outputs.contains_key(&output_id) {
                return Err(BuildError::bad_argument(format!(
                    "duplicate output ID '{output_id}' on step '{id}'"
                )));
            }
            outputs.insert(output_id, output);
        }
        Ok(Step {
            id,
            display: self.display,
            input: self.input,
            outputs,
            handler: self.handler,
        })
    }
}

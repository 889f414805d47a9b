//! # Step Errors
//!
//! Every [`ConstraintError`] raised while dispatching a step is classified
//! at the step boundary: a failure decoding the caller's data is
//! [`StepError::InvalidInput`], a failure checking what the handler
//! produced is [`StepError::InvalidOutput`]. The two never mix, so callers
//! can tell "your data" from "our bug".

use thiserror::Error;
use typeflow_core::ConstraintError;

/// Exit code for usage errors (unknown or unselected step).
pub const EXIT_USAGE: i32 = 64;
/// Exit code for invalid input data.
pub const EXIT_DATA: i32 = 65;
/// Exit code for defects in a step implementation.
pub const EXIT_SOFTWARE: i32 = 70;

/// A step could not be dispatched or completed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    /// The requested step is not part of the schema.
    #[error("No such step: {0}")]
    NoSuchStep(String),

    /// The schema has several steps and none was selected.
    #[error("A step must be selected, one of: {}", .available.join(", "))]
    StepRequired { available: Vec<String> },

    /// The caller's input does not match the step's input scope.
    #[error("Invalid input for step {step}: {source}")]
    InvalidInput {
        step: String,
        #[source]
        source: ConstraintError,
    },

    /// The handler produced data its declared output rejects.
    #[error("Step {step} produced invalid output for {output}: {source}")]
    InvalidOutput {
        step: String,
        output: String,
        #[source]
        source: ConstraintError,
    },

    /// The handler returned an output id the step does not declare.
    #[error("Step {step} returned undeclared output ID '{output}'")]
    UndeclaredOutput { step: String, output: String },
}

impl StepError {
    /// Process exit code a command-line harness reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoSuchStep(_) | Self::StepRequired { .. } => EXIT_USAGE,
            Self::InvalidInput { .. } => EXIT_DATA,
            Self::InvalidOutput { .. } | Self::UndeclaredOutput { .. } => EXIT_SOFTWARE,
        }
    }

    /// True if the error points at a defect in the step itself.
    pub fn is_defect(&self) -> bool {
        self.exit_code() == EXIT_SOFTWARE
    }

    /// The underlying path-qualified constraint error, if any.
    pub fn constraint(&self) -> Option<&ConstraintError> {
        match self {
            Self::InvalidInput { source, .. } | Self::InvalidOutput { source, .. } => Some(source),
            Self::NoSuchStep(_) | Self::StepRequired { .. } | Self::UndeclaredOutput { .. } => {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use typeflow_core::FieldPath;

    fn constraint() -> ConstraintError {
        ConstraintError::new(FieldPath::root().child("name"), "This field is required")
    }

    #[test]
    fn exit_codes_follow_the_harness_contract() {
        assert_eq!(StepError::NoSuchStep("x".into()).exit_code(), 64);
        assert_eq!(
            StepError::StepRequired { available: vec!["a".into(), "b".into()] }.exit_code(),
            64
        );
        let input = StepError::InvalidInput { step: "s".into(), source: constraint() };
        assert_eq!(input.exit_code(), 65);
        assert!(!input.is_defect());
        let output = StepError::InvalidOutput {
            step: "s".into(),
            output: "success".into(),
            source: constraint(),
        };
        assert_eq!(output.exit_code(), 70);
        assert!(StepError::UndeclaredOutput { step: "s".into(), output: "o".into() }.is_defect());
    }

    #[test]
    fn source_chain_exposes_the_constraint_error() {
        let err = StepError::InvalidInput { step: "greet".into(), source: constraint() };
        assert_eq!(
            err.to_string(),
            "Invalid input for step greet: Validation failed for 'name': This field is required"
        );
        assert!(err.source().is_some());
        assert_eq!(err.constraint().map(|c| c.segments().len()), Some(1));
    }

    #[test]
    fn step_required_lists_choices() {
        let err = StepError::StepRequired { available: vec!["a".into(), "b".into()] };
        assert_eq!(err.to_string(), "A step must be selected, one of: a, b");
    }
}

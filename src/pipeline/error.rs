//! Pipeline-specific error types.

use crate::pipeline::lifecycle::CommandState;
use crate::pipeline::record::{ErrorCategory, ErrorRecord};
use crate::types::ValueType;
use thiserror::Error;

/// Failures of the parameter binder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    #[error("Parameter name '{name}' is ambiguous. Possible matches: {}", .candidates.join(", "))]
    AmbiguousParameter {
        name: String,
        candidates: Vec<String>,
    },

    #[error("Missing mandatory parameter '{parameter}'")]
    MissingMandatoryParameter { parameter: String },

    #[error("Missing an argument for parameter '{parameter}'")]
    MissingArgument { parameter: String },

    #[error("Cannot bind parameter '{parameter}': cannot convert \"{value}\" of type {from} to {to}")]
    TypeConversionFailed {
        parameter: String,
        value: String,
        from: String,
        to: ValueType,
    },

    #[error("The input object cannot be bound to any parameter of the command")]
    NoParameterAcceptsInput,

    #[error("A parameter cannot be found that matches parameter name '{name}'")]
    ParameterNotFound { name: String },

    #[error("A positional parameter cannot be found that accepts argument '{argument}'")]
    PositionalParameterNotFound { argument: String },

    #[error("Parameter '{parameter}' cannot be specified more than once")]
    ParameterAlreadyBound { parameter: String },
}

impl BindingError {
    /// Stable identifier used as the error record's `error_id`.
    pub fn error_id(&self) -> &'static str {
        match self {
            BindingError::AmbiguousParameter { .. } => "AmbiguousParameter",
            BindingError::MissingMandatoryParameter { .. } => "MissingMandatoryParameter",
            BindingError::MissingArgument { .. } => "MissingArgument",
            BindingError::TypeConversionFailed { .. } => "TypeConversionFailed",
            BindingError::NoParameterAcceptsInput => "NoParameterAcceptsInput",
            BindingError::ParameterNotFound { .. } => "ParameterNotFound",
            BindingError::PositionalParameterNotFound { .. } => "PositionalParameterNotFound",
            BindingError::ParameterAlreadyBound { .. } => "ParameterAlreadyBound",
        }
    }

    pub fn to_error_record(&self) -> ErrorRecord {
        ErrorRecord::new(self.to_string())
            .with_category(ErrorCategory::Binding)
            .with_id(self.error_id())
    }
}

/// Failures of a pipe operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeError {
    #[error("Pipe is closed")]
    Closed,

    #[error("Pipe already holds an unconsumed record")]
    Full,

    #[error("Pipe was stopped")]
    Stopped,
}

/// An illegal lifecycle transition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Illegal lifecycle transition {from} -> {to}")]
pub struct LifecycleError {
    pub from: CommandState,
    pub to: CommandState,
}

/// How a fault affects the chain. Chosen by the command author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Aborts the command and the whole chain.
    Terminating,
    /// Reported; the current object is skipped and the chain continues.
    NonTerminating,
}

/// A fault raised from `Begin`, `Process`, `End` or disposal.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct CommandFault {
    pub kind: FaultKind,
    pub error: ErrorRecord,
}

impl CommandFault {
    pub fn terminating(error: ErrorRecord) -> Self {
        Self {
            kind: FaultKind::Terminating,
            error,
        }
    }

    pub fn non_terminating(error: ErrorRecord) -> Self {
        Self {
            kind: FaultKind::NonTerminating,
            error,
        }
    }

    pub fn is_terminating(&self) -> bool {
        self.kind == FaultKind::Terminating
    }
}

impl From<LifecycleError> for CommandFault {
    fn from(err: LifecycleError) -> Self {
        CommandFault::terminating(
            ErrorRecord::new(err.to_string())
                .with_category(ErrorCategory::InvalidOperation)
                .with_id("IllegalLifecycleTransition"),
        )
    }
}

impl From<PipeError> for CommandFault {
    fn from(err: PipeError) -> Self {
        CommandFault::terminating(
            ErrorRecord::new(err.to_string())
                .with_category(ErrorCategory::InvalidOperation)
                .with_id("PipeFailure"),
        )
    }
}

/// Outcome of a lifecycle call that did not complete normally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error(transparent)]
    Fault(#[from] CommandFault),

    /// The chain is halting; unwind without reporting anything further.
    #[error("The pipeline has been stopped")]
    Stopped,
}

impl CommandError {
    pub fn terminating(error: ErrorRecord) -> Self {
        CommandError::Fault(CommandFault::terminating(error))
    }

    pub fn non_terminating(error: ErrorRecord) -> Self {
        CommandError::Fault(CommandFault::non_terminating(error))
    }
}

/// Result of `Begin`, `Process` and `End`.
pub type CommandResult = std::result::Result<(), CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_error_display() {
        let err = BindingError::AmbiguousParameter {
            name: "P".into(),
            candidates: vec!["Path".into(), "Property".into()],
        };
        assert_eq!(
            err.to_string(),
            "Parameter name 'P' is ambiguous. Possible matches: Path, Property"
        );
        assert_eq!(err.error_id(), "AmbiguousParameter");
    }

    #[test]
    fn test_binding_error_record() {
        let record = BindingError::NoParameterAcceptsInput.to_error_record();
        assert_eq!(record.category, ErrorCategory::Binding);
        assert_eq!(record.error_id, "NoParameterAcceptsInput");
    }

    #[test]
    fn test_fault_conversions() {
        let fault: CommandFault = PipeError::Full.into();
        assert!(fault.is_terminating());
        assert_eq!(fault.error.error_id, "PipeFailure");

        let err: CommandError = fault.into();
        assert!(matches!(err, CommandError::Fault(_)));
        assert_eq!(CommandError::Stopped.to_string(), "The pipeline has been stopped");
    }
}

//! Error handling for cmdpipe
//!
//! This module defines the crate-level error type and a Result alias used by
//! everything outside the per-object hot path. Faults raised by commands while
//! a chain runs never surface here; they become Error records on the host
//! timeline instead.

use crate::pipeline::error::{BindingError, LifecycleError};
use thiserror::Error;

/// Main error type for cmdpipe operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed pipeline definition
    #[error("Definition error: {0}")]
    Definition(String),

    /// A command name that is not registered
    #[error("The term '{0}' is not recognized as a command")]
    UnknownCommand(String),

    /// Static binding failures surfaced outside a running chain
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Errors related to background chains
    #[error("Job error: {0}")]
    Job(String),

    /// Errors related to script compilation
    #[error("Script error: {0}")]
    Script(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EngineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        EngineError::Script(err.to_string())
    }
}

impl From<rhai::ParseError> for EngineError {
    fn from(err: rhai::ParseError) -> Self {
        EngineError::Script(err.to_string())
    }
}

/// Result type alias for cmdpipe operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EngineError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| EngineError::from_rhai_error(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::UnknownCommand("Get-Nothing".to_string());
        assert_eq!(
            err.to_string(),
            "The term 'Get-Nothing' is not recognized as a command"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = EngineError::Definition("missing name".to_string());
        let with_ctx = err.with_context("Failed to load pipeline.toml");
        assert!(with_ctx.to_string().contains("Failed to load pipeline.toml"));
        assert!(with_ctx.to_string().contains("missing name"));
    }

    #[test]
    fn test_binding_error_conversion() {
        let err: EngineError = BindingError::NoParameterAcceptsInput.into();
        assert!(matches!(err, EngineError::Binding(_)));
        assert!(err.to_string().starts_with("Binding error:"));
    }
}

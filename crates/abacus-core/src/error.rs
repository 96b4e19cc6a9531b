//! Error handling for the Abacus calculator engine
//!
//! Every fallible engine call returns [`CalculatorError`]. Arithmetic failures
//! raised inside an operation are reported as [`OperationFailure`] and wrapped
//! by the engine together with the name of the operation that produced them.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure raised while executing a single arithmetic operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationFailure {
    /// Divisor, modulus base or root index is zero
    #[error("{0}")]
    DivisionByZero(&'static str),

    /// Result does not fit in the decimal range
    #[error("result out of range")]
    Overflow,

    /// Input lies outside the domain of the operation
    #[error("{0}")]
    InvalidDomain(&'static str),
}

/// Error type for calculator engine operations
#[derive(Error, Debug)]
pub enum CalculatorError {
    /// Operand could not be parsed or exceeds the configured magnitude
    #[error("{message}")]
    Validation { message: String, input: String },

    /// Operation name is not registered
    #[error("unknown operation: {name}")]
    UnknownOperation { name: String },

    /// Operation failed during execution
    #[error("{operation} failed: {source}")]
    Operation {
        operation: String,
        #[source]
        source: OperationFailure,
    },

    /// History file could not be written or read back
    #[error("history persistence error: {message}")]
    Persistence { message: String, path: Option<PathBuf> },

    /// Invalid configuration or unusable directories
    #[error("configuration error: {message}")]
    Configuration { message: String, setting: Option<String> },
}

impl CalculatorError {
    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            CalculatorError::Validation { .. } => "validation",
            CalculatorError::UnknownOperation { .. } => "unknown_operation",
            CalculatorError::Operation { .. } => "operation",
            CalculatorError::Persistence { .. } => "persistence",
            CalculatorError::Configuration { .. } => "configuration",
        }
    }

    /// Check if the session can continue after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CalculatorError::Configuration { .. })
    }

    /// Create an operand validation error
    pub fn validation(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), input: input.into() }
    }

    /// Create a persistence error tied to a file
    pub fn persistence(path: &Path, message: impl Into<String>) -> Self {
        Self::Persistence { message: message.into(), path: Some(path.to_path_buf()) }
    }

    /// Create a persistence error for malformed record data
    pub fn malformed_record(message: impl Into<String>) -> Self {
        Self::Persistence { message: message.into(), path: None }
    }

    /// Create a configuration error for a named setting
    pub fn configuration(setting: &str, message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into(), setting: Some(setting.to_string()) }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, CalculatorError>;

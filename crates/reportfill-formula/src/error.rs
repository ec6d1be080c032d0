//! Formula error types

use reportfill_core::ErrorKind;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing or evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Formula text could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Function name is not part of the formula language
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Name is neither a report field nor a dataset column
    #[error("Unknown name '{0}': not a field or a column")]
    UnknownIdentifier(String),

    /// A referenced field failed earlier in the pass
    #[error("Field '{field}' failed: {message}")]
    DependencyFailed { field: String, message: String },

    /// Operand types do not fit the operation
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Division (or modulo) by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Too few values to compute an aggregate
    #[error("{function} needs at least {required} value(s), got {actual}")]
    EmptySeries {
        function: &'static str,
        required: usize,
        actual: usize,
    },

    /// Two series of different lengths combined row-wise
    #[error("Series length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    /// Other evaluation failure
    #[error("Evaluation error: {0}")]
    Evaluation(String),
}

impl FormulaError {
    /// Whether the formula failed before evaluation (syntax, names, functions)
    /// or while computing a value
    pub fn category(&self) -> ErrorKind {
        match self {
            FormulaError::Parse(_)
            | FormulaError::UnknownFunction(_)
            | FormulaError::ArgumentCount { .. }
            | FormulaError::UnknownIdentifier(_) => ErrorKind::Translation,
            _ => ErrorKind::Evaluation,
        }
    }
}

//! Error types for reportfill-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in reportfill-core
#[derive(Debug, Error)]
pub enum Error {
    /// Column not found by name
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// A column with the same name already exists
    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    /// Column length does not match the dataset's row count
    #[error("Column '{column}' has {actual} values, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

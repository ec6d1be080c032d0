//! Chart error types

use reportfill_core::ErrorKind;
use thiserror::Error;

/// Result type for chart operations
pub type ChartResult<T> = std::result::Result<T, ChartError>;

/// Errors from chart configuration or rendering
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    /// Required keys are absent from the chart spec
    #[error("Missing chart configuration: {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),

    /// A configured column is not in the dataset
    #[error("Chart {role} column '{column}' not found")]
    ColumnNotFound { role: &'static str, column: String },

    /// Chart type is not one of line, bar, hist, pie
    #[error("Unsupported chart type: {0}")]
    UnsupportedType(String),

    /// DPI scale must be a positive number
    #[error("Invalid dpi_scale: {0}")]
    InvalidDpiScale(f64),

    /// The renderer failed
    #[error("Chart rendering failed: {0}")]
    Render(String),
}

impl ChartError {
    /// Create a render error
    pub fn render<S: Into<String>>(message: S) -> Self {
        ChartError::Render(message.into())
    }

    /// Configuration problems versus rendering failures
    pub fn category(&self) -> ErrorKind {
        match self {
            ChartError::Render(_) => ErrorKind::ChartRender,
            _ => ErrorKind::ChartConfig,
        }
    }
}

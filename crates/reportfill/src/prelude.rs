//! Prelude module - common imports for reportfill users
//!
//! ```rust
//! use reportfill::prelude::*;
//! ```

pub use crate::{
    // Template types
    render_document,
    // Chart types
    ChartRenderer,
    ChartRequest,
    ChartSpec,
    ChartType,

    // Main types
    Dataset,
    // Extension traits
    DatasetEvaluationExt,
    ErrorKind,
    EvaluationPass,
    Field,
    FieldContext,
    FieldKind,
    FieldSet,
    FieldValue,
    ImageRef,
    PassMode,
    PassOptions,
    PassOutcome,
    Scalar,
    TemplateRenderer,
    TextTemplate,
};

#[cfg(feature = "csv")]
pub use crate::{CsvDatasetReader, CsvReadOptions, CsvWriteOptions, CsvWriter};

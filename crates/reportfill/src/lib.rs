//! # reportfill
//!
//! Resolve named report fields against a tabular dataset.
//!
//! A report binds field names to formulas, literals or charts. An evaluation pass orders the
//! fields by their references to each other, evaluates each one against the dataset and the
//! fields resolved before it, and returns the resulting [`FieldContext`] for templating.
//!
//! ## Features
//!
//! - Closed formula language with aggregate and time-series functions
//! - Dependency ordering with non-fatal cycle detection
//! - Per-field error isolation
//! - Chart fields drawn through a pluggable [`ChartRenderer`]
//! - Settings files, JSON record datasets and CSV datasets (`csv` feature)
//!
//! ## Example
//!
//! ```rust
//! use reportfill::prelude::*;
//!
//! let dataset = Dataset::from_columns(vec![(
//!     "revenue",
//!     vec![Scalar::from(10.0), Scalar::from(20.0), Scalar::from(30.0)],
//! )])
//! .unwrap();
//!
//! let fields = FieldSet::new()
//!     .formula("total", "SUM(revenue)")
//!     .formula("busy_months", "COUNT(revenue > 15)")
//!     .fixed("title", "Quarterly sales");
//!
//! let outcome = dataset.preview(&fields).unwrap();
//! let document = render_document(
//!     &TextTemplate::new("{{ title }}: {{ total }} over {{ busy_months }} busy months"),
//!     &outcome.context,
//! )
//! .unwrap();
//!
//! assert_eq!(document, "Quarterly sales: 60 over 2 busy months");
//! ```

pub mod fields;
pub mod normalize;
pub mod pass;
pub mod prelude;
pub mod records;
pub mod settings;
pub mod template;

pub use fields::{Field, FieldGraph, FieldKind, FieldSet};
pub use normalize::{normalize, round_half_away};
pub use pass::{DatasetEvaluationExt, EvaluationPass, PassMode, PassOptions, PassOutcome, PassStats};
pub use records::{dataset_from_json, load_records, parse_records, RecordsError, RecordsResult};
pub use settings::{
    load_settings, parse_settings, save_settings, settings_to_string, SettingsError, SettingsResult,
};
pub use template::{
    render_document, template_variables, RenderError, TemplateError, TemplateRenderer,
    TemplateResult, TextTemplate,
};

// Re-export core types
pub use reportfill_core::{
    parse_date_text, ChartMarker, Column, Dataset, Error, ErrorKind, ErrorMarker, FieldContext,
    FieldValue, ImageRef, Result, Scalar,
};

// Re-export formula types
pub use reportfill_formula::{
    evaluate, evaluate_formula, parse_formula, quoted_literal, referenced_names, CycleWarning,
    DependencyGraph, EvaluationContext, FormulaError, FormulaExpr, FormulaResult, FormulaValue,
    Function, Schedule,
};

// Re-export chart types
pub use reportfill_chart::{
    ChartError, ChartRenderer, ChartRequest, ChartResult, ChartSpec, ChartType, DataSeries,
};

// Re-export CSV types
#[cfg(feature = "csv")]
pub use reportfill_csv::{
    CsvDataset, CsvDatasetReader, CsvError, CsvReadOptions, CsvResult, CsvWriteOptions,
    CsvWriter, DateColumn, LineTerminator,
};

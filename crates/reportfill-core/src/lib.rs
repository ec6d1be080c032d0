//! # reportfill-core
//!
//! Core data structures for the reportfill engine.
//!
//! This crate provides the fundamental types shared by the other reportfill crates:
//! - [`Scalar`] - A typed dataset value (number, text, boolean, date or null)
//! - [`Dataset`] - An ordered, column-oriented table with case-insensitive column lookup
//! - [`FieldValue`] and [`FieldContext`] - Resolved report field values for one evaluation pass
//!
//! ## Example
//!
//! ```rust
//! use reportfill_core::{Dataset, Scalar};
//!
//! let dataset = Dataset::from_records(vec![
//!     vec![("Revenue", Scalar::from(10.0))],
//!     vec![("Revenue", Scalar::from(20.0))],
//! ]);
//!
//! assert_eq!(dataset.row_count(), 2);
//! assert_eq!(dataset.resolve_column_name("revenue"), Some("Revenue"));
//! ```

pub mod context;
pub mod dataset;
pub mod error;
pub mod value;

pub use context::{ChartMarker, ErrorKind, ErrorMarker, FieldContext, FieldValue, ImageRef};
pub use dataset::{Column, Dataset};
pub use error::{Error, Result};
pub use value::{parse_date_text, Scalar};

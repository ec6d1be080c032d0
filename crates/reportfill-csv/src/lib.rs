//! # reportfill-csv
//!
//! CSV dataset source for reportfill.
//!
//! Reading detects numbers, booleans and text per field and finds the primary date column:
//! the first text column in which at least one value reads as a date.

mod error;
mod options;
mod reader;
mod writer;

pub use error::{CsvError, CsvResult};
pub use options::{CsvReadOptions, CsvWriteOptions, LineTerminator};
pub use reader::{CsvDataset, CsvDatasetReader, DateColumn};
pub use writer::CsvWriter;

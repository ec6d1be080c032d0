//! CSV reader

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::options::CsvReadOptions;
use chrono::NaiveDateTime;
use reportfill_core::{parse_date_text, Dataset, Scalar};

/// Text read as a missing value
const NULL_MARKERS: &[&str] = &["", "na", "n/a", "nan", "null", "none"];

/// The primary date column and its range
#[derive(Debug, Clone, PartialEq)]
pub struct DateColumn {
    /// Column name as stored in the dataset
    pub name: String,
    pub min: NaiveDateTime,
    pub max: NaiveDateTime,
}

/// A dataset read from CSV
#[derive(Debug, Clone)]
pub struct CsvDataset {
    pub dataset: Dataset,
    /// Primary date column, when one was found
    pub date_column: Option<DateColumn>,
}

/// CSV dataset reader
pub struct CsvDatasetReader;

impl CsvDatasetReader {
    /// Read a CSV file into a dataset
    pub fn read_file<P: AsRef<Path>>(path: P, options: &CsvReadOptions) -> CsvResult<CsvDataset> {
        let file = File::open(path)?;
        Self::read(file, options)
    }

    /// Read CSV from a reader into a dataset
    pub fn read<R: Read>(reader: R, options: &CsvReadOptions) -> CsvResult<CsvDataset> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(options.has_header)
            .from_reader(reader);

        let mut names: Vec<String> = if options.has_header {
            csv_reader
                .headers()?
                .iter()
                .map(|h| h.trim().to_string())
                .collect()
        } else {
            Vec::new()
        };
        let mut columns: Vec<Vec<Scalar>> = vec![Vec::new(); names.len()];

        // Read records
        for result in csv_reader.records() {
            let record = result?;

            // Headerless input: the first record fixes the width
            if columns.is_empty() && !options.has_header {
                names = (1..=record.len()).map(|i| format!("column_{}", i)).collect();
                columns = vec![Vec::new(); record.len()];
            }

            for (col, field) in record.iter().enumerate() {
                let value = if options.auto_detect_types {
                    Self::detect_type(field)
                } else {
                    Scalar::text(field)
                };
                if let Some(column) = columns.get_mut(col) {
                    column.push(value);
                }
            }
        }

        let mut dataset = Dataset::new();
        for (name, values) in dedupe_names(names).into_iter().zip(columns) {
            dataset.add_column(name, values)?;
        }

        let date_column = if options.detect_date_column {
            Self::convert_date_column(&mut dataset)?
        } else {
            None
        };

        match &date_column {
            Some(date) => log::debug!(
                "date column '{}' spans {} to {}",
                date.name,
                date.min,
                date.max
            ),
            None if options.require_date_column => return Err(CsvError::NoDateColumn),
            None => log::debug!("no date column found"),
        }

        Ok(CsvDataset {
            dataset,
            date_column,
        })
    }

    /// Find the first text column holding at least one date and convert it in place
    ///
    /// Values that do not read as dates become null.
    fn convert_date_column(dataset: &mut Dataset) -> CsvResult<Option<DateColumn>> {
        let candidate = dataset.columns().iter().find_map(|column| {
            let mut non_null = column.values().iter().filter(|v| !v.is_null()).peekable();
            non_null.peek()?;
            let mut dates = Vec::new();
            for value in non_null {
                // Only text columns are candidates; numbers are never dates
                let text = value.as_text()?;
                if let Some(date) = parse_date_text(text) {
                    dates.push(date);
                }
            }
            let min = dates.iter().min().copied()?;
            let max = dates.iter().max().copied()?;
            Some(DateColumn {
                name: column.name().to_string(),
                min,
                max,
            })
        });

        if let Some(date) = &candidate {
            dataset.map_column(&date.name, |v| {
                v.as_date().map_or(Scalar::Null, Scalar::Date)
            })?;
        }

        Ok(candidate)
    }

    /// Detect the type of a field value
    fn detect_type(field: &str) -> Scalar {
        let field = field.trim();

        if NULL_MARKERS.iter().any(|m| field.eq_ignore_ascii_case(m)) {
            return Scalar::Null;
        }

        // Try boolean
        if field.eq_ignore_ascii_case("true") {
            return Scalar::Boolean(true);
        }
        if field.eq_ignore_ascii_case("false") {
            return Scalar::Boolean(false);
        }

        // Try number (finite only: "inf" stays text)
        if let Ok(n) = field.parse::<f64>() {
            if n.is_finite() {
                return Scalar::Number(n);
            }
        }

        // Default to text
        Scalar::text(field)
    }
}

/// Make header names unique: repeats get `.1`, `.2`, ...
fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut n = 1;
        while result.contains(&candidate) {
            candidate = format!("{}.{}", name, n);
            n += 1;
        }
        result.push(candidate);
    }
    result
}

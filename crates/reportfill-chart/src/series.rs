//! Data series types

use reportfill_core::{Dataset, Scalar};

/// Data series for a chart
#[derive(Debug, Clone, PartialEq)]
pub struct DataSeries {
    /// Series name (the y column)
    pub name: String,
    /// Categories (X data)
    pub categories: Vec<Scalar>,
    /// Values (Y data)
    pub values: Vec<Scalar>,
}

impl DataSeries {
    /// Copy two columns out of a dataset
    ///
    /// Both columns must exist; callers validate names first.
    pub(crate) fn from_columns(dataset: &Dataset, x_column: &str, y_column: &str) -> Self {
        let values_of = |name: &str| {
            dataset
                .column(name)
                .map(|c| c.values().to_vec())
                .unwrap_or_default()
        };
        Self {
            name: y_column.to_string(),
            categories: values_of(x_column),
            values: values_of(y_column),
        }
    }

    /// Numeric values, skipping nulls and non-numbers
    pub fn numbers(&self) -> Vec<f64> {
        self.values
            .iter()
            .filter(|v| !v.is_null())
            .filter_map(Scalar::as_number)
            .collect()
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the series has no points
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

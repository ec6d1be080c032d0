//! Tabular dataset

use crate::error::{Error, Result};
use crate::value::Scalar;
use ahash::AHashMap;
use chrono::NaiveDateTime;

/// A named column of values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<Scalar>,
}

impl Column {
    /// Create a new column
    pub fn new<S: Into<String>>(name: S, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Column name as stored (case preserved)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values in row order
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the column has no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An ordered table of typed values
///
/// Rows keep the order they were supplied in; `first`/`last` style reductions rely on it.
/// Column names are stored as given, while lookups by name are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
    /// Lowercased name → column index
    lookup: AHashMap<String, usize>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from named columns of equal length
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<Scalar>)>) -> Result<Self> {
        let mut dataset = Self::new();
        for (name, values) in columns {
            dataset.add_column(name, values)?;
        }
        Ok(dataset)
    }

    /// Build a dataset from row records
    ///
    /// Columns appear in first-seen order. A column missing from a record is null for that row.
    pub fn from_records<I, R, K>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, Scalar)>,
        K: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        let mut index: AHashMap<String, usize> = AHashMap::new();
        let mut values: Vec<Vec<Scalar>> = Vec::new();
        let mut row_count = 0;

        for record in records {
            for (key, value) in record {
                let key = key.into();
                let col = match index.get(&key) {
                    Some(&col) => col,
                    None => {
                        let col = names.len();
                        index.insert(key.clone(), col);
                        names.push(key);
                        values.push(vec![Scalar::Null; row_count]);
                        col
                    }
                };
                let column = &mut values[col];
                if column.len() > row_count {
                    // Repeated key within one record: the later value wins
                    column[row_count] = value;
                } else {
                    column.push(value);
                }
            }
            row_count += 1;
            for column in &mut values {
                column.resize(row_count, Scalar::Null);
            }
        }

        let mut dataset = Self {
            columns: Vec::with_capacity(names.len()),
            row_count,
            lookup: AHashMap::new(),
        };
        for (name, column_values) in names.into_iter().zip(values) {
            dataset.push_column(Column::new(name, column_values));
        }
        dataset
    }

    /// Append a column
    ///
    /// The first column fixes the row count; later columns must match it.
    pub fn add_column<S: Into<String>>(&mut self, name: S, values: Vec<Scalar>) -> Result<()> {
        let name = name.into();
        if self.columns.iter().any(|c| c.name == name) {
            return Err(Error::DuplicateColumn(name));
        }
        if self.columns.is_empty() {
            self.row_count = values.len();
        } else if values.len() != self.row_count {
            return Err(Error::ColumnLengthMismatch {
                column: name,
                expected: self.row_count,
                actual: values.len(),
            });
        }
        self.push_column(Column::new(name, values));
        Ok(())
    }

    fn push_column(&mut self, column: Column) {
        // Later columns win on a case-insensitive clash; exact names are checked first on lookup
        self.lookup
            .insert(column.name.to_lowercase(), self.columns.len());
        self.columns.push(column);
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// All columns in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order
    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .or_else(|| self.lookup.get(&name.to_lowercase()).copied())
    }

    /// Look up a column by name (exact match first, then case-insensitive)
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|idx| &self.columns[idx])
    }

    /// Resolve a name to the dataset's canonical column name
    pub fn resolve_column_name(&self, name: &str) -> Option<&str> {
        self.column(name).map(Column::name)
    }

    /// Get a single value
    pub fn get(&self, row: usize, column: &str) -> Option<&Scalar> {
        self.column(column).and_then(|c| c.values.get(row))
    }

    /// Get one row as (column name, value) pairs
    pub fn row(&self, row: usize) -> Option<Vec<(&str, &Scalar)>> {
        if row >= self.row_count {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| (c.name.as_str(), &c.values[row]))
                .collect(),
        )
    }

    /// Replace every value of a column through `f`
    pub fn map_column<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: FnMut(&Scalar) -> Scalar,
    {
        let idx = self
            .column_index(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
        let column = &mut self.columns[idx];
        column.values = column.values.iter().map(f).collect();
        Ok(())
    }

    /// Keep only the rows for which `keep` returns true, preserving order
    pub fn filter_rows<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(usize) -> bool,
    {
        let rows: Vec<usize> = (0..self.row_count).filter(|&r| keep(r)).collect();
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), rows.iter().map(|&r| c.values[r].clone()).collect()))
            .collect();
        Dataset {
            columns,
            row_count: rows.len(),
            lookup: self.lookup.clone(),
        }
    }

    /// Keep the rows whose `column` date falls within `[start, end]` (either bound optional)
    ///
    /// Text values are read as dates; rows without a readable date are dropped.
    pub fn filter_date_range(
        &self,
        column: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Dataset> {
        let col = self
            .column(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;

        Ok(self.filter_rows(|row| match col.values[row].as_date() {
            Some(d) => start.map_or(true, |s| d >= s) && end.map_or(true, |e| d <= e),
            None => false,
        }))
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.row_count == other.row_count && self.columns == other.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn sales() -> Dataset {
        Dataset::from_records(vec![
            vec![
                ("Date", Scalar::from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())),
                ("Revenue", Scalar::from(10.0)),
            ],
            vec![
                ("Date", Scalar::from(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())),
                ("Revenue", Scalar::from(20.0)),
            ],
            vec![
                ("Date", Scalar::from(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())),
                ("Revenue", Scalar::from(30.0)),
            ],
        ])
    }

    #[test]
    fn test_from_records() {
        let dataset = Dataset::from_records(vec![
            vec![("a", Scalar::from(1.0))],
            vec![("a", Scalar::from(2.0)), ("b", Scalar::from("x"))],
        ]);

        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.column_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(dataset.get(0, "b"), Some(&Scalar::Null));
        assert_eq!(dataset.get(1, "b"), Some(&Scalar::from("x")));
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let dataset = sales();
        assert_eq!(dataset.resolve_column_name("revenue"), Some("Revenue"));
        assert_eq!(dataset.resolve_column_name("REVENUE"), Some("Revenue"));
        assert_eq!(dataset.resolve_column_name("cost"), None);
    }

    #[test]
    fn test_exact_match_wins_over_case_insensitive() {
        let dataset = Dataset::from_columns(vec![
            ("value", vec![Scalar::from(1.0)]),
            ("Value", vec![Scalar::from(2.0)]),
        ])
        .unwrap();

        assert_eq!(dataset.resolve_column_name("value"), Some("value"));
        assert_eq!(dataset.resolve_column_name("Value"), Some("Value"));
        assert_eq!(dataset.resolve_column_name("VALUE"), Some("Value"));
    }

    #[test]
    fn test_add_column_length_mismatch() {
        let mut dataset = sales();
        let err = dataset
            .add_column("Cost", vec![Scalar::from(1.0)])
            .unwrap_err();
        assert!(matches!(err, Error::ColumnLengthMismatch { .. }));
        assert!(matches!(
            dataset.add_column("Revenue", vec![Scalar::Null; 3]),
            Err(Error::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_filter_date_range() {
        let dataset = sales();
        let start = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0);
        let end = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0);

        let filtered = dataset.filter_date_range("date", start, end).unwrap();
        assert_eq!(filtered.row_count(), 2);
        assert_eq!(filtered.get(0, "Revenue"), Some(&Scalar::from(20.0)));
        assert_eq!(filtered.resolve_column_name("REVENUE"), Some("Revenue"));

        assert!(dataset.filter_date_range("missing", None, None).is_err());
    }

    #[test]
    fn test_map_column() {
        let mut dataset = Dataset::from_columns(vec![(
            "when",
            vec![Scalar::from("2024-01-01"), Scalar::from("n/a")],
        )])
        .unwrap();

        dataset
            .map_column("When", |v| v.as_date().map_or(Scalar::Null, Scalar::Date))
            .unwrap();

        assert!(matches!(dataset.get(0, "when"), Some(Scalar::Date(_))));
        assert_eq!(dataset.get(1, "when"), Some(&Scalar::Null));
    }
}

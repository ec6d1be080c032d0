//! Chart types

use crate::error::{ChartError, ChartResult};
use crate::renderer::ChartRequest;
use crate::series::DataSeries;
use reportfill_core::Dataset;
use std::fmt;
use std::str::FromStr;

/// Chart types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ChartType {
    Line,
    Bar,
    /// Histogram of the y column
    Hist,
    Pie,
}

impl ChartType {
    /// Name as written in chart specs
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Line => "line",
            ChartType::Bar => "bar",
            ChartType::Hist => "hist",
            ChartType::Pie => "pie",
        }
    }
}

impl FromStr for ChartType {
    type Err = ChartError;

    fn from_str(s: &str) -> ChartResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(ChartType::Line),
            "bar" => Ok(ChartType::Bar),
            "hist" | "histogram" => Ok(ChartType::Hist),
            "pie" => Ok(ChartType::Pie),
            _ => Err(ChartError::UnsupportedType(s.to_string())),
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chart definition as stored on a chart field
///
/// Every key is optional here so incomplete settings still load; [`ChartSpec::validate`]
/// reports what is missing.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChartSpec {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub x_column: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub y_column: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub chart_type: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub title: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub dpi_scale: Option<f64>,
}

impl ChartSpec {
    /// Create a complete spec
    pub fn new<X: Into<String>, Y: Into<String>>(x_column: X, y_column: Y, chart_type: ChartType) -> Self {
        Self {
            x_column: Some(x_column.into()),
            y_column: Some(y_column.into()),
            chart_type: Some(chart_type.as_str().to_string()),
            title: None,
            dpi_scale: None,
        }
    }

    /// Set chart title
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the DPI scale
    pub fn with_dpi_scale(mut self, dpi_scale: f64) -> Self {
        self.dpi_scale = Some(dpi_scale);
        self
    }

    /// Check the spec against a dataset and build a render request for `field`
    ///
    /// Column names resolve case-insensitively; the request carries the dataset's own names.
    pub fn validate(&self, field: &str, dataset: &Dataset) -> ChartResult<ChartRequest> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }

        let x = present(&self.x_column);
        let y = present(&self.y_column);
        let kind = present(&self.chart_type);

        let mut missing = Vec::new();
        if x.is_none() {
            missing.push("x_column");
        }
        if y.is_none() {
            missing.push("y_column");
        }
        if kind.is_none() {
            missing.push("chart_type");
        }
        let (x, y, kind) = match (x, y, kind) {
            (Some(x), Some(y), Some(kind)) => (x, y, kind),
            _ => return Err(ChartError::MissingConfig(missing)),
        };

        let chart_type: ChartType = kind.parse()?;

        let x_column = dataset
            .resolve_column_name(x)
            .ok_or_else(|| ChartError::ColumnNotFound {
                role: "x",
                column: x.to_string(),
            })?;
        let y_column = dataset
            .resolve_column_name(y)
            .ok_or_else(|| ChartError::ColumnNotFound {
                role: "y",
                column: y.to_string(),
            })?;

        let dpi_scale = self.dpi_scale.unwrap_or(1.0);
        if !(dpi_scale.is_finite() && dpi_scale > 0.0) {
            return Err(ChartError::InvalidDpiScale(dpi_scale));
        }

        Ok(ChartRequest {
            field: field.to_string(),
            chart_type,
            x_column: x_column.to_string(),
            y_column: y_column.to_string(),
            title: self.title.clone(),
            dpi_scale,
            series: DataSeries::from_columns(dataset, x_column, y_column),
        })
    }
}

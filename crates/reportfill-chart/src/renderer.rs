//! Chart rendering interface

use crate::chart::ChartType;
use crate::error::ChartResult;
use crate::series::DataSeries;
use reportfill_core::ImageRef;

/// A validated request to draw one chart field
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    /// Field the chart belongs to
    pub field: String,
    pub chart_type: ChartType,
    /// Canonical dataset column for the x axis (categories, pie labels)
    pub x_column: String,
    /// Canonical dataset column for the y axis (values, histogram data)
    pub y_column: String,
    pub title: Option<String>,
    /// Resolution multiplier, 1.0 by default
    pub dpi_scale: f64,
    /// Data copied from the dataset at validation time
    pub series: DataSeries,
}

/// Turns chart requests into image references
///
/// Called once per chart field when a pass renders. Any closure of the matching shape is
/// a renderer.
pub trait ChartRenderer {
    /// Draw the chart and return a reference to the image
    fn render(&mut self, request: &ChartRequest) -> ChartResult<ImageRef>;
}

impl<F> ChartRenderer for F
where
    F: FnMut(&ChartRequest) -> ChartResult<ImageRef>,
{
    fn render(&mut self, request: &ChartRequest) -> ChartResult<ImageRef> {
        self(request)
    }
}

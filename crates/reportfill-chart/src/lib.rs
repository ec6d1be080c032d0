//! # reportfill-chart
//!
//! Chart fields for reportfill.
//!
//! A chart field stores a [`ChartSpec`]. During a pass the spec is validated against the
//! dataset into a [`ChartRequest`], which a [`ChartRenderer`] turns into an image reference.

mod chart;
mod error;
mod renderer;
mod series;

pub use chart::{ChartSpec, ChartType};
pub use error::{ChartError, ChartResult};
pub use renderer::{ChartRenderer, ChartRequest};
pub use series::DataSeries;

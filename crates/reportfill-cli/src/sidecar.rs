//! Chart renderer that writes chart descriptions next to the report
//!
//! Each chart becomes `<field>.json` in the output directory, holding the chart type, axes
//! and data. An external plotting step can turn these into images; the report refers to
//! the JSON path. Field names that map to the same file name get a numeric suffix.

use std::fs;
use std::path::PathBuf;

use ahash::AHashSet;
use reportfill::{ChartError, ChartRenderer, ChartRequest, ChartResult, ImageRef, Scalar};
use serde_json::{json, Value};

pub struct SidecarRenderer {
    dir: PathBuf,
    /// Lowercased file stems handed out so far
    used: AHashSet<String>,
}

impl SidecarRenderer {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            used: AHashSet::new(),
        }
    }

    /// File stem for a field, unique within this renderer
    fn file_stem(&mut self, field: &str) -> String {
        let base = sanitize(field);
        let mut stem = base.clone();
        let mut n = 1;
        // Lowercased so case-insensitive file systems cannot merge two charts
        while !self.used.insert(stem.to_lowercase()) {
            n += 1;
            stem = format!("{}_{}", base, n);
        }
        stem
    }
}

impl ChartRenderer for SidecarRenderer {
    fn render(&mut self, request: &ChartRequest) -> ChartResult<ImageRef> {
        fs::create_dir_all(&self.dir).map_err(|e| ChartError::render(e.to_string()))?;

        let description = json!({
            "field": request.field,
            "chart_type": request.chart_type.as_str(),
            "x_column": request.x_column,
            "y_column": request.y_column,
            "title": request.title,
            "dpi_scale": request.dpi_scale,
            "categories": request.series.categories.iter().map(scalar_json).collect::<Vec<_>>(),
            "values": request.series.values.iter().map(scalar_json).collect::<Vec<_>>(),
        });
        let text =
            serde_json::to_string_pretty(&description).map_err(|e| ChartError::render(e.to_string()))?;

        let stem = self.file_stem(&request.field);
        let path = self.dir.join(format!("{}.json", stem));
        fs::write(&path, text).map_err(|e| ChartError::render(e.to_string()))?;
        tracing::debug!(field = %request.field, path = %path.display(), "wrote chart description");

        Ok(ImageRef::new(path.display().to_string()))
    }
}

fn scalar_json(value: &Scalar) -> Value {
    match value {
        Scalar::Null => Value::Null,
        Scalar::Boolean(b) => json!(b),
        Scalar::Number(n) => json!(n),
        other => json!(other.to_string()),
    }
}

/// Keep field names usable as file names
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

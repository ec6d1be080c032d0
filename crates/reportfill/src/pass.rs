//! Field evaluation pass
//!
//! Resolves every field of a [`FieldSet`] against a [`Dataset`]: builds the dependency
//! graph, orders the fields, then evaluates them one by one into a fresh [`FieldContext`].
//! A failing field stores an error marker and the pass moves on.
//!
//! # Example
//!
//! ```rust
//! use reportfill::prelude::*;
//!
//! let dataset = Dataset::from_columns(vec![(
//!     "Revenue",
//!     vec![Scalar::from(10.0), Scalar::from(20.0), Scalar::from(30.0)],
//! )])
//! .unwrap();
//!
//! let fields = FieldSet::new()
//!     .formula("avg", "total / 3")
//!     .formula("total", "SUM(revenue)");
//!
//! let outcome = EvaluationPass::new(&dataset, &fields).preview().unwrap();
//! assert_eq!(outcome.context.get("avg"), Some(&FieldValue::Number(20.0)));
//! assert_eq!(outcome.order, vec!["total", "avg"]);
//! ```

use crate::fields::{FieldKind, FieldSet};
use crate::normalize::normalize;
use crate::{
    evaluate_formula, ChartError, ChartMarker, ChartRenderer, ChartRequest, CycleWarning,
    Dataset, ErrorKind, EvaluationContext, FieldContext, FieldValue,
};

/// How far a pass goes with chart fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassMode {
    /// Leave charts pending and return their requests
    #[default]
    Preview,
    /// Draw every chart through the renderer before returning
    Render,
}

/// Options for an evaluation pass
#[derive(Debug, Clone)]
pub struct PassOptions {
    pub mode: PassMode,
    /// Decimal places numbers are rounded to (default: 2)
    pub decimal_places: u32,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            mode: PassMode::Preview,
            decimal_places: 2,
        }
    }
}

/// Statistics from a pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Total number of fields
    pub fields: usize,
    /// Formula fields that were evaluated (cyclic ones are not)
    pub formulas_evaluated: usize,
    pub fixed: usize,
    /// Chart fields whose configuration was accepted
    pub charts_requested: usize,
    pub charts_rendered: usize,
    /// Fields holding an error marker at the end of the pass
    pub errors: usize,
    pub cycles: usize,
}

/// Everything a pass produces
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub context: FieldContext,
    /// Evaluation order
    pub order: Vec<String>,
    pub warnings: Vec<CycleWarning>,
    /// Accepted chart fields, in evaluation order
    pub chart_requests: Vec<ChartRequest>,
    pub stats: PassStats,
}

/// Extension trait for Dataset to add pass methods
pub trait DatasetEvaluationExt {
    /// Resolve fields without drawing charts
    fn preview(&self, fields: &FieldSet) -> Result<PassOutcome, ChartError>;

    /// Resolve fields and draw charts
    fn render(
        &self,
        fields: &FieldSet,
        renderer: &mut dyn ChartRenderer,
    ) -> Result<PassOutcome, ChartError>;
}

impl DatasetEvaluationExt for Dataset {
    fn preview(&self, fields: &FieldSet) -> Result<PassOutcome, ChartError> {
        EvaluationPass::new(self, fields).preview()
    }

    fn render(
        &self,
        fields: &FieldSet,
        renderer: &mut dyn ChartRenderer,
    ) -> Result<PassOutcome, ChartError> {
        EvaluationPass::new(self, fields).render(renderer)
    }
}

/// One evaluation pass over a field set
pub struct EvaluationPass<'a> {
    dataset: &'a Dataset,
    fields: &'a FieldSet,
    options: PassOptions,
}

impl<'a> EvaluationPass<'a> {
    pub fn new(dataset: &'a Dataset, fields: &'a FieldSet) -> Self {
        Self {
            dataset,
            fields,
            options: PassOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PassOptions) -> Self {
        self.options = options;
        self
    }

    /// Run in preview mode: chart fields stay pending
    pub fn preview(self) -> Result<PassOutcome, ChartError> {
        self.with_mode(PassMode::Preview).run(None)
    }

    /// Run in render mode with the given chart renderer
    pub fn render(self, renderer: &mut dyn ChartRenderer) -> Result<PassOutcome, ChartError> {
        self.with_mode(PassMode::Render).run(Some(renderer))
    }

    fn with_mode(mut self, mode: PassMode) -> Self {
        self.options.mode = mode;
        self
    }

    /// Run the pass in the configured mode
    ///
    /// Only fails when render mode has no renderer; per-field failures are stored as error
    /// markers in the context.
    pub fn run(
        &self,
        renderer: Option<&mut dyn ChartRenderer>,
    ) -> Result<PassOutcome, ChartError> {
        let span = tracing::info_span!("evaluation_pass", mode = ?self.options.mode);
        let _guard = span.enter();

        let renderer = match (self.options.mode, renderer) {
            (PassMode::Render, None) => {
                return Err(ChartError::render("render mode needs a chart renderer"))
            }
            (PassMode::Render, Some(renderer)) => Some(renderer),
            (PassMode::Preview, _) => None,
        };

        let mut stats = PassStats {
            fields: self.fields.len(),
            ..Default::default()
        };

        // Phase 1: build the graph and order the fields
        let built = self.fields.build_graph();
        let mut schedule = built.graph.schedule();

        // A field naming itself is a cycle unless the name is also a column
        for name in built.self_references {
            if self.dataset.column(&name).is_none() && !schedule.is_cyclic(&name) {
                let warning = CycleWarning {
                    path: vec![name.clone(), name],
                };
                log::warn!("{}", warning);
                schedule.cycles.push(warning);
            }
        }
        stats.cycles = schedule.cycles.len();
        log::debug!("evaluation order: {}", schedule.order.join(", "));

        // Phase 2: cyclic fields are never evaluated
        let mut context = FieldContext::new();
        for warning in &schedule.cycles {
            for member in warning.members() {
                context.insert(
                    member.as_str(),
                    FieldValue::error(ErrorKind::Cycle, warning.to_string()),
                );
            }
        }

        // Phase 3: evaluate in order
        let mut chart_requests = Vec::new();
        for name in &schedule.order {
            if context.contains(name) {
                continue;
            }
            let Some(field) = self.fields.get(name) else {
                continue;
            };

            let value = match &field.kind {
                FieldKind::Fixed(scalar) => {
                    stats.fixed += 1;
                    FieldValue::from(scalar.clone())
                }
                FieldKind::Formula(expression) => {
                    stats.formulas_evaluated += 1;
                    self.evaluate_field(name, expression, &context)
                }
                FieldKind::Chart(spec) => match spec.validate(name, self.dataset) {
                    Ok(request) => {
                        stats.charts_requested += 1;
                        chart_requests.push(request);
                        FieldValue::Chart(ChartMarker::Pending)
                    }
                    Err(e) => {
                        log::warn!("chart field '{}' rejected: {}", name, e);
                        FieldValue::error(e.category(), e.to_string())
                    }
                },
            };
            context.insert(name.as_str(), value);
        }

        // Phase 4: draw charts
        if let Some(renderer) = renderer {
            for request in &chart_requests {
                let value = match renderer.render(request) {
                    Ok(image) => {
                        stats.charts_rendered += 1;
                        FieldValue::Chart(ChartMarker::Rendered(image))
                    }
                    Err(e) => {
                        log::warn!("chart field '{}' failed to render: {}", request.field, e);
                        FieldValue::error(e.category(), e.to_string())
                    }
                };
                context.settle_chart(&request.field, value);
            }
        }

        stats.errors = context.error_count();
        tracing::info!(
            fields = stats.fields,
            formulas = stats.formulas_evaluated,
            charts = stats.charts_requested,
            errors = stats.errors,
            cycles = stats.cycles,
            "evaluation pass finished"
        );

        Ok(PassOutcome {
            context,
            order: schedule.order,
            warnings: schedule.cycles,
            chart_requests,
            stats,
        })
    }

    fn evaluate_field(&self, name: &str, expression: &str, context: &FieldContext) -> FieldValue {
        let ctx = EvaluationContext::new(self.dataset, context);
        let result = evaluate_formula(expression, &ctx)
            .and_then(|value| normalize(value, self.options.decimal_places));

        match result {
            Ok(value) => value,
            Err(e) => {
                log::warn!("field '{}' failed: {}", name, e);
                FieldValue::error(e.category(), e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChartSpec, ChartType, ImageRef, Scalar};
    use pretty_assertions::assert_eq;

    fn sales() -> Dataset {
        Dataset::from_columns(vec![
            (
                "Month",
                vec![Scalar::from("Jan"), Scalar::from("Feb"), Scalar::from("Mar")],
            ),
            (
                "Revenue",
                vec![Scalar::from(10.0), Scalar::from(20.0), Scalar::from(30.0)],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_simple_pass() {
        let fields = FieldSet::new()
            .formula("total", "SUM(revenue)")
            .fixed("title", "Q1 report");
        let outcome = EvaluationPass::new(&sales(), &fields).preview().unwrap();

        assert_eq!(outcome.context.get("total"), Some(&FieldValue::Number(60.0)));
        assert_eq!(
            outcome.context.get("title"),
            Some(&FieldValue::Text("Q1 report".into()))
        );
        assert_eq!(
            outcome.stats,
            PassStats {
                fields: 2,
                formulas_evaluated: 1,
                fixed: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_chain_pass() {
        let fields = FieldSet::new()
            .formula("growth", "PERCENT_CHANGE(revenue) / scale")
            .fixed("scale", 100.0);
        let outcome = EvaluationPass::new(&sales(), &fields).preview().unwrap();

        assert_eq!(outcome.order, vec!["scale", "growth"]);
        assert_eq!(outcome.context.get("growth"), Some(&FieldValue::Number(2.0)));
    }

    #[test]
    fn test_rounding_option() {
        let fields = FieldSet::new().formula("third", "SUM(revenue) / 7");
        let outcome = EvaluationPass::new(&sales(), &fields)
            .with_options(PassOptions {
                decimal_places: 3,
                ..Default::default()
            })
            .preview()
            .unwrap();
        assert_eq!(outcome.context.get("third"), Some(&FieldValue::Number(8.571)));
    }

    #[test]
    fn test_cycle_members_are_marked() {
        let fields = FieldSet::new()
            .formula("a", "b + 1")
            .formula("b", "a + 1")
            .formula("c", "a * 2")
            .formula("d", "SUM(revenue)");
        let outcome = EvaluationPass::new(&sales(), &fields).preview().unwrap();

        assert_eq!(outcome.warnings.len(), 1);
        for name in ["a", "b"] {
            let marker = outcome.context.get(name).and_then(FieldValue::as_error).unwrap();
            assert_eq!(marker.kind, ErrorKind::Cycle);
            assert_eq!(marker.message, "Circular reference: a -> b -> a");
        }
        // Dependents of a cyclic field fail, independent fields do not
        let c = outcome.context.get("c").and_then(FieldValue::as_error).unwrap();
        assert_eq!(c.kind, ErrorKind::Evaluation);
        assert_eq!(outcome.context.get("d"), Some(&FieldValue::Number(60.0)));
        assert_eq!(outcome.stats.formulas_evaluated, 2);
        assert_eq!(outcome.stats.errors, 3);
    }

    #[test]
    fn test_self_reference() {
        let fields = FieldSet::new().formula("x", "x + 1");
        let outcome = EvaluationPass::new(&sales(), &fields).preview().unwrap();

        assert_eq!(outcome.warnings[0].path, vec!["x", "x"]);
        assert_eq!(outcome.order, vec!["x"]);
        assert_eq!(
            outcome.context.get("x").and_then(FieldValue::as_error).map(|e| e.kind),
            Some(ErrorKind::Cycle)
        );
    }

    #[test]
    fn test_field_named_after_its_column() {
        let fields = FieldSet::new().formula("revenue", "SUM(revenue)");
        let outcome = EvaluationPass::new(&sales(), &fields).preview().unwrap();

        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.context.get("revenue"), Some(&FieldValue::Number(60.0)));
    }

    #[test]
    fn test_translation_error_is_isolated() {
        let fields = FieldSet::new()
            .formula("bad", "FROBNICATE(revenue)")
            .formula("good", "MAX(revenue)");
        let outcome = EvaluationPass::new(&sales(), &fields).preview().unwrap();

        let bad = outcome.context.get("bad").and_then(FieldValue::as_error).unwrap();
        assert_eq!(bad.kind, ErrorKind::Translation);
        assert_eq!(outcome.context.get("good"), Some(&FieldValue::Number(30.0)));
    }

    #[test]
    fn test_preview_leaves_charts_pending() {
        let fields = FieldSet::new()
            .chart("trend", ChartSpec::new("month", "revenue", ChartType::Line))
            .chart(
                "broken",
                ChartSpec {
                    x_column: Some("Month".into()),
                    ..Default::default()
                },
            );
        let outcome = sales().preview(&fields).unwrap();

        assert!(outcome.context.get("trend").unwrap().is_pending_chart());
        assert_eq!(
            outcome.context.get("broken").and_then(FieldValue::as_error).map(|e| e.kind),
            Some(ErrorKind::ChartConfig)
        );
        assert_eq!(outcome.chart_requests.len(), 1);
        assert_eq!(outcome.chart_requests[0].x_column, "Month");
        assert_eq!(outcome.stats.charts_requested, 1);
        assert_eq!(outcome.stats.charts_rendered, 0);
    }

    #[test]
    fn test_render_settles_charts() {
        let fields = FieldSet::new()
            .chart("ok", ChartSpec::new("Month", "Revenue", ChartType::Bar))
            .chart("fails", ChartSpec::new("Month", "Revenue", ChartType::Pie));

        let mut renderer = |req: &ChartRequest| -> Result<ImageRef, ChartError> {
            match req.chart_type {
                ChartType::Pie => Err(ChartError::render("pie backend missing")),
                _ => Ok(ImageRef::new(format!("charts/{}.png", req.field))),
            }
        };
        let outcome = sales().render(&fields, &mut renderer).unwrap();

        assert_eq!(
            outcome.context.get("ok"),
            Some(&FieldValue::Chart(ChartMarker::Rendered(ImageRef::new(
                "charts/ok.png"
            ))))
        );
        assert_eq!(
            outcome.context.get("fails").and_then(FieldValue::as_error).map(|e| e.kind),
            Some(ErrorKind::ChartRender)
        );
        assert!(!outcome.context.has_pending_charts());
        assert_eq!(outcome.stats.charts_rendered, 1);
    }

    #[test]
    fn test_render_mode_needs_renderer() {
        let fields = FieldSet::new();
        let dataset = sales();
        let pass = EvaluationPass::new(&dataset, &fields).with_options(PassOptions {
            mode: PassMode::Render,
            ..Default::default()
        });
        assert!(pass.run(None).is_err());
    }
}

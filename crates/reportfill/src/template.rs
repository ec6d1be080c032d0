//! Document templating
//!
//! The engine hands a finished [`FieldContext`] to a [`TemplateRenderer`]. [`TextTemplate`]
//! is the built-in renderer for plain-text templates with `{{ name }}` placeholders.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

use crate::FieldContext;

/// Template errors
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for template operations
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

/// Document assembly errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Charts not rendered: {}", .0.join(", "))]
    PendingCharts(Vec<String>),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Document-templating collaborator
pub trait TemplateRenderer {
    /// Rendered document type
    type Output;

    fn render(&self, context: &FieldContext) -> TemplateResult<Self::Output>;
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").expect("valid regex"))
}

/// Distinct placeholder names in a template, in first-seen order
pub fn template_variables(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in placeholder_regex().captures_iter(text) {
        let name = &caps[1];
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Plain-text template
///
/// Each `{{ name }}` is replaced by the field's value; unknown names become empty text and
/// chart images appear as their reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTemplate {
    source: String,
}

impl TextTemplate {
    pub fn new<S: Into<String>>(source: S) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Read a template file
    pub fn load<P: AsRef<Path>>(path: P) -> TemplateResult<Self> {
        Ok(Self::new(fs::read_to_string(path)?))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names used by this template
    pub fn variables(&self) -> Vec<String> {
        template_variables(&self.source)
    }
}

impl TemplateRenderer for TextTemplate {
    type Output = String;

    fn render(&self, context: &FieldContext) -> TemplateResult<String> {
        let rendered: Cow<'_, str> =
            placeholder_regex().replace_all(&self.source, |caps: &Captures<'_>| {
                context
                    .get(&caps[1])
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            });
        Ok(rendered.into_owned())
    }
}

/// Assemble a document from a finished context
///
/// Refuses a context that still holds pending charts; field errors render inline.
pub fn render_document<T: TemplateRenderer + ?Sized>(
    template: &T,
    context: &FieldContext,
) -> Result<T::Output, RenderError> {
    let pending: Vec<String> = context.pending_charts().map(str::to_string).collect();
    if !pending.is_empty() {
        return Err(RenderError::PendingCharts(pending));
    }
    Ok(template.render(context)?)
}

//! Resolved field values for one evaluation pass

use crate::value::Scalar;
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// Category of a per-field failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorKind {
    /// The formula could not be turned into an evaluable expression
    Translation,
    /// The expression failed while computing its value
    Evaluation,
    /// A chart field is missing axis or type configuration
    ChartConfig,
    /// The chart collaborator failed to produce an image
    ChartRender,
    /// The field lies on a dependency cycle
    Cycle,
}

impl ErrorKind {
    /// Short label used in messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Translation => "translation",
            ErrorKind::Evaluation => "evaluation",
            ErrorKind::ChartConfig => "chart_config",
            ErrorKind::ChartRender => "chart_render",
            ErrorKind::Cycle => "cycle",
        }
    }
}

/// Error value stored in place of a field's result
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ErrorMarker {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorMarker {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.message)
    }
}

/// Opaque reference to a rendered chart image
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new<S: Into<String>>(reference: S) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of a chart field
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ChartMarker {
    /// Configuration accepted; the image has not been produced yet
    Pending,
    /// Image produced by the chart collaborator
    Rendered(ImageRef),
}

/// Resolved value of a report field
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// No value (e.g. a mode over an empty column)
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    /// The field failed; the marker carries the reason
    Error(ErrorMarker),
    Chart(ChartMarker),
}

impl FieldValue {
    /// Create an error value
    pub fn error<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        FieldValue::Error(ErrorMarker::new(kind, message))
    }

    /// Check if this is an error marker
    pub fn is_error(&self) -> bool {
        matches!(self, FieldValue::Error(_))
    }

    /// Get the error marker if this is one
    pub fn as_error(&self) -> Option<&ErrorMarker> {
        match self {
            FieldValue::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Check if this is a chart that has not been rendered yet
    pub fn is_pending_chart(&self) -> bool {
        matches!(self, FieldValue::Chart(ChartMarker::Pending))
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get the value as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a plain value to a dataset scalar (errors and charts have none)
    pub fn to_scalar(&self) -> Option<Scalar> {
        match self {
            FieldValue::Empty => Some(Scalar::Null),
            FieldValue::Number(n) => Some(Scalar::Number(*n)),
            FieldValue::Text(s) => Some(Scalar::Text(s.clone())),
            FieldValue::Boolean(b) => Some(Scalar::Boolean(*b)),
            FieldValue::Error(_) | FieldValue::Chart(_) => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Empty => "empty",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Error(_) => "error",
            FieldValue::Chart(_) => "chart",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Empty => Ok(()),
            FieldValue::Number(n) => write!(f, "{}", Scalar::Number(*n)),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Boolean(b) => write!(f, "{}", Scalar::Boolean(*b)),
            FieldValue::Error(e) => write!(f, "{}", e),
            FieldValue::Chart(ChartMarker::Pending) => f.write_str("[chart pending]"),
            FieldValue::Chart(ChartMarker::Rendered(image)) => write!(f, "{}", image),
        }
    }
}

impl From<Scalar> for FieldValue {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Null => FieldValue::Empty,
            Scalar::Number(n) if n.is_nan() => FieldValue::Empty,
            Scalar::Number(n) => FieldValue::Number(n),
            Scalar::Boolean(b) => FieldValue::Boolean(b),
            Scalar::Text(s) => FieldValue::Text(s),
            date @ Scalar::Date(_) => FieldValue::Text(date.to_string()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for FieldValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        match self {
            FieldValue::Empty => serializer.serialize_none(),
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Boolean(b) => serializer.serialize_bool(*b),
            FieldValue::Error(e) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", e)?;
                map.end()
            }
            FieldValue::Chart(c) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("chart", c)?;
                map.end()
            }
        }
    }
}

/// Mapping from field name to resolved value, built up during one pass
///
/// Entries are only ever added; a pass owns its context and drops it when done.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FieldContext {
    values: BTreeMap<String, FieldValue>,
}

impl FieldContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field's value
    ///
    /// Returns `false` (and keeps the existing value) if the field was already resolved.
    pub fn insert<S: Into<String>>(&mut self, name: S, value: FieldValue) -> bool {
        match self.values.entry(name.into()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Replace a chart marker with its final state
    ///
    /// Only chart markers may be replaced; returns `false` otherwise.
    pub fn settle_chart(&mut self, name: &str, value: FieldValue) -> bool {
        match self.values.get_mut(name) {
            Some(slot) if slot.is_pending_chart() => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names of chart fields still waiting for an image
    pub fn pending_charts(&self) -> impl Iterator<Item = &str> + '_ {
        self.values
            .iter()
            .filter(|(_, v)| v.is_pending_chart())
            .map(|(k, _)| k.as_str())
    }

    /// Check whether any chart field is still pending
    pub fn has_pending_charts(&self) -> bool {
        self.pending_charts().next().is_some()
    }

    /// Number of error markers
    pub fn error_count(&self) -> usize {
        self.values.values().filter(|v| v.is_error()).count()
    }

    pub fn into_inner(self) -> BTreeMap<String, FieldValue> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_grows_monotonically() {
        let mut ctx = FieldContext::new();
        assert!(ctx.insert("total", FieldValue::Number(60.0)));
        assert!(!ctx.insert("total", FieldValue::Number(1.0)));
        assert_eq!(ctx.get("total"), Some(&FieldValue::Number(60.0)));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_settle_chart() {
        let mut ctx = FieldContext::new();
        ctx.insert("trend", FieldValue::Chart(ChartMarker::Pending));
        ctx.insert("total", FieldValue::Number(1.0));
        assert!(ctx.has_pending_charts());

        assert!(!ctx.settle_chart("total", FieldValue::Number(2.0)));
        assert!(ctx.settle_chart(
            "trend",
            FieldValue::Chart(ChartMarker::Rendered(ImageRef::new("trend.png")))
        ));
        assert!(!ctx.has_pending_charts());
        assert_eq!(ctx.get("trend").unwrap().to_string(), "trend.png");
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::Number(60.0).to_string(), "60");
        assert_eq!(FieldValue::Number(1.5).to_string(), "1.5");
        assert_eq!(
            FieldValue::error(ErrorKind::Evaluation, "Division by zero").to_string(),
            "Error: Division by zero"
        );
        assert_eq!(FieldValue::Empty.to_string(), "");
    }

    #[test]
    fn test_from_scalar() {
        assert_eq!(FieldValue::from(Scalar::Null), FieldValue::Empty);
        assert_eq!(FieldValue::from(Scalar::Number(f64::NAN)), FieldValue::Empty);
        assert_eq!(FieldValue::from(Scalar::from("x")), FieldValue::Text("x".into()));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize() {
        let mut ctx = FieldContext::new();
        ctx.insert("a", FieldValue::Number(1.5));
        ctx.insert("b", FieldValue::error(ErrorKind::Cycle, "cycle"));
        ctx.insert("c", FieldValue::Chart(ChartMarker::Pending));
        ctx.insert("d", FieldValue::Empty);

        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "a": 1.5,
                "b": {"error": {"kind": "cycle", "message": "cycle"}},
                "c": {"chart": "pending"},
                "d": null,
            })
        );
    }
}

//! Field settings persistence
//!
//! Settings files map field names to definitions, in definition order:
//!
//! ```json
//! {
//!   "total": {"kind": "formula", "expression": "SUM(revenue)"},
//!   "title": {"kind": "fixed", "value": "Q1"},
//!   "trend": {"kind": "chart", "chart": {"x_column": "Month", "y_column": "Revenue", "chart_type": "line"}},
//!   "legacy": "MEAN(revenue)"
//! }
//! ```
//!
//! A bare string is a formula. Saving always writes the structured form.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::fields::{Field, FieldKind, FieldSet};
use crate::{ChartSpec, Scalar};

/// Settings persistence errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for settings operations
pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

/// Structured form of one definition
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum StoredKind {
    Formula { expression: String },
    Fixed { value: Scalar },
    Chart { chart: ChartSpec },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredField {
    Legacy(String),
    Structured(StoredKind),
}

impl From<StoredField> for FieldKind {
    fn from(stored: StoredField) -> Self {
        match stored {
            StoredField::Legacy(expression) => FieldKind::Formula(expression),
            StoredField::Structured(StoredKind::Formula { expression }) => {
                FieldKind::Formula(expression)
            }
            StoredField::Structured(StoredKind::Fixed { value }) => FieldKind::Fixed(value),
            StoredField::Structured(StoredKind::Chart { chart }) => FieldKind::Chart(chart),
        }
    }
}

impl From<&FieldKind> for StoredKind {
    fn from(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::Formula(expression) => StoredKind::Formula {
                expression: expression.clone(),
            },
            FieldKind::Fixed(value) => StoredKind::Fixed {
                value: value.clone(),
            },
            FieldKind::Chart(chart) => StoredKind::Chart {
                chart: chart.clone(),
            },
        }
    }
}

impl Serialize for FieldSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for field in self {
            map.serialize_entry(&field.name, &StoredKind::from(&field.kind))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldSetVisitor;

        impl<'de> Visitor<'de> for FieldSetVisitor {
            type Value = FieldSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldSet, A::Error> {
                let mut fields = FieldSet::new();
                while let Some((name, stored)) = access.next_entry::<String, StoredField>()? {
                    if fields.contains(&name) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate field '{}'",
                            name
                        )));
                    }
                    fields.insert(Field::new(name, stored.into()));
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldSetVisitor)
    }
}

/// Parse settings from JSON text
pub fn parse_settings(json: &str) -> SettingsResult<FieldSet> {
    Ok(serde_json::from_str(json)?)
}

/// Write settings as pretty JSON text
pub fn settings_to_string(fields: &FieldSet) -> SettingsResult<String> {
    Ok(serde_json::to_string_pretty(fields)?)
}

/// Load settings from a file; a missing file is an empty field set
pub fn load_settings<P: AsRef<Path>>(path: P) -> SettingsResult<FieldSet> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(text) => parse_settings(&text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("no settings at {}, starting empty", path.display());
            Ok(FieldSet::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Save settings to a file
pub fn save_settings<P: AsRef<Path>>(fields: &FieldSet, path: P) -> SettingsResult<()> {
    fs::write(path, settings_to_string(fields)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChartType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_mixed_forms() {
        let fields = parse_settings(
            r#"{
                "zeta": "SUM(revenue)",
                "alpha": {"kind": "formula", "expression": "zeta / 2"},
                "title": {"kind": "fixed", "value": "Q1"},
                "count": {"kind": "fixed", "value": 3},
                "trend": {"kind": "chart", "chart": {"x_column": "Month", "y_column": "Revenue", "chart_type": "line"}}
            }"#,
        )
        .unwrap();

        assert_eq!(
            fields,
            FieldSet::new()
                .formula("zeta", "SUM(revenue)")
                .formula("alpha", "zeta / 2")
                .fixed("title", "Q1")
                .fixed("count", 3.0)
                .chart("trend", ChartSpec::new("Month", "Revenue", ChartType::Line))
        );
    }

    #[test]
    fn test_save_writes_structured_form() {
        let fields = parse_settings(r#"{"total": "SUM(x)"}"#).unwrap();
        let json = settings_to_string(&fields).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(
            value,
            serde_json::json!({"total": {"kind": "formula", "expression": "SUM(x)"}})
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = parse_settings(r#"{"a": "1", "a": "2"}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate field 'a'"));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(parse_settings(r#"{"a": {"kind": "macro"}}"#).is_err());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let fields = load_settings(dir.path().join("settings.json")).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn test_file_round_trip_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let fields = FieldSet::new()
            .formula("z", "1")
            .fixed("m", true)
            .formula("a", "z + 1");

        save_settings(&fields, &path).unwrap();
        let loaded = load_settings(&path).unwrap();

        assert_eq!(loaded.names().collect::<Vec<_>>(), vec!["z", "m", "a"]);
        assert_eq!(loaded, fields);
    }
}

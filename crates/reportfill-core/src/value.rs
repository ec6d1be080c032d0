//! Scalar value types

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use std::cmp::Ordering;
use std::fmt;

/// Date-time layouts accepted when reading text as a date
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Date-only layouts accepted when reading text as a date
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// A single typed value stored in a dataset cell
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Scalar {
    /// Missing value
    #[default]
    Null,

    /// Boolean value
    Boolean(bool),

    /// Numeric value (all numbers stored as f64)
    Number(f64),

    /// Text value
    Text(String),

    /// Date or date-time value
    Date(NaiveDateTime),
}

impl Scalar {
    /// Create a new text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        Scalar::Text(s.into())
    }

    /// Check if the value is missing (null or NaN)
    pub fn is_null(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Boolean(true) => Some(1.0),
            Scalar::Boolean(false) => Some(0.0),
            _ => None,
        }
    }

    /// Try to get the value as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the value as a date-time
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Scalar::Date(d) => Some(*d),
            Scalar::Text(s) => parse_date_text(s),
            _ => None,
        }
    }

    /// Truthiness used by logical operators and conditional counts
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Null => false,
            Scalar::Boolean(b) => *b,
            Scalar::Number(n) => *n != 0.0 && !n.is_nan(),
            Scalar::Text(s) => !s.is_empty(),
            Scalar::Date(_) => true,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Boolean(_) => "boolean",
            Scalar::Number(_) => "number",
            Scalar::Text(_) => "text",
            Scalar::Date(_) => "date",
        }
    }

    /// Compare two values of compatible types
    ///
    /// Numbers and booleans compare numerically, text compares lexically, and dates compare
    /// with dates or with text that reads as a date. Returns `None` for nulls and for
    /// incompatible types.
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Null, _) | (_, Scalar::Null) => None,
            (Scalar::Text(a), Scalar::Text(b)) => Some(a.cmp(b)),
            (Scalar::Date(a), Scalar::Date(b)) => Some(a.cmp(b)),
            (Scalar::Date(a), Scalar::Text(b)) => parse_date_text(b).map(|b| a.cmp(&b)),
            (Scalar::Text(a), Scalar::Date(b)) => parse_date_text(a).map(|a| a.cmp(b)),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, ""),
            Scalar::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Scalar::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Scalar::Text(s) => write!(f, "{}", s),
            Scalar::Date(d) => {
                if d.time().num_seconds_from_midnight() == 0 {
                    write!(f, "{}", d.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Boolean(b)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar::Number(n as f64)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(n as f64)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::text(s)
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<NaiveDateTime> for Scalar {
    fn from(d: NaiveDateTime) -> Self {
        Scalar::Date(d)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(d: NaiveDate) -> Self {
        Scalar::Date(d.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Scalar::Null, Into::into)
    }
}

/// Read text as a date or date-time
///
/// Accepts RFC 3339 timestamps, ISO-like date-times and a handful of common date layouts.
pub fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date.and_time(chrono::NaiveTime::MIN));
        }
    }

    None
}

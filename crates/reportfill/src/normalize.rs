//! Output normalization
//!
//! Turns an evaluator result into the plain value stored in the field context.

use crate::{FieldValue, FormulaError, FormulaResult, FormulaValue, Scalar};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Normalize an evaluator result
///
/// A column yields its first element (or nothing when empty). Numbers are rounded half away
/// from zero to `decimal_places`; infinities are errors. Dates become ISO text.
pub fn normalize(value: FormulaValue, decimal_places: u32) -> FormulaResult<FieldValue> {
    match value.into_first() {
        Scalar::Number(n) if n.is_nan() => Ok(FieldValue::Empty),
        Scalar::Number(n) if n.is_infinite() => Err(FormulaError::Evaluation(
            "Result is not a finite number".to_string(),
        )),
        Scalar::Number(n) => Ok(FieldValue::Number(round_half_away(n, decimal_places))),
        other => Ok(FieldValue::from(other)),
    }
}

/// Round in decimal so that e.g. `2.675` becomes `2.68`
pub fn round_half_away(n: f64, decimal_places: u32) -> f64 {
    Decimal::from_f64(n)
        .map(|d| d.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_half_away(2.675, 2), 2.68);
        assert_eq!(round_half_away(-2.675, 2), -2.68);
        assert_eq!(round_half_away(0.125, 2), 0.13);
        assert_eq!(round_half_away(1.5, 0), 2.0);
        assert_eq!(round_half_away(1.23456, 3), 1.235);
    }

    #[test]
    fn test_normalize_scalars() {
        assert_eq!(
            normalize(FormulaValue::number(1.0 / 3.0), 2).unwrap(),
            FieldValue::Number(0.33)
        );
        assert_eq!(
            normalize(FormulaValue::text("ok"), 2).unwrap(),
            FieldValue::Text("ok".into())
        );
        assert_eq!(
            normalize(FormulaValue::Scalar(Scalar::Boolean(true)), 2).unwrap(),
            FieldValue::Boolean(true)
        );
        assert_eq!(
            normalize(FormulaValue::Scalar(Scalar::Null), 2).unwrap(),
            FieldValue::Empty
        );
        assert_eq!(
            normalize(FormulaValue::number(f64::NAN), 2).unwrap(),
            FieldValue::Empty
        );
    }

    #[test]
    fn test_normalize_dates_as_iso_text() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            normalize(FormulaValue::Scalar(Scalar::from(date)), 2).unwrap(),
            FieldValue::Text("2024-03-01".into())
        );
    }

    #[test]
    fn test_normalize_columns() {
        let column = FormulaValue::Column(vec![Scalar::from(1.006), Scalar::from(9.0)]);
        assert_eq!(normalize(column, 2).unwrap(), FieldValue::Number(1.01));
        assert_eq!(
            normalize(FormulaValue::Column(Vec::new()), 2).unwrap(),
            FieldValue::Empty
        );
    }

    #[test]
    fn test_normalize_infinity_is_an_error() {
        let err = normalize(FormulaValue::number(f64::INFINITY), 2).unwrap_err();
        assert_eq!(err.category(), crate::ErrorKind::Evaluation);
    }
}

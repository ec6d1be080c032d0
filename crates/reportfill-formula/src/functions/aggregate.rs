//! Aggregate functions: reduce a series to a single value
//!
//! Nulls are skipped everywhere. STD and VAR are sample statistics (n - 1 denominator).

use super::{as_series, numeric_values, require_values, Function};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use ahash::{AHashMap, AHashSet};
use chrono::NaiveDateTime;
use reportfill_core::Scalar;
use std::cmp::Ordering;

/// Hashable identity of a non-null value, used for distinct counts and modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ValueKey<'a> {
    Boolean(bool),
    Number(u64),
    Text(&'a str),
    Date(NaiveDateTime),
}

impl<'a> ValueKey<'a> {
    fn of(value: &'a Scalar) -> Option<Self> {
        match value {
            Scalar::Null => None,
            Scalar::Boolean(b) => Some(ValueKey::Boolean(*b)),
            Scalar::Number(n) if n.is_nan() => None,
            // -0.0 and 0.0 are the same value
            Scalar::Number(n) => Some(ValueKey::Number((*n + 0.0).to_bits())),
            Scalar::Text(s) => Some(ValueKey::Text(s)),
            Scalar::Date(d) => Some(ValueKey::Date(*d)),
        }
    }
}

/// COUNT(x) - Counts the non-null values
pub fn fn_count(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = as_series(&args[0]).iter().filter(|v| !v.is_null()).count();
    Ok(FormulaValue::number(count as f64))
}

/// COUNT(DISTINCT(x)) - Counts the distinct non-null values
pub fn fn_count_distinct(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let distinct: AHashSet<ValueKey> = as_series(&args[0]).iter().filter_map(ValueKey::of).collect();
    Ok(FormulaValue::number(distinct.len() as f64))
}

/// COUNT(condition) - Counts the rows where the condition holds
pub fn fn_count_where(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let count = as_series(&args[0]).iter().filter(|v| v.is_truthy()).count();
    Ok(FormulaValue::number(count as f64))
}

/// MODE(x) - Returns the most frequent value
///
/// Ties resolve to the smallest value. Returns null when there are no values.
pub fn fn_mode(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    // Frequencies in first-seen order
    let mut index: AHashMap<ValueKey, usize> = AHashMap::new();
    let mut counts: Vec<(&Scalar, usize)> = Vec::new();

    for value in as_series(&args[0]) {
        if let Some(key) = ValueKey::of(value) {
            match index.get(&key) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(key, counts.len());
                    counts.push((value, 1));
                }
            }
        }
    }

    let max_count = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);
    let mode = counts
        .iter()
        .filter(|(_, c)| *c == max_count)
        .map(|(v, _)| *v)
        .reduce(|best, candidate| match candidate.compare(best) {
            Some(Ordering::Less) => candidate,
            _ => best,
        });

    Ok(FormulaValue::Scalar(mode.cloned().unwrap_or_default()))
}

/// SUM(x) - Adds the values; the sum of no values is 0
pub fn fn_sum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = numeric_values(Function::Sum, &args[0])?;
    Ok(FormulaValue::number(numbers.iter().sum()))
}

/// MEAN(x) - Arithmetic mean
pub fn fn_mean(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = numeric_values(Function::Mean, &args[0])?;
    require_values(Function::Mean, &numbers, 1)?;
    Ok(FormulaValue::number(mean(&numbers)))
}

/// MAX(x) - Largest value (numbers, text or dates)
pub fn fn_max(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    extreme(Function::Max, &args[0], Ordering::Greater)
}

/// MIN(x) - Smallest value (numbers, text or dates)
pub fn fn_min(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    extreme(Function::Min, &args[0], Ordering::Less)
}

/// MEDIAN(x) - Middle value; the mean of the two middle values for an even count
pub fn fn_median(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut numbers = numeric_values(Function::Median, &args[0])?;
    require_values(Function::Median, &numbers, 1)?;

    numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let len = numbers.len();
    let median = if len % 2 == 1 {
        numbers[len / 2]
    } else {
        (numbers[len / 2 - 1] + numbers[len / 2]) / 2.0
    };

    Ok(FormulaValue::number(median))
}

/// STD(x) - Sample standard deviation
pub fn fn_std(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = numeric_values(Function::Std, &args[0])?;
    require_values(Function::Std, &numbers, 2)?;
    Ok(FormulaValue::number(sample_variance(&numbers).sqrt()))
}

/// VAR(x) - Sample variance
pub fn fn_var(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = numeric_values(Function::Var, &args[0])?;
    require_values(Function::Var, &numbers, 2)?;
    Ok(FormulaValue::number(sample_variance(&numbers)))
}

fn mean(numbers: &[f64]) -> f64 {
    numbers.iter().sum::<f64>() / numbers.len() as f64
}

fn sample_variance(numbers: &[f64]) -> f64 {
    let mean = mean(numbers);
    let sum_sq: f64 = numbers.iter().map(|n| (n - mean).powi(2)).sum();
    sum_sq / (numbers.len() - 1) as f64
}

/// Pick the value that orders `wanted` against all others
fn extreme(
    function: Function,
    arg: &FormulaValue,
    wanted: Ordering,
) -> FormulaResult<FormulaValue> {
    let mut best: Option<&Scalar> = None;

    for value in as_series(arg).iter().filter(|v| !v.is_null()) {
        best = match best {
            None => Some(value),
            Some(current) => match value.compare(current) {
                Some(ord) if ord == wanted => Some(value),
                Some(_) => Some(current),
                None => {
                    return Err(FormulaError::TypeMismatch(format!(
                        "{} cannot compare {} with {}",
                        function,
                        value.type_name(),
                        current.type_name()
                    )))
                }
            },
        };
    }

    match best {
        Some(value) => Ok(FormulaValue::Scalar(value.clone())),
        None => Err(FormulaError::EmptySeries {
            function: function.name(),
            required: 1,
            actual: 0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reportfill_core::{Dataset, FieldContext};

    fn column(values: Vec<Scalar>) -> Vec<FormulaValue> {
        vec![FormulaValue::Column(values)]
    }

    fn numbers(values: &[f64]) -> Vec<FormulaValue> {
        column(values.iter().map(|n| Scalar::from(*n)).collect())
    }

    fn call(
        f: fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>,
        args: Vec<FormulaValue>,
    ) -> FormulaResult<FormulaValue> {
        let dataset = Dataset::new();
        let fields = FieldContext::new();
        let ctx = EvaluationContext::new(&dataset, &fields);
        f(&args, &ctx)
    }

    #[test]
    fn test_count_skips_nulls() {
        let args = column(vec![Scalar::from(1.0), Scalar::Null, Scalar::from("x")]);
        assert_eq!(call(fn_count, args).unwrap(), FormulaValue::number(2.0));
    }

    #[test]
    fn test_count_distinct() {
        let args = column(vec![
            Scalar::from("a"),
            Scalar::from("b"),
            Scalar::from("a"),
            Scalar::Null,
        ]);
        assert_eq!(
            call(fn_count_distinct, args).unwrap(),
            FormulaValue::number(2.0)
        );
    }

    #[test]
    fn test_count_where() {
        let args = column(vec![
            Scalar::from(true),
            Scalar::from(false),
            Scalar::from(true),
        ]);
        assert_eq!(call(fn_count_where, args).unwrap(), FormulaValue::number(2.0));
    }

    #[test]
    fn test_mode_ties_pick_smallest() {
        let args = numbers(&[3.0, 1.0, 3.0, 1.0, 2.0]);
        assert_eq!(call(fn_mode, args).unwrap(), FormulaValue::number(1.0));

        let args = column(vec![Scalar::from("b"), Scalar::from("a"), Scalar::from("b")]);
        assert_eq!(
            call(fn_mode, args).unwrap(),
            FormulaValue::Scalar(Scalar::from("b"))
        );

        assert_eq!(
            call(fn_mode, column(vec![])).unwrap(),
            FormulaValue::Scalar(Scalar::Null)
        );
    }

    #[test]
    fn test_sum_and_mean() {
        assert_eq!(
            call(fn_sum, numbers(&[10.0, 20.0, 30.0])).unwrap(),
            FormulaValue::number(60.0)
        );
        assert_eq!(call(fn_sum, numbers(&[])).unwrap(), FormulaValue::number(0.0));
        assert_eq!(
            call(fn_mean, numbers(&[1.0, 2.0])).unwrap(),
            FormulaValue::number(1.5)
        );
        assert!(matches!(
            call(fn_mean, numbers(&[])),
            Err(FormulaError::EmptySeries { function: "MEAN", .. })
        ));
    }

    #[test]
    fn test_sum_rejects_text() {
        let args = column(vec![Scalar::from(1.0), Scalar::from("x")]);
        assert!(matches!(
            call(fn_sum, args),
            Err(FormulaError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_max_min() {
        assert_eq!(
            call(fn_max, numbers(&[3.0, 9.0, 1.0])).unwrap(),
            FormulaValue::number(9.0)
        );
        assert_eq!(
            call(fn_min, numbers(&[3.0, 9.0, 1.0])).unwrap(),
            FormulaValue::number(1.0)
        );

        let args = column(vec![Scalar::from("pear"), Scalar::from("apple")]);
        assert_eq!(
            call(fn_min, args).unwrap(),
            FormulaValue::Scalar(Scalar::from("apple"))
        );

        let mixed = column(vec![Scalar::from("pear"), Scalar::from(1.0)]);
        assert!(matches!(
            call(fn_max, mixed),
            Err(FormulaError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_median() {
        assert_eq!(
            call(fn_median, numbers(&[5.0, 1.0, 3.0])).unwrap(),
            FormulaValue::number(3.0)
        );
        assert_eq!(
            call(fn_median, numbers(&[4.0, 1.0, 3.0, 2.0])).unwrap(),
            FormulaValue::number(2.5)
        );
    }

    #[test]
    fn test_std_var_sample() {
        let var = call(fn_var, numbers(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]))
            .unwrap()
            .as_number()
            .unwrap();
        assert!((var - 4.571428571428571).abs() < 1e-12);

        let std = call(fn_std, numbers(&[1.0, 3.0])).unwrap().as_number().unwrap();
        assert!((std - 2f64.sqrt()).abs() < 1e-12);

        assert!(matches!(
            call(fn_std, numbers(&[1.0])),
            Err(FormulaError::EmptySeries { required: 2, .. })
        ));
    }
}

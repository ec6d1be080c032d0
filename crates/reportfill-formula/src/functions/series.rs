//! Series functions: compare the first and last observations of a series
//!
//! First and last follow the dataset's row order and skip nulls.

use super::{numeric_values, Function};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};

/// First and last non-null numbers of an argument
fn endpoints(function: Function, arg: &FormulaValue) -> FormulaResult<(f64, f64)> {
    let numbers = numeric_values(function, arg)?;
    match (numbers.first(), numbers.last()) {
        (Some(&first), Some(&last)) => Ok((first, last)),
        _ => Err(FormulaError::EmptySeries {
            function: function.name(),
            required: 1,
            actual: 0,
        }),
    }
}

/// PERCENT_CHANGE(x) - (last - first) / first * 100
pub fn fn_percent_change(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let (first, last) = endpoints(Function::PercentChange, &args[0])?;
    if first == 0.0 {
        return Err(FormulaError::DivisionByZero);
    }
    Ok(FormulaValue::number((last - first) / first * 100.0))
}

/// DIFF(x) - last - first
pub fn fn_diff(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (first, last) = endpoints(Function::Diff, &args[0])?;
    Ok(FormulaValue::number(last - first))
}

/// CAGR(start, end, periods) - (last(end) / first(start)) ^ (1 / periods) - 1
pub fn fn_cagr(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (start, _) = endpoints(Function::Cagr, &args[0])?;
    let (_, end) = endpoints(Function::Cagr, &args[1])?;
    let (periods, _) = endpoints(Function::Cagr, &args[2])?;

    if start == 0.0 || periods == 0.0 {
        return Err(FormulaError::DivisionByZero);
    }

    let growth = (end / start).powf(1.0 / periods) - 1.0;
    if !growth.is_finite() {
        return Err(FormulaError::Evaluation(format!(
            "CAGR is undefined for start {} and end {} over {} periods",
            start, end, periods
        )));
    }
    Ok(FormulaValue::number(growth))
}

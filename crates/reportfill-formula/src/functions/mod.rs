//! Built-in report functions
//!
//! The formula language has a closed set of functions: aggregates that reduce a series to
//! one value, and series functions that compare the first and last observations.

pub mod aggregate;
pub mod series;

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use reportfill_core::Scalar;
use std::collections::HashMap;
use std::fmt;

/// Function implementation signature
pub type FunctionImpl = fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// Functions known to the formula language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// `COUNT(x)`: non-null values
    Count,
    /// `COUNT(DISTINCT(x))`: distinct non-null values
    CountDistinct,
    /// `COUNT(condition)`: rows where the condition holds
    CountWhere,
    Mode,
    Sum,
    Mean,
    Max,
    Min,
    Median,
    Std,
    Var,
    PercentChange,
    Diff,
    Cagr,
}

impl Function {
    /// Look up a function by the name written in a formula (case-insensitive)
    ///
    /// `CountDistinct` and `CountWhere` have no name of their own; the parser derives them
    /// from the shape of a `COUNT` call.
    pub fn from_name(name: &str) -> Option<Function> {
        let function = match name.to_ascii_uppercase().as_str() {
            "COUNT" => Function::Count,
            "MODE" => Function::Mode,
            "SUM" => Function::Sum,
            "MEAN" => Function::Mean,
            "MAX" => Function::Max,
            "MIN" => Function::Min,
            "MEDIAN" => Function::Median,
            "STD" => Function::Std,
            "VAR" => Function::Var,
            "PERCENT_CHANGE" => Function::PercentChange,
            "DIFF" => Function::Diff,
            "CAGR" => Function::Cagr,
            _ => return None,
        };
        Some(function)
    }

    /// Name used in messages
    pub fn name(&self) -> &'static str {
        match self {
            Function::Count | Function::CountDistinct | Function::CountWhere => "COUNT",
            Function::Mode => "MODE",
            Function::Sum => "SUM",
            Function::Mean => "MEAN",
            Function::Max => "MAX",
            Function::Min => "MIN",
            Function::Median => "MEDIAN",
            Function::Std => "STD",
            Function::Var => "VAR",
            Function::PercentChange => "PERCENT_CHANGE",
            Function::Diff => "DIFF",
            Function::Cagr => "CAGR",
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Function definition
pub struct FunctionDef {
    pub function: Function,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

/// Function registry
pub struct FunctionRegistry {
    functions: HashMap<Function, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register_aggregate_functions();
        registry.register_series_functions();

        registry
    }

    /// Look up a function definition
    pub fn get(&self, function: Function) -> Option<&FunctionDef> {
        self.functions.get(&function)
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.function, def);
    }

    fn register_unary(&mut self, function: Function, implementation: FunctionImpl) {
        self.register(FunctionDef {
            function,
            min_args: 1,
            max_args: Some(1),
            implementation,
        });
    }

    fn register_aggregate_functions(&mut self) {
        self.register_unary(Function::Count, aggregate::fn_count);
        self.register_unary(Function::CountDistinct, aggregate::fn_count_distinct);
        self.register_unary(Function::CountWhere, aggregate::fn_count_where);
        self.register_unary(Function::Mode, aggregate::fn_mode);
        self.register_unary(Function::Sum, aggregate::fn_sum);
        self.register_unary(Function::Mean, aggregate::fn_mean);
        self.register_unary(Function::Max, aggregate::fn_max);
        self.register_unary(Function::Min, aggregate::fn_min);
        self.register_unary(Function::Median, aggregate::fn_median);
        self.register_unary(Function::Std, aggregate::fn_std);
        self.register_unary(Function::Var, aggregate::fn_var);
    }

    fn register_series_functions(&mut self) {
        self.register_unary(Function::PercentChange, series::fn_percent_change);
        self.register_unary(Function::Diff, series::fn_diff);

        // CAGR(start, end, periods)
        self.register(FunctionDef {
            function: Function::Cagr,
            min_args: 3,
            max_args: Some(3),
            implementation: series::fn_cagr,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// === Shared argument helpers ===

/// View an argument as a series; a scalar is a one-element series
pub(crate) fn as_series(arg: &FormulaValue) -> &[Scalar] {
    match arg {
        FormulaValue::Scalar(s) => std::slice::from_ref(s),
        FormulaValue::Column(values) => values,
    }
}

/// Collect the non-null values of a series as numbers
pub(crate) fn numeric_values(function: Function, arg: &FormulaValue) -> FormulaResult<Vec<f64>> {
    let mut numbers = Vec::new();
    for value in as_series(arg).iter().filter(|v| !v.is_null()) {
        match value.as_number() {
            Some(n) => numbers.push(n),
            None => {
                return Err(FormulaError::TypeMismatch(format!(
                    "{} expects numbers, found {}",
                    function,
                    value.type_name()
                )))
            }
        }
    }
    Ok(numbers)
}

/// Fail with `EmptySeries` when fewer than `required` values are present
pub(crate) fn require_values(
    function: Function,
    values: &[f64],
    required: usize,
) -> FormulaResult<()> {
    if values.len() < required {
        return Err(FormulaError::EmptySeries {
            function: function.name(),
            required,
            actual: values.len(),
        });
    }
    Ok(())
}

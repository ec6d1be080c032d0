//! Formula evaluator
//!
//! Evaluates formula ASTs against a dataset and the fields resolved so far. Column
//! references evaluate to whole series; operators apply row-wise and broadcast scalars.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{Function, FunctionRegistry};
use crate::lexer::{tokenize, Token};
use crate::parser::parse_formula;
use reportfill_core::{Dataset, FieldContext, FieldValue, Scalar};
use std::cmp::Ordering;
use std::sync::OnceLock;

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

fn get_function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    /// A single value
    Scalar(Scalar),
    /// One value per dataset row
    Column(Vec<Scalar>),
}

impl FormulaValue {
    /// Create a numeric scalar
    pub fn number(n: f64) -> Self {
        FormulaValue::Scalar(Scalar::Number(n))
    }

    /// Create a text scalar
    pub fn text<S: Into<String>>(s: S) -> Self {
        FormulaValue::Scalar(Scalar::Text(s.into()))
    }

    /// Get the scalar, if this is not a column
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            FormulaValue::Scalar(s) => Some(s),
            FormulaValue::Column(_) => None,
        }
    }

    /// Convert a scalar to number, if possible
    pub fn as_number(&self) -> Option<f64> {
        self.as_scalar().and_then(Scalar::as_number)
    }

    /// Check if this is a column
    pub fn is_column(&self) -> bool {
        matches!(self, FormulaValue::Column(_))
    }

    /// Reduce to one scalar: a column yields its first element, or null when empty
    pub fn into_first(self) -> Scalar {
        match self {
            FormulaValue::Scalar(s) => s,
            FormulaValue::Column(values) => values.into_iter().next().unwrap_or_default(),
        }
    }
}

impl From<Scalar> for FormulaValue {
    fn from(value: Scalar) -> Self {
        FormulaValue::Scalar(value)
    }
}

/// Context for formula evaluation
///
/// Formulas can see only the dataset and the fields resolved earlier in the pass.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Rows the formula aggregates over
    pub dataset: &'a Dataset,
    /// Field values resolved so far
    pub fields: &'a FieldContext,
}

impl<'a> EvaluationContext<'a> {
    /// Create a new evaluation context
    pub fn new(dataset: &'a Dataset, fields: &'a FieldContext) -> Self {
        Self { dataset, fields }
    }

    /// Resolve a free identifier
    ///
    /// Fields shadow columns. A field holding an error marker fails the reference; column
    /// names match case-insensitively.
    pub fn resolve_name(&self, name: &str) -> FormulaResult<FormulaValue> {
        if let Some(value) = self.fields.get(name) {
            return match value {
                FieldValue::Error(marker) => Err(FormulaError::DependencyFailed {
                    field: name.to_string(),
                    message: marker.message.clone(),
                }),
                FieldValue::Chart(_) => Err(FormulaError::TypeMismatch(format!(
                    "field '{}' is a chart and has no value",
                    name
                ))),
                other => Ok(FormulaValue::Scalar(other.to_scalar().unwrap_or_default())),
            };
        }

        self.dataset
            .column(name)
            .map(|column| FormulaValue::Column(column.values().to_vec()))
            .ok_or_else(|| FormulaError::UnknownIdentifier(name.to_string()))
    }
}

/// Return the text of a formula that is a single quoted literal
///
/// A formula that is exactly one string token is a literal, as is one wrapped in single
/// quotes that does not parse as an expression: `'it's fixed'` yields `it's fixed`. A
/// quoted formula that does parse, such as `'a' + label`, is an expression.
pub fn quoted_literal(formula: &str) -> Option<String> {
    let formula = formula.trim();
    if formula.len() < 2 || !formula.starts_with('\'') || !formula.ends_with('\'') {
        return None;
    }
    if let Ok(tokens) = tokenize(formula) {
        if let [Token::String(text), Token::Eof] = tokens.as_slice() {
            return Some(text.clone());
        }
    }
    if parse_formula(formula).is_ok() {
        return None;
    }
    Some(formula[1..formula.len() - 1].to_string())
}

/// Translate and evaluate formula text
///
/// # Example
/// ```rust
/// use reportfill_core::{Dataset, FieldContext, Scalar};
/// use reportfill_formula::{evaluate_formula, EvaluationContext, FormulaValue};
///
/// let dataset = Dataset::from_columns(vec![(
///     "Revenue",
///     vec![Scalar::from(10.0), Scalar::from(20.0), Scalar::from(30.0)],
/// )])
/// .unwrap();
/// let fields = FieldContext::new();
/// let ctx = EvaluationContext::new(&dataset, &fields);
///
/// assert_eq!(
///     evaluate_formula("SUM(revenue)", &ctx).unwrap(),
///     FormulaValue::number(60.0)
/// );
/// ```
pub fn evaluate_formula(formula: &str, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if let Some(text) = quoted_literal(formula) {
        return Ok(FormulaValue::text(text));
    }
    let ast = parse_formula(formula)?;
    evaluate(&ast, ctx)
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => Ok(FormulaValue::number(*n)),
        FormulaExpr::String(s) => Ok(FormulaValue::text(s.clone())),
        FormulaExpr::Boolean(b) => Ok(FormulaValue::Scalar(Scalar::Boolean(*b))),

        // === References ===
        FormulaExpr::NameRef(name) => ctx.resolve_name(name),

        // === Operators ===
        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),

        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        // === Functions ===
        FormulaExpr::Function { function, args } => evaluate_function(*function, args, ctx),
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    // Evaluate operands first
    let left_val = evaluate(left, ctx)?;
    let right_val = evaluate(right, ctx)?;

    broadcast(left_val, right_val, |l, r| apply_binary(op, l, r))
}

/// Apply `f` row-wise, repeating a scalar operand against every row of a column
fn broadcast<F>(left: FormulaValue, right: FormulaValue, f: F) -> FormulaResult<FormulaValue>
where
    F: Fn(&Scalar, &Scalar) -> FormulaResult<Scalar>,
{
    match (left, right) {
        (FormulaValue::Scalar(l), FormulaValue::Scalar(r)) => f(&l, &r).map(FormulaValue::Scalar),
        (FormulaValue::Column(l), FormulaValue::Scalar(r)) => l
            .iter()
            .map(|l| f(l, &r))
            .collect::<FormulaResult<Vec<_>>>()
            .map(FormulaValue::Column),
        (FormulaValue::Scalar(l), FormulaValue::Column(r)) => r
            .iter()
            .map(|r| f(&l, r))
            .collect::<FormulaResult<Vec<_>>>()
            .map(FormulaValue::Column),
        (FormulaValue::Column(l), FormulaValue::Column(r)) => {
            if l.len() != r.len() {
                return Err(FormulaError::LengthMismatch {
                    left: l.len(),
                    right: r.len(),
                });
            }
            l.iter()
                .zip(r.iter())
                .map(|(l, r)| f(l, r))
                .collect::<FormulaResult<Vec<_>>>()
                .map(FormulaValue::Column)
        }
    }
}

fn apply_binary(op: BinaryOperator, l: &Scalar, r: &Scalar) -> FormulaResult<Scalar> {
    match op {
        // Logical operators
        BinaryOperator::And => Ok(Scalar::Boolean(l.is_truthy() && r.is_truthy())),
        BinaryOperator::Or => Ok(Scalar::Boolean(l.is_truthy() || r.is_truthy())),

        // Equality never fails: nulls and mismatched types are simply unequal
        BinaryOperator::Equal => Ok(Scalar::Boolean(values_equal(l, r))),
        BinaryOperator::NotEqual => Ok(Scalar::Boolean(!values_equal(l, r))),

        // Ordering comparisons
        BinaryOperator::LessThan
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterEqual => {
            if l.is_null() || r.is_null() {
                return Ok(Scalar::Boolean(false));
            }
            let ord = l.compare(r).ok_or_else(|| {
                FormulaError::TypeMismatch(format!(
                    "cannot compare {} with {} using '{}'",
                    l.type_name(),
                    r.type_name(),
                    op.symbol()
                ))
            })?;
            let result = match op {
                BinaryOperator::LessThan => ord == Ordering::Less,
                BinaryOperator::LessEqual => ord != Ordering::Greater,
                BinaryOperator::GreaterThan => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            };
            Ok(Scalar::Boolean(result))
        }

        // Arithmetic operators
        _ => apply_arithmetic(op, l, r),
    }
}

fn values_equal(l: &Scalar, r: &Scalar) -> bool {
    l.compare(r) == Some(Ordering::Equal)
}

fn apply_arithmetic(op: BinaryOperator, l: &Scalar, r: &Scalar) -> FormulaResult<Scalar> {
    // Nulls propagate
    if l.is_null() || r.is_null() {
        return Ok(Scalar::Null);
    }

    // Text + text concatenates
    if let (BinaryOperator::Add, Scalar::Text(a), Scalar::Text(b)) = (op, l, r) {
        return Ok(Scalar::Text(format!("{}{}", a, b)));
    }

    let (a, b) = match (l.as_number(), r.as_number()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(FormulaError::TypeMismatch(format!(
                "cannot apply '{}' to {} and {}",
                op.symbol(),
                l.type_name(),
                r.type_name()
            )))
        }
    };

    let result = match op {
        BinaryOperator::Add => a + b,
        BinaryOperator::Subtract => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide => {
            if b == 0.0 {
                return Err(FormulaError::DivisionByZero);
            }
            a / b
        }
        BinaryOperator::Modulo => {
            if b == 0.0 {
                return Err(FormulaError::DivisionByZero);
            }
            // Result takes the sign of the divisor
            a - b * (a / b).floor()
        }
        BinaryOperator::Power => a.powf(b),
        _ => {
            return Err(FormulaError::Evaluation(format!(
                "'{}' is not an arithmetic operator",
                op.symbol()
            )))
        }
    };

    Ok(Scalar::Number(result))
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let value = evaluate(operand, ctx)?;
    let apply = |v: &Scalar| -> FormulaResult<Scalar> {
        match op {
            UnaryOperator::Not => Ok(Scalar::Boolean(!v.is_truthy())),
            _ if v.is_null() => Ok(Scalar::Null),
            UnaryOperator::Negate | UnaryOperator::Plus => {
                let n = v.as_number().ok_or_else(|| {
                    FormulaError::TypeMismatch(format!("cannot negate {}", v.type_name()))
                })?;
                Ok(Scalar::Number(if op == UnaryOperator::Negate { -n } else { n }))
            }
        }
    };

    match value {
        FormulaValue::Scalar(s) => apply(&s).map(FormulaValue::Scalar),
        FormulaValue::Column(values) => values
            .iter()
            .map(apply)
            .collect::<FormulaResult<Vec<_>>>()
            .map(FormulaValue::Column),
    }
}

/// Evaluate a function call
fn evaluate_function(
    function: Function,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let registry = get_function_registry();

    let func = registry
        .get(function)
        .ok_or_else(|| FormulaError::UnknownFunction(function.name().to_string()))?;

    // Check argument count
    if args.len() < func.min_args {
        return Err(FormulaError::ArgumentCount {
            function: function.name().to_string(),
            expected: format!("at least {}", func.min_args),
            actual: args.len(),
        });
    }

    if let Some(max) = func.max_args {
        if args.len() > max {
            return Err(FormulaError::ArgumentCount {
                function: function.name().to_string(),
                expected: format!("at most {}", max),
                actual: args.len(),
            });
        }
    }

    // Evaluate arguments
    let mut evaluated_args = Vec::with_capacity(args.len());
    for arg in args {
        evaluated_args.push(evaluate(arg, ctx)?);
    }

    // Call the function
    (func.implementation)(&evaluated_args, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reportfill_core::ErrorKind;

    fn sales() -> Dataset {
        Dataset::from_columns(vec![
            (
                "Revenue",
                vec![Scalar::from(10.0), Scalar::from(20.0), Scalar::from(30.0)],
            ),
            (
                "Region",
                vec![
                    Scalar::from("North"),
                    Scalar::from("South"),
                    Scalar::from("North"),
                ],
            ),
            (
                "Units",
                vec![Scalar::from(1.0), Scalar::Null, Scalar::from(3.0)],
            ),
        ])
        .unwrap()
    }

    fn eval_with(formula: &str, fields: &FieldContext) -> FormulaResult<FormulaValue> {
        let dataset = sales();
        let ctx = EvaluationContext::new(&dataset, fields);
        evaluate_formula(formula, &ctx)
    }

    fn eval(formula: &str) -> FormulaResult<FormulaValue> {
        eval_with(formula, &FieldContext::new())
    }

    fn num(n: f64) -> FormulaValue {
        FormulaValue::number(n)
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), num(7.0));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), num(9.0));
        assert_eq!(eval("2 ** 3").unwrap(), num(8.0));
        assert_eq!(eval("2 ^ -1").unwrap(), num(0.5));
        assert_eq!(eval("-7 % 3").unwrap(), num(2.0));
        assert_eq!(eval("10 / 4").unwrap(), num(2.5));
    }

    #[test]
    fn test_evaluate_division_by_zero() {
        assert_eq!(eval("1 / 0"), Err(FormulaError::DivisionByZero));
        assert_eq!(eval("5 % 0"), Err(FormulaError::DivisionByZero));
    }

    #[test]
    fn test_evaluate_text() {
        assert_eq!(eval("'a' + 'b'").unwrap(), FormulaValue::text("ab"));
        assert!(matches!(eval("'a' - 1"), Err(FormulaError::TypeMismatch(_))));
    }

    #[test]
    fn test_quoted_concatenation_is_an_expression() {
        let mut fields = FieldContext::new();
        fields.insert("label", FieldValue::Text("Q1".into()));

        assert_eq!(
            eval_with("'Total: ' + label + ''", &fields).unwrap(),
            FormulaValue::text("Total: Q1")
        );
        assert_eq!(
            eval_with("'(' + label + ')'", &fields).unwrap(),
            FormulaValue::text("(Q1)")
        );
    }

    #[test]
    fn test_quoted_literal_formula() {
        assert_eq!(
            eval("'fixed text'").unwrap(),
            FormulaValue::text("fixed text")
        );
        // Not parseable as an expression, still a literal
        assert_eq!(eval(" 'it's here' ").unwrap(), FormulaValue::text("it's here"));
        assert_eq!(quoted_literal("'"), None);
        assert_eq!(quoted_literal("''").as_deref(), Some(""));
        assert_eq!(quoted_literal("'a' + 'b'"), None);
        assert_eq!(quoted_literal("'Total: ' + label + ''"), None);
    }

    #[test]
    fn test_evaluate_aggregates() {
        assert_eq!(eval("SUM(Revenue)").unwrap(), num(60.0));
        assert_eq!(eval("sum(REVENUE)").unwrap(), num(60.0));
        assert_eq!(eval("MEAN(Revenue)").unwrap(), num(20.0));
        assert_eq!(eval("COUNT(Units)").unwrap(), num(2.0));
        assert_eq!(eval("COUNT(revenue > 15)").unwrap(), num(2.0));
        assert_eq!(eval("COUNT(DISTINCT(Region))").unwrap(), num(2.0));
        assert_eq!(
            eval("MODE(Region)").unwrap(),
            FormulaValue::text("North")
        );
        assert_eq!(eval("SUM(Revenue * Units)").unwrap(), num(100.0));
        assert_eq!(eval("SUM(Revenue) / COUNT(Revenue)").unwrap(), num(20.0));
    }

    #[test]
    fn test_count_with_compound_condition() {
        assert_eq!(
            eval("COUNT(Region == 'North' and Revenue > 15)").unwrap(),
            num(1.0)
        );
        assert_eq!(
            eval("COUNT((Region == 'South') | (Revenue < 15))").unwrap(),
            num(2.0)
        );
    }

    #[test]
    fn test_nulls_in_expressions() {
        // Null propagates through arithmetic and compares false
        assert_eq!(
            eval("Units + 1").unwrap(),
            FormulaValue::Column(vec![Scalar::from(2.0), Scalar::Null, Scalar::from(4.0)])
        );
        assert_eq!(eval("COUNT(Units > 0)").unwrap(), num(2.0));
        assert_eq!(eval("COUNT(Units != 1)").unwrap(), num(2.0));
    }

    #[test]
    fn test_column_result() {
        assert_eq!(
            eval("Revenue * 2").unwrap(),
            FormulaValue::Column(vec![
                Scalar::from(20.0),
                Scalar::from(40.0),
                Scalar::from(60.0)
            ])
        );
        assert_eq!(eval("Revenue").unwrap().into_first(), Scalar::from(10.0));
    }

    #[test]
    fn test_fields_shadow_columns() {
        let mut fields = FieldContext::new();
        fields.insert("revenue", FieldValue::Number(5.0));
        fields.insert("label", FieldValue::Text("Q1".into()));

        assert_eq!(eval_with("revenue + 1", &fields).unwrap(), num(6.0));
        assert_eq!(eval_with("Revenue + 0", &fields).unwrap().is_column(), true);
        assert_eq!(
            eval_with("label + ' report'", &fields).unwrap(),
            FormulaValue::text("Q1 report")
        );
    }

    #[test]
    fn test_failed_dependency() {
        let mut fields = FieldContext::new();
        fields.insert("a", FieldValue::error(ErrorKind::Evaluation, "Division by zero"));

        let err = eval_with("a + 1", &fields).unwrap_err();
        assert_eq!(
            err,
            FormulaError::DependencyFailed {
                field: "a".into(),
                message: "Division by zero".into()
            }
        );
        assert_eq!(err.category(), ErrorKind::Evaluation);
    }

    #[test]
    fn test_unknown_identifier() {
        let err = eval("SUM(profit)").unwrap_err();
        assert_eq!(err, FormulaError::UnknownIdentifier("profit".into()));
        assert_eq!(err.category(), ErrorKind::Translation);
    }

    #[test]
    fn test_argument_count() {
        assert!(matches!(
            eval("CAGR(Revenue, Revenue)"),
            Err(FormulaError::ArgumentCount { .. })
        ));
        assert!(matches!(
            eval("SUM(Revenue, Units)"),
            Err(FormulaError::ArgumentCount { .. })
        ));
    }

    #[test]
    fn test_comparison_type_mismatch() {
        assert!(matches!(
            eval("COUNT(Region > 5)"),
            Err(FormulaError::TypeMismatch(_))
        ));
        // Equality across types is just false
        assert_eq!(eval("COUNT(Region == 5)").unwrap(), num(0.0));
    }

    #[test]
    fn test_series_functions() {
        assert_eq!(eval("DIFF(Revenue)").unwrap(), num(20.0));
        assert_eq!(eval("PERCENT_CHANGE(Revenue)").unwrap(), num(200.0));
        let cagr = eval("CAGR(100, 133.1, 3)").unwrap().as_number().unwrap();
        assert!((cagr - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(
            eval("TRUE and not FALSE").unwrap(),
            FormulaValue::Scalar(Scalar::Boolean(true))
        );
        assert_eq!(
            eval("1 > 2 or 3 >= 3").unwrap(),
            FormulaValue::Scalar(Scalar::Boolean(true))
        );
    }
}

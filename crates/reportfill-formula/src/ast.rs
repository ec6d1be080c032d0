//! Formula Abstract Syntax Tree types

use crate::functions::Function;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),

    // === References ===
    /// Report field or dataset column, resolved at evaluation time
    NameRef(String),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    // === Function call ===
    Function {
        function: Function,
        args: Vec<FormulaExpr>,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Logical
    And,
    Or,
}

impl BinaryOperator {
    /// Get the operator symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "**",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }

    /// Check if this is a comparison operator
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterEqual
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Negation (-)
    Negate,
    /// Plus (+), no-op for numbers
    Plus,
    /// Logical not
    Not,
}

impl FormulaExpr {
    /// Create a binary operation
    pub fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> Self {
        FormulaExpr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a unary operation
    pub fn unary(op: UnaryOperator, operand: FormulaExpr) -> Self {
        FormulaExpr::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Check whether a comparison appears anywhere in this expression
    ///
    /// Function calls are opaque: a comparison inside a nested call does not count.
    pub fn contains_comparison(&self) -> bool {
        match self {
            FormulaExpr::BinaryOp { op, left, right } => {
                op.is_comparison() || left.contains_comparison() || right.contains_comparison()
            }
            FormulaExpr::UnaryOp { operand, .. } => operand.contains_comparison(),
            _ => false,
        }
    }

    /// Names referenced by this expression, in order of first appearance
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            FormulaExpr::NameRef(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            FormulaExpr::BinaryOp { left, right, .. } => {
                left.collect_names(names);
                right.collect_names(names);
            }
            FormulaExpr::UnaryOp { operand, .. } => operand.collect_names(names),
            FormulaExpr::Function { args, .. } => {
                for arg in args {
                    arg.collect_names(names);
                }
            }
            FormulaExpr::Number(_) | FormulaExpr::String(_) | FormulaExpr::Boolean(_) => {}
        }
    }
}

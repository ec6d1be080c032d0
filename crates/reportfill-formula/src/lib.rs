//! # reportfill-formula
//!
//! Formula language for reportfill fields.
//!
//! This crate provides:
//! - Formula parsing (text → AST) over a closed grammar
//! - Formula evaluation (AST → value) against a dataset and resolved fields
//! - Built-in aggregate and series functions
//! - Dependency extraction and cycle-tolerant scheduling of fields
//!
//! ## Example
//!
//! ```rust
//! use reportfill_core::{Dataset, FieldContext, Scalar};
//! use reportfill_formula::{evaluate_formula, referenced_names, EvaluationContext};
//!
//! let dataset = Dataset::from_columns(vec![(
//!     "Revenue",
//!     vec![Scalar::from(10.0), Scalar::from(20.0), Scalar::from(30.0)],
//! )])
//! .unwrap();
//! let fields = FieldContext::new();
//! let ctx = EvaluationContext::new(&dataset, &fields);
//!
//! let value = evaluate_formula("COUNT(revenue > 15)", &ctx).unwrap();
//! assert_eq!(value.as_number(), Some(2.0));
//! assert_eq!(referenced_names("SUM(Revenue) / units"), vec!["Revenue", "units"]);
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
mod lexer;
pub mod parser;

pub use ast::{BinaryOperator, FormulaExpr, UnaryOperator};
pub use dependency::{referenced_names, CycleWarning, DependencyGraph, Schedule};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, evaluate_formula, quoted_literal, EvaluationContext, FormulaValue};
pub use functions::Function;
pub use parser::parse_formula;

//! Arithmetic expressions over exact decimal numbers.
//!
//! Expressions are tokenized, parsed with a memoizing backtracking parser
//! and evaluated by walking the syntax tree. Operators and functions are
//! looked up in a [`Registry`], which can be extended or replaced.
//!
//! # Examples
//!
//! ```
//! use decimal_expr::{MathExpression, Registry, Value};
//! use std::sync::Arc;
//!
//! // Variables are supplied by name...
//! let mut expr = MathExpression::new("3 * (5 + (a * b + c))")
//!     .with_var("a", 7)?
//!     .with_var("b", 8)?
//!     .with_var("c", 9)?;
//! assert_eq!(expr.evaluate()?, Value::from(210));
//!
//! // ...or bound to values in the order of their first occurrence.
//! let values = [Value::from(1), Value::from(2), Value::from(3)];
//! let value = decimal_expr::evaluate("x + y * z ^ x", &values)?;
//! assert_eq!(value, Value::from(7));
//!
//! // Arithmetic is exact.
//! let mut expr = MathExpression::new("0.1 + 0.2");
//! assert_eq!(expr.evaluate()?.to_string(), "0.3");
//!
//! // Assignments are stored in the expression.
//! let mut expr = MathExpression::new("a = 2 ^ 3");
//! expr.evaluate()?;
//! assert_eq!(expr.get_var("a"), Some(&Value::from(8)));
//!
//! // Registries are shared among expressions.
//! let registry = Arc::new(Registry::standard());
//! let mut expr = MathExpression::with_registry("max(2, abs(-(3)))", Arc::clone(&registry));
//! assert_eq!(expr.evaluate()?.to_string(), "3");
//! # Ok::<(), decimal_expr::Error>(())
//! ```
//!
//! [`Registry`]: struct.Registry.html

#![deny(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod decimal;
mod error;
mod expression;
pub mod functions;
mod interpreter;
pub mod lexer;
pub mod operators;
pub mod parser;
mod registry;

pub use crate::{
    config::{Division, Settings},
    decimal::{ArithmeticError, Decimal, ParseDecimalError, RoundingMode},
    error::{Error, ErrorKind, Position},
    expression::{evaluate, MathExpression},
    interpreter::{EvalError, Scope, Value, ValueType, Variable},
    registry::Registry,
};

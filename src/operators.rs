//! Operators: symbols with a precedence and an evaluation rule.
//!
//! Operators come in three families:
//!
//! - [`Arithmetical`] operators coerce operands to decimals and substitute
//!   a missing operand with the operator's neutral element.
//! - [`Relational`] operators compare operands; a missing operand is less
//!   than any other value.
//! - [`Logical`] operators combine operands according to [`is_truthy`].
//!
//! Only the arithmetical symbols `+ - * / % ^` are part of the expression
//! syntax. Relational and logical operators are looked up in a registry
//! and applied to values directly.
//!
//! [`Arithmetical`]: struct.Arithmetical.html
//! [`Relational`]: struct.Relational.html
//! [`Logical`]: struct.Logical.html
//! [`is_truthy`]: fn.is_truthy.html

use num_traits::Zero;
use std::{cmp::Ordering, fmt};

use crate::{
    config::Division,
    decimal::{ArithmeticError, Decimal},
    interpreter::{EvalError, Value},
};

/// Operator that can be registered in a [`Registry`](../struct.Registry.html).
pub trait Operator: Send + Sync {
    /// Returns the operator symbol, e.g., `+`.
    fn symbol(&self) -> &str;

    /// Returns the operator precedence. Operators with higher precedence bind tighter.
    fn precedence(&self) -> usize;

    /// Checks whether the operator can be applied to a single operand.
    fn is_unary(&self) -> bool {
        false
    }

    /// Applies the operator. For unary applications, `lhs` is `Value::Void`.
    fn apply(&self, lhs: &Value, rhs: &Value) -> Result<Value, EvalError>;
}

type DecimalOp = dyn Fn(&Decimal, &Decimal) -> Result<Decimal, ArithmeticError> + Send + Sync;

/// Arithmetical operator producing a decimal.
pub struct Arithmetical {
    symbol: &'static str,
    precedence: usize,
    unary: bool,
    neutral: Decimal,
    op: Box<DecimalOp>,
}

impl fmt::Debug for Arithmetical {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("Arithmetical")
            .field("symbol", &self.symbol)
            .field("precedence", &self.precedence)
            .field("unary", &self.unary)
            .field("neutral", &self.neutral)
            .finish()
    }
}

impl Arithmetical {
    /// Creates a binary operator. A missing operand (`Value::Void`) is replaced
    /// with `neutral` before `op` is called.
    pub fn new<F>(symbol: &'static str, precedence: usize, neutral: Decimal, op: F) -> Self
    where
        F: Fn(&Decimal, &Decimal) -> Result<Decimal, ArithmeticError> + Send + Sync + 'static,
    {
        Arithmetical {
            symbol,
            precedence,
            unary: false,
            neutral,
            op: Box::new(op),
        }
    }

    /// Allows using the operator as a unary one, i.e., as `neutral op x`.
    pub fn unary(mut self) -> Self {
        self.unary = true;
        self
    }

    /// Addition `+`, also usable as unary plus.
    pub fn add() -> Self {
        Self::new("+", 5, Decimal::zero(), |x, y| Ok(x.plus(y))).unary()
    }

    /// Subtraction `-`, also usable as unary negation.
    pub fn sub() -> Self {
        Self::new("-", 5, Decimal::zero(), |x, y| Ok(x.minus(y))).unary()
    }

    /// Multiplication `*`.
    pub fn mul() -> Self {
        Self::new("*", 6, Decimal::one(), |x, y| x.times(y))
    }

    /// Division `/` following the specified policy.
    pub fn div(division: Division) -> Self {
        Self::new("/", 6, Decimal::one(), move |x, y| division.divide(x, y))
    }

    /// Remainder `%` of the truncating division.
    pub fn rem() -> Self {
        Self::new("%", 6, Decimal::one(), |x, y| x.rem(y))
    }

    /// Power `^`. Non-integer exponents are computed with `precision`
    /// fractional digits.
    pub fn pow(precision: u32) -> Self {
        Self::new("^", 7, Decimal::one(), move |x, y| x.pow_decimal(y, precision))
    }

    fn operand(&self, value: &Value) -> Result<Decimal, EvalError> {
        Ok(value.to_decimal()?.unwrap_or_else(|| self.neutral.clone()))
    }
}

impl Operator for Arithmetical {
    fn symbol(&self) -> &str {
        self.symbol
    }

    fn precedence(&self) -> usize {
        self.precedence
    }

    fn is_unary(&self) -> bool {
        self.unary
    }

    fn apply(&self, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
        let lhs = self.operand(lhs)?;
        let rhs = self.operand(rhs)?;
        (self.op)(&lhs, &rhs)
            .map(Value::Number)
            .map_err(EvalError::Arithmetic)
    }
}

/// Compares two values.
///
/// `Void` is less than any other value, and two `Void`s are equal. Numbers
/// and booleans are compared among themselves; values that can be coerced
/// to numbers are compared numerically, and other values by their text.
pub fn compare(lhs: &Value, rhs: &Value) -> Ordering {
    match (lhs, rhs) {
        (Value::Void, Value::Void) => Ordering::Equal,
        (Value::Void, _) => Ordering::Less,
        (_, Value::Void) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => match (lhs.to_decimal(), rhs.to_decimal()) {
            (Ok(Some(x)), Ok(Some(y))) => x.cmp(&y),
            _ => lhs.to_string().cmp(&rhs.to_string()),
        },
    }
}

/// Relational operator producing a boolean.
#[derive(Debug, Clone, Copy)]
pub struct Relational {
    symbol: &'static str,
    test: fn(Ordering) -> bool,
}

impl Relational {
    /// Precedence of all relational operators.
    pub const PRECEDENCE: usize = 4;

    /// Creates an operator holding if `test` holds for the operand ordering.
    pub fn new(symbol: &'static str, test: fn(Ordering) -> bool) -> Self {
        Relational { symbol, test }
    }

    /// `<` operator.
    pub fn less() -> Self {
        Self::new("<", |ordering| ordering == Ordering::Less)
    }

    /// `<=` operator.
    pub fn less_or_equal() -> Self {
        Self::new("<=", |ordering| ordering != Ordering::Greater)
    }

    /// `>` operator.
    pub fn greater() -> Self {
        Self::new(">", |ordering| ordering == Ordering::Greater)
    }

    /// `>=` operator.
    pub fn greater_or_equal() -> Self {
        Self::new(">=", |ordering| ordering != Ordering::Less)
    }

    /// `==` operator.
    pub fn equal() -> Self {
        Self::new("==", |ordering| ordering == Ordering::Equal)
    }

    /// `!=` operator.
    pub fn not_equal() -> Self {
        Self::new("!=", |ordering| ordering != Ordering::Equal)
    }
}

impl Operator for Relational {
    fn symbol(&self) -> &str {
        self.symbol
    }

    fn precedence(&self) -> usize {
        Self::PRECEDENCE
    }

    fn apply(&self, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
        Ok(Value::Bool((self.test)(compare(lhs, rhs))))
    }
}

/// Converts a value to a boolean.
///
/// Numbers are truthy iff they are positive. Text values `on`, `yes`, `1`
/// and `true` are truthy; `off`, `no`, `0` and `false` are not; other text
/// is parsed as a number (and is falsy if it is not a number).
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Void => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.is_positive(),
        Value::Text(text) => match text.as_str() {
            "on" | "yes" | "1" | "true" => true,
            "off" | "no" | "0" | "false" => false,
            other => other
                .parse::<Decimal>()
                .map(|number| number.is_positive())
                .unwrap_or(false),
        },
    }
}

/// Logical operator producing a boolean.
#[derive(Debug, Clone, Copy)]
pub struct Logical {
    symbol: &'static str,
    precedence: usize,
    unary: bool,
    op: fn(bool, bool) -> bool,
}

impl Logical {
    /// Conjunction `&&`. Both operands are always evaluated.
    pub fn and() -> Self {
        Logical {
            symbol: "&&",
            precedence: 2,
            unary: false,
            op: |x, y| x && y,
        }
    }

    /// Disjunction `||`. Both operands are always evaluated.
    pub fn or() -> Self {
        Logical {
            symbol: "||",
            precedence: 1,
            unary: false,
            op: |x, y| x || y,
        }
    }

    /// Unary negation `!`.
    pub fn not() -> Self {
        Logical {
            symbol: "!",
            precedence: 7,
            unary: true,
            op: |_, y| !y,
        }
    }
}

impl Operator for Logical {
    fn symbol(&self) -> &str {
        self.symbol
    }

    fn precedence(&self) -> usize {
        self.precedence
    }

    fn is_unary(&self) -> bool {
        self.unary
    }

    fn apply(&self, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
        Ok(Value::Bool((self.op)(is_truthy(lhs), is_truthy(rhs))))
    }
}

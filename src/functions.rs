//! Functions.

use failure::{bail, Error};
use rand::Rng;
use std::fmt;

use crate::{
    decimal::{ArithmeticError, Decimal, RoundingMode},
    interpreter::{EvalError, Value},
};

/// Number of arguments accepted by a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FnArity {
    /// Exactly the specified number of arguments.
    Exact(usize),
    /// The specified number of arguments or more.
    AtLeast(usize),
    /// Number of arguments in the inclusive range.
    Between(usize, usize),
}

impl FnArity {
    /// Checks whether `count` arguments are acceptable.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            FnArity::Exact(n) => count == n,
            FnArity::AtLeast(n) => count >= n,
            FnArity::Between(min, max) => count >= min && count <= max,
        }
    }
}

impl fmt::Display for FnArity {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FnArity::Exact(n) => write!(formatter, "{}", n),
            FnArity::AtLeast(n) => write!(formatter, "at least {}", n),
            FnArity::Between(min, max) => write!(formatter, "{} to {}", min, max),
        }
    }
}

/// Function on zero or more decimal arguments.
pub trait Function: Send + Sync {
    /// Returns the number of accepted arguments.
    fn arity(&self) -> FnArity;

    /// Checks the number of arguments before the function is executed.
    /// `name` is the name the function was called by.
    fn check_arity(&self, name: &str, actual: usize) -> Result<(), EvalError> {
        let expected = self.arity();
        if expected.accepts(actual) {
            Ok(())
        } else {
            Err(EvalError::ArityMismatch {
                name: name.to_owned(),
                expected,
                actual,
            })
        }
    }

    /// Executes the function on the specified arguments.
    fn execute(&self, args: &[Decimal]) -> Result<Value, Error>;
}

/// Absolute value.
#[derive(Debug, Clone, Copy)]
pub struct Abs;

impl Function for Abs {
    fn arity(&self) -> FnArity {
        FnArity::Exact(1)
    }

    fn execute(&self, args: &[Decimal]) -> Result<Value, Error> {
        Ok(Value::Number(args[0].abs()))
    }
}

/// Greater of two values.
#[derive(Debug, Clone, Copy)]
pub struct Max;

impl Function for Max {
    fn arity(&self) -> FnArity {
        FnArity::Exact(2)
    }

    fn execute(&self, args: &[Decimal]) -> Result<Value, Error> {
        Ok(Value::Number(args[0].clone().max(args[1].clone())))
    }
}

/// Lesser of two values.
#[derive(Debug, Clone, Copy)]
pub struct Min;

impl Function for Min {
    fn arity(&self) -> FnArity {
        FnArity::Exact(2)
    }

    fn execute(&self, args: &[Decimal]) -> Result<Value, Error> {
        Ok(Value::Number(args[0].clone().min(args[1].clone())))
    }
}

/// Sum of one or more values.
#[derive(Debug, Clone, Copy)]
pub struct Sum;

impl Function for Sum {
    fn arity(&self) -> FnArity {
        FnArity::AtLeast(1)
    }

    fn execute(&self, args: &[Decimal]) -> Result<Value, Error> {
        Ok(Value::Number(args.iter().sum()))
    }
}

/// Square root truncated to a fixed number of fractional digits.
/// The root of a negative value is `Value::Void`.
#[derive(Debug, Clone, Copy)]
pub struct Sqrt {
    /// Number of fractional digits.
    pub precision: u32,
}

impl Function for Sqrt {
    fn arity(&self) -> FnArity {
        FnArity::Exact(1)
    }

    fn execute(&self, args: &[Decimal]) -> Result<Value, Error> {
        Ok(args[0]
            .sqrt_with_precision(self.precision)
            .map_or(Value::Void, Value::Number))
    }
}

/// Half-even rounding: `round(x)` keeps 2 fractional digits, `round(x, n)`
/// keeps `n` digits.
#[derive(Debug, Clone, Copy)]
pub struct Round;

impl Function for Round {
    fn arity(&self) -> FnArity {
        FnArity::Between(1, 2)
    }

    fn execute(&self, args: &[Decimal]) -> Result<Value, Error> {
        let rounded = match args.get(1) {
            None => args[0].round_default(),
            Some(scale) => {
                if !scale.is_integer() {
                    bail!("Rounding scale must be an integer, got {}", scale);
                }
                let scale = scale.to_i64().ok_or(ArithmeticError::ScaleOverflow)?;
                args[0].round(scale, RoundingMode::HalfEven)?
            }
        };
        Ok(Value::Number(rounded))
    }
}

/// Trigonometric function of an angle in radians, computed in floating point
/// and rounded to a fixed number of fractional digits.
#[derive(Clone, Copy)]
pub struct Trigonometric {
    name: &'static str,
    function: fn(f64) -> f64,
    precision: u32,
}

impl fmt::Debug for Trigonometric {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("Trigonometric")
            .field("name", &self.name)
            .field("precision", &self.precision)
            .finish()
    }
}

impl Trigonometric {
    /// Sine.
    pub fn sin(precision: u32) -> Self {
        Trigonometric {
            name: "sin",
            function: f64::sin,
            precision,
        }
    }

    /// Cosine.
    pub fn cos(precision: u32) -> Self {
        Trigonometric {
            name: "cos",
            function: f64::cos,
            precision,
        }
    }

    /// Tangent.
    pub fn tan(precision: u32) -> Self {
        Trigonometric {
            name: "tan",
            function: f64::tan,
            precision,
        }
    }
}

impl Function for Trigonometric {
    fn arity(&self) -> FnArity {
        FnArity::Exact(1)
    }

    fn execute(&self, args: &[Decimal]) -> Result<Value, Error> {
        let value = (self.function)(args[0].to_f64());
        let value = Decimal::approximate(value, self.precision).ok_or(ArithmeticError::NotFinite)?;
        Ok(Value::Number(value))
    }
}

/// Uniformly distributed random number in `[0, 1)`.
#[derive(Debug, Clone, Copy)]
pub struct Random;

impl Function for Random {
    fn arity(&self) -> FnArity {
        FnArity::Exact(0)
    }

    fn execute(&self, _args: &[Decimal]) -> Result<Value, Error> {
        let value: f64 = rand::thread_rng().gen();
        let value = Decimal::from_f64(value).ok_or(ArithmeticError::NotFinite)?;
        Ok(Value::Number(value))
    }
}

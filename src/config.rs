//! Evaluation settings.

use crate::decimal::{ArithmeticError, Decimal, RoundingMode, DEFAULT_PRECISION};

/// Treatment of quotients in the `/` operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Division {
    /// Only exact quotients are allowed; a quotient without a finite
    /// decimal expansion (e.g., `1 / 3`) is an arithmetic error.
    Exact,
    /// Quotients are rounded to a fixed number of fractional digits.
    Scaled {
        /// Number of fractional digits in the quotient.
        scale: i64,
        /// Rounding mode applied to the dropped digits.
        rounding: RoundingMode,
    },
}

impl Default for Division {
    fn default() -> Self {
        Division::Exact
    }
}

impl Division {
    /// Divides `dividend` by `divisor` according to this policy.
    pub fn divide(self, dividend: &Decimal, divisor: &Decimal) -> Result<Decimal, ArithmeticError> {
        match self {
            Division::Exact => dividend.divide(divisor),
            Division::Scaled { scale, rounding } => {
                dividend.divide_scaled(divisor, scale, rounding)
            }
        }
    }
}

/// Settings for the standard operators and functions.
///
/// # Examples
///
/// ```
/// # use decimal_expr::{Division, MathExpression, Registry, RoundingMode, Settings};
/// # use std::sync::Arc;
/// let settings = Settings::default().with_division(Division::Scaled {
///     scale: 4,
///     rounding: RoundingMode::HalfUp,
/// });
/// let registry = Arc::new(Registry::with_settings(&settings));
/// let value = MathExpression::with_registry("2 / 3", registry).evaluate().unwrap();
/// assert_eq!(value.to_string(), "0.6667");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    division: Division,
    precision: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            division: Division::default(),
            precision: DEFAULT_PRECISION,
        }
    }
}

impl Settings {
    /// Sets the division policy.
    pub fn with_division(mut self, division: Division) -> Self {
        self.division = division;
        self
    }

    /// Sets the number of fractional digits computed by approximate operations
    /// (square roots, real powers and trigonometric functions).
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Returns the division policy.
    pub fn division(&self) -> Division {
        self.division
    }

    /// Returns the precision of approximate operations.
    pub fn precision(&self) -> u32 {
        self.precision
    }
}

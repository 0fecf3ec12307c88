//! Exact decimal numbers.

use failure_derive::*;
use num_bigint::BigInt;
use num_integer::{Integer, Roots};
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::{
    cmp::Ordering,
    convert::TryFrom,
    fmt,
    hash::{Hash, Hasher},
    iter::Sum,
    ops,
    str::FromStr,
};

/// Number of fractional digits produced by approximate operations
/// (square roots, real powers) unless specified otherwise.
pub const DEFAULT_PRECISION: u32 = 16;

/// Rounding mode used when a result has to drop digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundingMode {
    /// Away from zero.
    Up,
    /// Towards zero (truncation).
    Down,
    /// Towards positive infinity.
    Ceiling,
    /// Towards negative infinity.
    Floor,
    /// To the nearest neighbor; ties go away from zero.
    HalfUp,
    /// To the nearest neighbor; ties go towards zero.
    HalfDown,
    /// To the nearest neighbor; ties go to the even neighbor.
    HalfEven,
}

impl Default for RoundingMode {
    fn default() -> Self {
        RoundingMode::HalfEven
    }
}

/// Error produced by a decimal operation.
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum ArithmeticError {
    /// Division (or remainder) by zero.
    #[fail(display = "Division by zero")]
    DivisionByZero,

    /// Exact division whose quotient has no finite decimal expansion.
    #[fail(display = "Non-terminating decimal expansion; no exact representable result")]
    NonTerminating,

    /// Approximate operation produced NaN or infinity.
    #[fail(display = "Result is not a finite number")]
    NotFinite,

    /// Scale of the result does not fit into `i32`.
    #[fail(display = "Scale of the result is out of range")]
    ScaleOverflow,
}

/// Error parsing a decimal from text.
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum ParseDecimalError {
    /// Input has no digits.
    #[fail(display = "Cannot parse decimal from empty string")]
    Empty,

    /// Input contains a character that is not a digit.
    #[fail(display = "Invalid digit in decimal literal")]
    InvalidDigit,

    /// Exponent is malformed or out of range.
    #[fail(display = "Invalid exponent in decimal literal")]
    Exponent,
}

/// Immutable arbitrary-precision decimal: `unscaled * 10^(-scale)`.
///
/// Equality, ordering and hashing depend on the numeric value only,
/// so `2.0 == 2.00`. Addition, subtraction and multiplication are exact;
/// rounding only happens in [`round`](#method.round) and
/// [`divide_scaled`](#method.divide_scaled).
///
/// The scale always lies in the `i32` range; operations whose result would
/// leave it fail with [`ArithmeticError::ScaleOverflow`].
///
/// [`ArithmeticError::ScaleOverflow`]: enum.ArithmeticError.html#variant.ScaleOverflow
#[derive(Clone)]
pub struct Decimal {
    unscaled: BigInt,
    scale: i64,
}

/// Keeps scales within `i32`, so sums and differences of two scales
/// cannot overflow `i64`.
fn check_scale(scale: Option<i64>) -> Result<i64, ArithmeticError> {
    let range = i64::from(i32::min_value())..=i64::from(i32::max_value());
    scale
        .filter(|scale| range.contains(scale))
        .ok_or(ArithmeticError::ScaleOverflow)
}

fn ten_pow(exp: i64) -> BigInt {
    debug_assert!(exp >= 0);
    num_traits::pow(BigInt::from(10_u8), exp as usize)
}

/// Brings both numbers to the larger of the two scales.
fn align(lhs: &Decimal, rhs: &Decimal) -> (BigInt, BigInt, i64) {
    match lhs.scale.cmp(&rhs.scale) {
        Ordering::Equal => (lhs.unscaled.clone(), rhs.unscaled.clone(), lhs.scale),
        Ordering::Less => (
            &lhs.unscaled * ten_pow(rhs.scale - lhs.scale),
            rhs.unscaled.clone(),
            rhs.scale,
        ),
        Ordering::Greater => (
            lhs.unscaled.clone(),
            &rhs.unscaled * ten_pow(lhs.scale - rhs.scale),
            lhs.scale,
        ),
    }
}

/// Integer division with the quotient rounded according to `mode`.
fn div_round(numerator: &BigInt, denominator: &BigInt, mode: RoundingMode) -> BigInt {
    let (quotient, remainder) = numerator.div_rem(denominator);
    if remainder.is_zero() {
        return quotient;
    }

    let positive = numerator.is_negative() == denominator.is_negative();
    let half = (remainder.abs() * BigInt::from(2_u8)).cmp(&denominator.abs());
    let away_from_zero = match mode {
        RoundingMode::Up => true,
        RoundingMode::Down => false,
        RoundingMode::Ceiling => positive,
        RoundingMode::Floor => !positive,
        RoundingMode::HalfUp => half != Ordering::Less,
        RoundingMode::HalfDown => half == Ordering::Greater,
        RoundingMode::HalfEven => {
            half == Ordering::Greater || (half == Ordering::Equal && quotient.is_odd())
        }
    };

    match (away_from_zero, positive) {
        (false, _) => quotient,
        (true, true) => quotient + BigInt::one(),
        (true, false) => quotient - BigInt::one(),
    }
}

/// Removes all factors `factor` from `value`, returning their count.
fn strip_factor(mut value: BigInt, factor: u8) -> (i64, BigInt) {
    let factor = BigInt::from(factor);
    let mut count = 0;
    loop {
        let (quotient, remainder) = value.div_rem(&factor);
        if !remainder.is_zero() {
            return (count, value);
        }
        value = quotient;
        count += 1;
    }
}

impl Decimal {
    /// Creates a decimal equal to `unscaled * 10^(-scale)`.
    pub fn new(unscaled: impl Into<BigInt>, scale: i32) -> Self {
        Decimal::from_parts(unscaled.into(), i64::from(scale))
    }

    fn from_parts(unscaled: BigInt, scale: i64) -> Self {
        debug_assert!(check_scale(Some(scale)).is_ok());
        Decimal { unscaled, scale }
    }

    /// Number of digits after the decimal point in this representation.
    /// May be negative for numbers like `2.5e3`.
    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// Checks whether the number is strictly less than zero.
    pub fn is_negative(&self) -> bool {
        self.unscaled.is_negative()
    }

    /// Checks whether the number is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.unscaled.is_positive()
    }

    /// Checks whether the number has no fractional part.
    pub fn is_integer(&self) -> bool {
        self.normalized().scale <= 0
    }

    /// Removes trailing zeros while the scale stays at or above `min_scale`.
    fn strip_zeros(self, min_scale: i64) -> Self {
        if self.unscaled.is_zero() {
            return Decimal {
                unscaled: BigInt::zero(),
                scale: min_scale.max(0),
            };
        }

        let ten = BigInt::from(10_u8);
        let mut unscaled = self.unscaled;
        let mut scale = self.scale;
        while scale > min_scale {
            let (quotient, remainder) = unscaled.div_rem(&ten);
            if !remainder.is_zero() {
                break;
            }
            unscaled = quotient;
            scale -= 1;
        }
        Decimal { unscaled, scale }
    }

    /// Returns the same value with all trailing zeros removed.
    pub fn normalized(&self) -> Self {
        self.clone().strip_zeros(i64::min_value())
    }

    /// Exact sum.
    pub fn plus(&self, augend: &Decimal) -> Decimal {
        let (lhs, rhs, scale) = align(self, augend);
        Decimal::from_parts(lhs + rhs, scale)
    }

    /// Exact difference.
    pub fn minus(&self, subtrahend: &Decimal) -> Decimal {
        let (lhs, rhs, scale) = align(self, subtrahend);
        Decimal::from_parts(lhs - rhs, scale)
    }

    /// Exact product.
    pub fn times(&self, multiplicand: &Decimal) -> Result<Decimal, ArithmeticError> {
        let scale = check_scale(self.scale.checked_add(multiplicand.scale))?;
        Ok(Decimal::from_parts(
            &self.unscaled * &multiplicand.unscaled,
            scale,
        ))
    }

    /// Exact quotient.
    ///
    /// Fails with `NonTerminating` if the quotient has no finite decimal
    /// expansion (e.g., `1 / 3`); use [`divide_scaled`](#method.divide_scaled)
    /// in that case.
    pub fn divide(&self, divisor: &Decimal) -> Result<Decimal, ArithmeticError> {
        if divisor.unscaled.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        let preferred_scale = self
            .scale
            .checked_sub(divisor.scale)
            .ok_or(ArithmeticError::ScaleOverflow)?;
        if self.unscaled.is_zero() {
            let scale = check_scale(Some(preferred_scale.max(0)))?;
            return Ok(Decimal::from_parts(BigInt::zero(), scale));
        }

        let gcd = self.unscaled.gcd(&divisor.unscaled);
        let mut numerator = &self.unscaled / &gcd;
        let mut denominator = &divisor.unscaled / &gcd;
        if denominator.is_negative() {
            numerator = -numerator;
            denominator = -denominator;
        }

        // The quotient terminates iff the reduced denominator is `2^a * 5^b`.
        let (twos, rest) = strip_factor(denominator.clone(), 2);
        let (fives, rest) = strip_factor(rest, 5);
        if !rest.is_one() {
            return Err(ArithmeticError::NonTerminating);
        }
        let extra_digits = twos.max(fives);
        let unscaled = numerator * ten_pow(extra_digits) / denominator;
        let quotient = Decimal {
            unscaled,
            scale: preferred_scale + extra_digits,
        }
        .strip_zeros(preferred_scale);
        check_scale(Some(quotient.scale))?;
        Ok(quotient)
    }

    /// Quotient with exactly `scale` fractional digits, rounded with `mode`.
    pub fn divide_scaled(
        &self,
        divisor: &Decimal,
        scale: i64,
        mode: RoundingMode,
    ) -> Result<Decimal, ArithmeticError> {
        if divisor.unscaled.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }

        let scale = check_scale(Some(scale))?;
        let shift = scale
            .checked_sub(self.scale)
            .and_then(|shift| shift.checked_add(divisor.scale))
            .ok_or(ArithmeticError::ScaleOverflow)?;
        let (numerator, denominator) = if shift >= 0 {
            (&self.unscaled * ten_pow(shift), divisor.unscaled.clone())
        } else {
            (self.unscaled.clone(), &divisor.unscaled * ten_pow(-shift))
        };
        Ok(Decimal::from_parts(
            div_round(&numerator, &denominator, mode),
            scale,
        ))
    }

    /// Remainder of truncating division; the result has the sign of `self`.
    pub fn rem(&self, divisor: &Decimal) -> Result<Decimal, ArithmeticError> {
        if divisor.unscaled.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        let (lhs, rhs, scale) = align(self, divisor);
        Ok(Decimal::from_parts(lhs % rhs, scale))
    }

    /// Negated value.
    pub fn negate(&self) -> Decimal {
        Decimal::from_parts(-&self.unscaled, self.scale)
    }

    /// Absolute value.
    pub fn abs(&self) -> Decimal {
        Decimal::from_parts(self.unscaled.abs(), self.scale)
    }

    /// Exact integer power.
    pub fn pow(&self, exponent: u32) -> Result<Decimal, ArithmeticError> {
        let scale = check_scale(self.scale.checked_mul(i64::from(exponent)))?;
        Ok(Decimal::from_parts(
            num_traits::pow(self.unscaled.clone(), exponent as usize),
            scale,
        ))
    }

    /// Power with a decimal exponent.
    ///
    /// Non-negative integer exponents in the `i32` range are computed exactly.
    /// Negative integer exponents are exact when the reciprocal terminates and are otherwise
    /// rounded to `precision` digits. Other exponents are approximated.
    pub fn pow_decimal(
        &self,
        exponent: &Decimal,
        precision: u32,
    ) -> Result<Decimal, ArithmeticError> {
        if exponent.is_integer() {
            if let Some(exp) = exponent.to_i64().and_then(|exp| i32::try_from(exp).ok()) {
                if exp >= 0 {
                    return self.pow(exp as u32);
                } else {
                    let denominator = self.pow((-i64::from(exp)) as u32)?;
                    return match Decimal::one().divide(&denominator) {
                        Err(ArithmeticError::NonTerminating) => Decimal::one().divide_scaled(
                            &denominator,
                            i64::from(precision),
                            RoundingMode::HalfEven,
                        ),
                        other => other,
                    };
                }
            }
        }

        let value = self.to_f64().powf(exponent.to_f64());
        Decimal::approximate(value, precision).ok_or(ArithmeticError::NotFinite)
    }

    /// Exact square.
    pub fn square(&self) -> Result<Decimal, ArithmeticError> {
        self.pow(2)
    }

    /// Square root truncated to [`DEFAULT_PRECISION`] fractional digits.
    /// Returns `None` for negative values.
    ///
    /// [`DEFAULT_PRECISION`]: constant.DEFAULT_PRECISION.html
    pub fn sqrt(&self) -> Option<Decimal> {
        self.sqrt_with_precision(DEFAULT_PRECISION)
    }

    /// Square root truncated to `precision` fractional digits.
    /// Returns `None` for negative values and if the result scale
    /// is out of range.
    pub fn sqrt_with_precision(&self, precision: u32) -> Option<Decimal> {
        if self.is_negative() {
            return None;
        }

        let target_scale = check_scale(Some(self.scale.max(0) + i64::from(precision))).ok()?;
        let radicand = &self.unscaled * ten_pow(2 * target_scale - self.scale);
        let root = Roots::sqrt(&radicand);
        Some(Decimal::from_parts(root, target_scale).strip_zeros(0))
    }

    /// Value with exactly `scale` fractional digits.
    pub fn round(&self, scale: i64, mode: RoundingMode) -> Result<Decimal, ArithmeticError> {
        let scale = check_scale(Some(scale))?;
        Ok(self.rescale(scale, mode))
    }

    /// Rescaling with `scale` already known to be in range.
    fn rescale(&self, scale: i64, mode: RoundingMode) -> Decimal {
        if scale >= self.scale {
            Decimal::from_parts(&self.unscaled * ten_pow(scale - self.scale), scale)
        } else {
            let divisor = ten_pow(self.scale - scale);
            Decimal::from_parts(div_round(&self.unscaled, &divisor, mode), scale)
        }
    }

    /// Rounds to 2 fractional digits, half-even.
    pub fn round_default(&self) -> Decimal {
        self.rescale(2, RoundingMode::default())
    }

    /// Checks whether `self > other`.
    pub fn gt<T: Into<Decimal>>(&self, other: T) -> bool {
        *self > other.into()
    }

    /// Checks whether `self >= other`.
    pub fn gteq<T: Into<Decimal>>(&self, other: T) -> bool {
        *self >= other.into()
    }

    /// Checks whether `self < other`.
    pub fn lt<T: Into<Decimal>>(&self, other: T) -> bool {
        *self < other.into()
    }

    /// Checks whether `self <= other`.
    pub fn lteq<T: Into<Decimal>>(&self, other: T) -> bool {
        *self <= other.into()
    }

    /// Converts a finite float using its shortest round-trip representation.
    pub fn from_f64(value: f64) -> Option<Decimal> {
        if value.is_finite() {
            value.to_string().parse().ok()
        } else {
            None
        }
    }

    /// Converts a float and limits the result to `precision` fractional digits.
    pub(crate) fn approximate(value: f64, precision: u32) -> Option<Decimal> {
        let decimal = Decimal::from_f64(value)?;
        if decimal.scale > i64::from(precision) {
            Some(
                decimal
                    .rescale(i64::from(precision), RoundingMode::HalfEven)
                    .strip_zeros(0),
            )
        } else {
            Some(decimal)
        }
    }

    /// Nearest float.
    pub fn to_f64(&self) -> f64 {
        format!("{}e{}", self.unscaled, -self.scale)
            .parse()
            .unwrap_or(std::f64::NAN)
    }

    /// Integer part (truncated towards zero), if it fits into `i64`.
    pub fn to_i64(&self) -> Option<i64> {
        if self.unscaled.is_zero() {
            return Some(0);
        } else if self.scale < -18 {
            // |value| >= 10^19 > i64::MAX
            return None;
        }
        let integer = if self.scale <= 0 {
            &self.unscaled * ten_pow(-self.scale)
        } else {
            &self.unscaled / ten_pow(self.scale)
        };
        integer.to_i64()
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.debug_tuple("Decimal").field(&self.to_string()).finish()
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let digits = self.unscaled.abs().to_string();

        if self.scale <= 0 {
            formatter.write_str(sign)?;
            formatter.write_str(&digits)?;
            if !self.unscaled.is_zero() {
                for _ in 0..-self.scale {
                    formatter.write_str("0")?;
                }
            }
            Ok(())
        } else {
            let scale = self.scale as usize;
            if digits.len() > scale {
                let (integer, fraction) = digits.split_at(digits.len() - scale);
                write!(formatter, "{}{}.{}", sign, integer, fraction)
            } else {
                write!(formatter, "{}0.{:0>width$}", sign, digits, width = scale)
            }
        }
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (mantissa, exponent) = match s.find(|c: char| c == 'e' || c == 'E') {
            Some(pos) => {
                let exponent = s[pos + 1..]
                    .parse::<i32>()
                    .map_err(|_| ParseDecimalError::Exponent)?;
                (&s[..pos], i64::from(exponent))
            }
            None => (s, 0),
        };

        let (negative, digits) = match mantissa.as_bytes().first() {
            Some(b'-') => (true, &mantissa[1..]),
            Some(b'+') => (false, &mantissa[1..]),
            _ => (false, mantissa),
        };
        let (integer, fraction) = match digits.find('.') {
            Some(pos) => (&digits[..pos], &digits[pos + 1..]),
            None => (digits, ""),
        };
        if integer.is_empty() && fraction.is_empty() {
            return Err(ParseDecimalError::Empty);
        }
        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !is_digits(integer) || !is_digits(fraction) {
            return Err(ParseDecimalError::InvalidDigit);
        }

        let mut unscaled: BigInt = [integer, fraction]
            .concat()
            .parse()
            .map_err(|_| ParseDecimalError::InvalidDigit)?;
        if negative {
            unscaled = -unscaled;
        }
        let scale = check_scale((fraction.len() as i64).checked_sub(exponent))
            .map_err(|_| ParseDecimalError::Exponent)?;
        Ok(Decimal::from_parts(unscaled, scale))
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let sign_order = self.unscaled.sign().cmp(&other.unscaled.sign());
        if sign_order != Ordering::Equal {
            return sign_order;
        }
        let (lhs, rhs, _) = align(self, other);
        lhs.cmp(&rhs)
    }
}

impl Hash for Decimal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let normalized = self.normalized();
        normalized.unscaled.hash(state);
        normalized.scale.hash(state);
    }
}

impl Zero for Decimal {
    fn zero() -> Self {
        Decimal::new(0, 0)
    }

    fn is_zero(&self) -> bool {
        self.unscaled.is_zero()
    }
}

impl Decimal {
    /// The multiplicative identity `1` (scale 0).
    pub fn one() -> Self {
        Decimal::new(1, 0)
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Decimal {
                fn from(value: $ty) -> Self {
                    Decimal::from_parts(value.into(), 0)
                }
            }
        )+
    };
}

impl_from_primitive!(i32, i64, u32, u64, usize);

impl From<BigInt> for Decimal {
    fn from(value: BigInt) -> Self {
        Decimal::from_parts(value, 0)
    }
}

impl From<&Decimal> for Decimal {
    fn from(value: &Decimal) -> Self {
        value.clone()
    }
}

impl ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Self) -> Decimal {
        self.plus(&rhs)
    }
}

impl<'a> ops::Add<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn add(self, rhs: Self) -> Decimal {
        self.plus(rhs)
    }
}

impl ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Self) -> Decimal {
        self.minus(&rhs)
    }
}

impl<'a> ops::Sub<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Self) -> Decimal {
        self.minus(rhs)
    }
}

impl ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        self.negate()
    }
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, value| acc.plus(&value))
    }
}

impl<'a> Sum<&'a Decimal> for Decimal {
    fn sum<I: Iterator<Item = &'a Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, value| acc.plus(value))
    }
}

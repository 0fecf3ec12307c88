//! High-level expression API.

use log::debug;
use std::sync::Arc;

use crate::{
    error::Error,
    functions::Function,
    interpreter::{Scope, Value, ValueType, Variable},
    parser::{self, Parser, Span, SpannedExpr},
    registry::Registry,
};

/// Arithmetic expression together with its variables.
///
/// The expression text is parsed on each evaluation. Variables assigned by
/// a successful evaluation are stored in the expression and are visible
/// to subsequent evaluations.
///
/// # Examples
///
/// ```
/// # use decimal_expr::{MathExpression, Value};
/// let mut expr = MathExpression::new("a + b * c")
///     .with_var("a", 7)?
///     .with_var("b", 8)?
///     .with_var("c", 9)?;
/// assert_eq!(expr.evaluate()?, Value::from(79));
/// # Ok::<(), decimal_expr::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct MathExpression {
    source: String,
    scope: Scope,
}

impl MathExpression {
    /// Creates an expression using the standard operators and functions.
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_scope(source, Scope::new())
    }

    /// Creates an expression using operators and functions from `registry`.
    pub fn with_registry(source: impl Into<String>, registry: Arc<Registry>) -> Self {
        Self::with_scope(source, Scope::with_registry(registry))
    }

    /// Creates an expression evaluated in the specified scope.
    pub fn with_scope(source: impl Into<String>, scope: Scope) -> Self {
        MathExpression {
            source: source.into(),
            scope,
        }
    }

    /// Defines a variable.
    pub fn with_var(mut self, name: &str, value: impl Into<Value>) -> Result<Self, Error> {
        self.scope.insert(Variable::new(name, value).map_err(Error::from)?);
        Ok(self)
    }

    /// Defines a variable accepting only values of the specified type.
    pub fn with_typed_var(
        mut self,
        name: &str,
        value: impl Into<Value>,
        ty: ValueType,
    ) -> Result<Self, Error> {
        self.scope
            .insert(Variable::typed(name, value, ty).map_err(Error::from)?);
        Ok(self)
    }

    /// Defines a constant.
    pub fn with_constant(mut self, name: &str, value: impl Into<Value>) -> Result<Self, Error> {
        self.scope
            .insert(Variable::constant(name, value).map_err(Error::from)?);
        Ok(self)
    }

    /// Defines a function available only to this expression.
    pub fn with_fn<F>(mut self, name: &str, function: F) -> Self
    where
        F: Function + 'static,
    {
        self.scope.insert_fn(name, function);
        self
    }

    /// Returns the expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the scope with the expression variables.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns an iterator over the expression variables.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.scope.variables()
    }

    /// Gets the value of a variable.
    pub fn get_var(&self, name: &str) -> Option<&Value> {
        self.scope.get_var(name)
    }

    fn parse<'a>(source: &'a str, registry: &Registry) -> Result<SpannedExpr<'a>, Error> {
        Parser::with_registry(Span::new(source), registry)
            .parse()
            .map_err(Error::from)
    }

    /// Evaluates the expression with the defined variables.
    pub fn evaluate(&mut self) -> Result<Value, Error> {
        debug!("Evaluating `{}`", self.source);
        let expr = Self::parse(&self.source, self.scope.registry())?;
        self.scope.evaluate(&expr).map_err(Error::from)
    }

    /// Evaluates the expression, binding undefined variables to `values`
    /// in the order of their first occurrence.
    pub fn evaluate_positional(&mut self, values: &[Value]) -> Result<Value, Error> {
        debug!("Evaluating `{}` with {} positional value(s)", self.source, values.len());
        let expr = Self::parse(&self.source, self.scope.registry())?;
        self.scope
            .evaluate_positional(&expr, values)
            .map_err(Error::from)
    }

    /// Returns the fully parenthesized form of the expression.
    pub fn to_infix(&self) -> Result<String, Error> {
        Self::parse(&self.source, self.scope.registry()).map(|expr| parser::infix(&expr))
    }

    /// Returns the postfix (reverse Polish) form of the expression.
    pub fn to_postfix(&self) -> Result<String, Error> {
        Self::parse(&self.source, self.scope.registry()).map(|expr| parser::postfix(&expr))
    }

    fn compose(&self, op: &str, other: &Self) -> Self {
        let mut scope = self.scope.clone();
        scope.absorb(&other.scope);
        MathExpression {
            source: format!("({}) {} ({})", self.source, op, other.source),
            scope,
        }
    }

    /// Creates the expression `(self) * (other)`. Variables and functions
    /// of both expressions are kept; those of `self` win on conflicts.
    pub fn multiply(&self, other: &Self) -> Self {
        self.compose("*", other)
    }

    /// Creates the expression `(self) / (other)`.
    pub fn divide(&self, other: &Self) -> Self {
        self.compose("/", other)
    }

    /// Creates the expression `(self) ^ (other)`.
    pub fn pow(&self, other: &Self) -> Self {
        self.compose("^", other)
    }
}

/// Evaluates `source` with undefined variables bound to `values` in the order
/// of their first occurrence.
///
/// # Examples
///
/// ```
/// # use decimal_expr::{evaluate, Value};
/// let value = evaluate("5 + a * b", &[Value::from(5), Value::from(2)])?;
/// assert_eq!(value, Value::from(15));
/// # Ok::<(), decimal_expr::Error>(())
/// ```
pub fn evaluate(source: &str, values: &[Value]) -> Result<Value, Error> {
    MathExpression::new(source).evaluate_positional(values)
}

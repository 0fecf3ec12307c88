//! Values, variables and the tree-walking interpreter.

use failure_derive::*;
use log::{debug, trace};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    decimal::{ArithmeticError, Decimal},
    error::ErrorKind,
    functions::{FnArity, Function},
    parser::{map_span_ref, Expr, Span, Spanned, SpannedExpr},
    registry::Registry,
};

/// Value produced by evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value, e.g., the square root of a negative number.
    Void,
    /// Decimal number.
    Number(Decimal),
    /// Boolean, produced by relational and logical operators.
    Bool(bool),
    /// Text value. Can be supplied as a variable, but not written in an expression.
    Text(String),
}

impl Value {
    /// Returns the type of this value.
    pub fn ty(&self) -> ValueType {
        match self {
            Value::Void => ValueType::Void,
            Value::Number(_) => ValueType::Number,
            Value::Bool(_) => ValueType::Bool,
            Value::Text(_) => ValueType::Text,
        }
    }

    /// Returns the contained number, if any.
    pub fn as_number(&self) -> Option<&Decimal> {
        match self {
            Value::Number(number) => Some(number),
            _ => None,
        }
    }

    /// Returns the contained boolean, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Coerces the value to a decimal via its textual form. `Void` is
    /// converted to `None`.
    pub fn to_decimal(&self) -> Result<Option<Decimal>, EvalError> {
        match self {
            Value::Void => Ok(None),
            Value::Number(number) => Ok(Some(number.clone())),
            other => {
                let text = other.to_string();
                text.parse()
                    .map(Some)
                    .map_err(|_| EvalError::NotANumber {
                        ty: other.ty(),
                        value: text,
                    })
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Void => Ok(()),
            Value::Number(number) => fmt::Display::fmt(number, formatter),
            Value::Bool(flag) => fmt::Display::fmt(flag, formatter),
            Value::Text(text) => formatter.write_str(text),
        }
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Number(value)
    }
}

macro_rules! impl_from_integer {
    ($($int:ty),+) => {
        $(
        impl From<$int> for Value {
            fn from(value: $int) -> Self {
                Value::Number(Decimal::from(value))
            }
        }
        )+
    };
}

impl_from_integer!(i32, i64, u32, u64);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Possible value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Any type.
    Any,
    /// Missing value.
    Void,
    /// Decimal number.
    Number,
    /// Boolean.
    Bool,
    /// Text.
    Text,
}

impl fmt::Display for ValueType {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(match self {
            ValueType::Any => "_",
            ValueType::Void => "void",
            ValueType::Number => "number",
            ValueType::Bool => "bool",
            ValueType::Text => "text",
        })
    }
}

/// Evaluation error.
#[derive(Debug, Fail)]
pub enum EvalError {
    /// Variable is not defined and no positional value is left to bind it.
    #[fail(display = "Variable is not defined")]
    UndefinedVariable,

    /// Function is not registered.
    #[fail(display = "Function is not defined")]
    UndefinedFunction,

    /// Operator is not registered.
    #[fail(display = "Operator `{}` is not defined", _0)]
    UndefinedOperator(String),

    /// Operator cannot be used with a single operand.
    #[fail(display = "Operator `{}` is not unary", _0)]
    NotUnary(String),

    /// Function is called with a wrong number of arguments.
    #[fail(
        display = "The function {} requires {} argument(s), but {} were supplied",
        name, expected, actual
    )]
    ArityMismatch {
        /// Name the function was called by.
        name: String,
        /// Accepted number of arguments.
        expected: FnArity,
        /// Supplied number of arguments.
        actual: usize,
    },

    /// Arithmetic error, such as division by zero.
    #[fail(display = "{}", _0)]
    Arithmetic(#[fail(cause)] ArithmeticError),

    /// LHS of the assignment is a constant.
    #[fail(display = "Cannot assign to a constant")]
    CannotAssignToConstant,

    /// Value cannot be coerced to a number.
    #[fail(display = "Cannot convert {} `{}` to a number", ty, value)]
    NotANumber {
        /// Type of the value.
        ty: ValueType,
        /// Textual form of the value.
        value: String,
    },

    /// Missing value is passed as a function argument.
    #[fail(display = "Missing value cannot be used as a function argument")]
    MissingArgument,

    /// Value does not match the declared type of a variable.
    #[fail(display = "Cannot assign {} to a variable of type {}", actual, expected)]
    TypeMismatch {
        /// Declared variable type.
        expected: ValueType,
        /// Type of the assigned value.
        actual: ValueType,
    },

    /// Variable name does not start with a letter or contains whitespace.
    #[fail(display = "Invalid variable name `{}`", _0)]
    InvalidName(String),

    /// Error while executing a function.
    #[fail(display = "Failed executing function: {}", _0)]
    FunctionCall(#[fail(cause)] failure::Error),
}

impl EvalError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::UndefinedVariable => ErrorKind::UndefinedVariable,
            EvalError::UndefinedFunction => ErrorKind::UndefinedFunction,
            EvalError::UndefinedOperator(_) | EvalError::NotUnary(_) => {
                ErrorKind::UndefinedOperator
            }
            EvalError::ArityMismatch { .. } => ErrorKind::Arity,
            EvalError::Arithmetic(_) => ErrorKind::Arithmetic,
            EvalError::CannotAssignToConstant => ErrorKind::Constant,
            EvalError::NotANumber { .. }
            | EvalError::MissingArgument
            | EvalError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            EvalError::InvalidName(_) => ErrorKind::InvalidName,
            EvalError::FunctionCall(_) => ErrorKind::Function,
        }
    }

    /// Wraps an error returned by a function, keeping arithmetic failures
    /// distinguishable from other ones.
    fn from_function(error: failure::Error) -> Self {
        match error.downcast::<ArithmeticError>() {
            Ok(error) => EvalError::Arithmetic(error),
            Err(error) => EvalError::FunctionCall(error),
        }
    }
}

/// Named variable with an optional declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    value: Option<Value>,
    ty: ValueType,
    constant: bool,
}

impl Variable {
    fn check_name(name: &str) -> Result<(), EvalError> {
        let starts_with_letter = name
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic());
        if starts_with_letter && !name.chars().any(char::is_whitespace) {
            Ok(())
        } else {
            Err(EvalError::InvalidName(name.to_owned()))
        }
    }

    fn check_type(ty: ValueType, value: &Value) -> Result<(), EvalError> {
        let actual = value.ty();
        if ty == ValueType::Any || actual == ValueType::Void || actual == ty {
            Ok(())
        } else {
            Err(EvalError::TypeMismatch {
                expected: ty,
                actual,
            })
        }
    }

    /// Creates a variable accepting values of any type.
    pub fn new(name: &str, value: impl Into<Value>) -> Result<Self, EvalError> {
        Self::typed(name, value, ValueType::Any)
    }

    /// Creates a variable accepting only values of the specified type.
    /// `Void` is accepted regardless of the type.
    pub fn typed(name: &str, value: impl Into<Value>, ty: ValueType) -> Result<Self, EvalError> {
        Self::check_name(name)?;
        let value = value.into();
        Self::check_type(ty, &value)?;
        Ok(Variable {
            name: name.to_owned(),
            value: Some(value),
            ty,
            constant: false,
        })
    }

    /// Creates a variable without a value. It evaluates to `Void` until assigned.
    pub fn declared(name: &str, ty: ValueType) -> Result<Self, EvalError> {
        Self::check_name(name)?;
        Ok(Variable {
            name: name.to_owned(),
            value: None,
            ty,
            constant: false,
        })
    }

    /// Creates a constant that cannot be assigned to in expressions.
    pub fn constant(name: &str, value: impl Into<Value>) -> Result<Self, EvalError> {
        let mut variable = Self::new(name, value)?;
        variable.constant = true;
        Ok(variable)
    }

    /// Returns the variable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Returns the declared type.
    pub fn ty(&self) -> ValueType {
        self.ty
    }

    /// Checks whether the variable is a constant.
    pub fn is_constant(&self) -> bool {
        self.constant
    }

    /// Assigns a new value to the variable.
    pub fn set_value(&mut self, value: Value) -> Result<(), EvalError> {
        if self.constant {
            return Err(EvalError::CannotAssignToConstant);
        }
        Self::check_type(self.ty, &value)?;
        self.value = Some(value);
        Ok(())
    }
}

/// Variable scope containing variables, ad-hoc functions and a reference
/// to the shared registry of operators and functions.
#[derive(Clone)]
pub struct Scope {
    registry: Arc<Registry>,
    variables: HashMap<String, Variable>,
    functions: HashMap<String, Arc<dyn Function>>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let mut functions: Vec<_> = self.functions.keys().collect();
        functions.sort();
        formatter
            .debug_struct("Scope")
            .field("registry", &self.registry)
            .field("variables", &self.variables)
            .field("functions", &functions)
            .finish()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    /// Creates a new scope with the standard registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(Registry::standard()))
    }

    /// Creates a new scope with the specified registry.
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Scope {
            registry,
            variables: HashMap::new(),
            functions: HashMap::new(),
        }
    }

    /// Returns the registry used by this scope.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Gets the value of the variable with the specified name.
    pub fn get_var(&self, name: &str) -> Option<&Value> {
        self.variables.get(name).and_then(Variable::value)
    }

    /// Gets the variable with the specified name.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Returns an iterator over all variables in this scope.
    pub fn variables<'s>(&'s self) -> impl Iterator<Item = &'s Variable> + 's {
        self.variables.values()
    }

    /// Defines a variable, replacing any variable with the same name.
    pub fn insert(&mut self, variable: Variable) -> &mut Self {
        self.variables.insert(variable.name.clone(), variable);
        self
    }

    /// Defines a variable with the specified name and value.
    pub fn insert_var(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self, EvalError> {
        let variable = Variable::new(name, value)?;
        Ok(self.insert(variable))
    }

    /// Defines a constant with the specified name and value.
    pub fn insert_constant(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self, EvalError> {
        let variable = Variable::constant(name, value)?;
        Ok(self.insert(variable))
    }

    /// Removes all variables from the scope. Constants and functions are not removed.
    pub fn clear(&mut self) {
        self.variables.retain(|_, var| var.constant);
    }

    /// Defines an ad-hoc function. It takes precedence over a registry
    /// function with the same name.
    pub fn insert_fn<F>(&mut self, name: &str, function: F) -> &mut Self
    where
        F: Function + 'static,
    {
        self.functions.insert(name.to_owned(), Arc::new(function));
        self
    }

    /// Looks up a function, first among ad-hoc functions, then in the registry.
    pub fn function(&self, name: &str) -> Option<&dyn Function> {
        if let Some(function) = self.functions.get(name) {
            let function: &dyn Function = &**function;
            return Some(function);
        }
        self.registry.function(name)
    }

    /// Copies variables and functions from `other` that are not defined in this scope.
    pub(crate) fn absorb(&mut self, other: &Scope) {
        for (name, variable) in &other.variables {
            self.variables
                .entry(name.clone())
                .or_insert_with(|| variable.clone());
        }
        for (name, function) in &other.functions {
            self.functions
                .entry(name.clone())
                .or_insert_with(|| Arc::clone(function));
        }
    }

    /// Evaluates an expression. Variables assigned during evaluation are
    /// stored in the scope if the evaluation succeeds.
    pub fn evaluate<'a>(
        &mut self,
        expr: &SpannedExpr<'a>,
    ) -> Result<Value, Spanned<'a, EvalError>> {
        self.run(expr, None)
    }

    /// Evaluates an expression, binding undefined variables to `values`
    /// in the order of their first occurrence.
    pub fn evaluate_positional<'a>(
        &mut self,
        expr: &SpannedExpr<'a>,
        values: &[Value],
    ) -> Result<Value, Spanned<'a, EvalError>> {
        let positional = Positional {
            values,
            next: Mutex::new(0),
        };
        self.run(expr, Some(positional))
    }

    fn run<'a>(
        &mut self,
        expr: &SpannedExpr<'a>,
        positional: Option<Positional>,
    ) -> Result<Value, Spanned<'a, EvalError>> {
        let (value, session) = {
            let mut evaluator = Evaluator {
                scope: &*self,
                session: HashMap::new(),
                positional,
            };
            let value = evaluator.visit(expr)?;
            (value, evaluator.session)
        };
        self.variables.extend(session);
        Ok(value)
    }
}

/// Values for first-occurrence binding of undefined variables.
struct Positional<'v> {
    values: &'v [Value],
    next: Mutex<usize>,
}

impl Positional<'_> {
    fn take(&self) -> Option<Value> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        let value = self.values.get(*next).cloned()?;
        *next += 1;
        Some(value)
    }
}

/// Single evaluation pass. Variables bound or assigned during the pass are
/// kept in `session` until the pass succeeds.
struct Evaluator<'s, 'v> {
    scope: &'s Scope,
    session: HashMap<String, Variable>,
    positional: Option<Positional<'v>>,
}

impl<'s> Evaluator<'s, '_> {
    fn lookup(&self, name: &str) -> Option<&Variable> {
        self.session
            .get(name)
            .or_else(|| self.scope.variables.get(name))
    }

    fn visit<'a>(&mut self, expr: &SpannedExpr<'a>) -> Result<Value, Spanned<'a, EvalError>> {
        match &expr.extra {
            Expr::Number(number) => Ok(Value::Number(number.clone())),

            Expr::Variable => self.variable(expr),

            Expr::Function { name, args } => {
                let scope: &'s Scope = self.scope;
                let function = scope
                    .function(name.fragment)
                    .ok_or_else(|| map_span_ref(name, EvalError::UndefinedFunction))?;

                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.visit(arg)?);
                }
                function
                    .check_arity(name.fragment, values.len())
                    .map_err(|e| map_span_ref(expr, e))?;

                let args = values
                    .iter()
                    .zip(args)
                    .map(|(value, arg)| {
                        value
                            .to_decimal()
                            .and_then(|number| number.ok_or(EvalError::MissingArgument))
                            .map_err(|e| map_span_ref(arg, e))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                trace!("Calling `{}` with {} argument(s)", name.fragment, args.len());
                function
                    .execute(&args)
                    .map_err(|e| map_span_ref(expr, EvalError::from_function(e)))
            }

            Expr::Unary { op, inner } => {
                let operand = self.visit(inner)?;
                let symbol = op.extra.symbol();
                let operator = self.scope.registry.operator(symbol).ok_or_else(|| {
                    map_span_ref(op, EvalError::UndefinedOperator(symbol.to_owned()))
                })?;
                if !operator.is_unary() {
                    return Err(map_span_ref(op, EvalError::NotUnary(symbol.to_owned())));
                }
                operator
                    .apply(&Value::Void, &operand)
                    .map_err(|e| map_span_ref(expr, e))
            }

            Expr::Binary { lhs, op, rhs } => {
                let lhs = self.visit(lhs)?;
                let rhs = self.visit(rhs)?;
                let symbol = op.extra.symbol();
                let operator = self.scope.registry.operator(symbol).ok_or_else(|| {
                    map_span_ref(op, EvalError::UndefinedOperator(symbol.to_owned()))
                })?;
                operator.apply(&lhs, &rhs).map_err(|e| map_span_ref(expr, e))
            }

            Expr::Assign { name, value } => {
                let value = self.visit(value)?;
                self.assign(name, value.clone())?;
                Ok(value)
            }
        }
    }

    fn variable<'a>(&mut self, expr: &SpannedExpr<'a>) -> Result<Value, Spanned<'a, EvalError>> {
        let name = expr.fragment;
        if let Some(variable) = self.lookup(name) {
            return Ok(variable.value().cloned().unwrap_or(Value::Void));
        }

        let value = self
            .positional
            .as_ref()
            .and_then(Positional::take)
            .ok_or_else(|| map_span_ref(expr, EvalError::UndefinedVariable))?;
        debug!("Bound variable `{}` to positional value {}", name, value);
        let variable = Variable::new(name, value.clone()).map_err(|e| map_span_ref(expr, e))?;
        self.session.insert(name.to_owned(), variable);
        Ok(value)
    }

    fn assign<'a>(&mut self, name: &Span<'a>, value: Value) -> Result<(), Spanned<'a, EvalError>> {
        let variable = match self.lookup(name.fragment).cloned() {
            Some(mut variable) => {
                variable
                    .set_value(value)
                    .map_err(|e| map_span_ref(name, e))?;
                variable
            }
            None => Variable::new(name.fragment, value).map_err(|e| map_span_ref(name, e))?,
        };
        debug!("Assigned {} to variable `{}`", variable.value().unwrap_or(&Value::Void), name.fragment);
        self.session.insert(name.fragment.to_owned(), variable);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{functions::Abs, parser::Span};
    use assert_matches::assert_matches;

    fn num(s: &str) -> Value {
        Value::Number(s.parse().unwrap())
    }

    fn eval(scope: &mut Scope, input: &str) -> Result<Value, EvalError> {
        let expr = Expr::parse(Span::new(input)).unwrap();
        scope.evaluate(&expr).map_err(|e| e.extra)
    }

    #[test]
    fn value_display_and_coercion() {
        assert_eq!(num("1.50").to_string(), "1.50");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Void.to_string(), "");
        assert_eq!(Value::from("12.5").to_decimal().unwrap(), Some("12.5".parse().unwrap()));
        assert_eq!(Value::Void.to_decimal().unwrap(), None);
        assert_matches!(
            Value::Bool(false).to_decimal().unwrap_err(),
            EvalError::NotANumber { ty: ValueType::Bool, .. }
        );
    }

    #[test]
    fn variable_names_are_validated() {
        assert!(Variable::new("x", 1).is_ok());
        assert!(Variable::new("x_1", 1).is_ok());
        assert_matches!(Variable::new("1x", 1).unwrap_err(), EvalError::InvalidName(_));
        assert_matches!(Variable::new("x y", 1).unwrap_err(), EvalError::InvalidName(_));
        assert_matches!(Variable::new("", 1).unwrap_err(), EvalError::InvalidName(_));
        assert_matches!(Variable::new("_x", 1).unwrap_err(), EvalError::InvalidName(_));
    }

    #[test]
    fn typed_variables() {
        let mut var = Variable::typed("x", 1, ValueType::Number).unwrap();
        assert_matches!(
            var.set_value(Value::Bool(true)).unwrap_err(),
            EvalError::TypeMismatch { expected: ValueType::Number, actual: ValueType::Bool }
        );
        var.set_value(Value::Void).unwrap();
        assert!(Variable::typed("x", "text", ValueType::Number).is_err());

        let mut constant = Variable::constant("pi", num("3.14")).unwrap();
        assert!(constant.is_constant());
        assert_matches!(
            constant.set_value(num("3")).unwrap_err(),
            EvalError::CannotAssignToConstant
        );
    }

    #[test]
    fn evaluating_arithmetic() {
        let mut scope = Scope::new();
        scope.insert_var("a", 7).unwrap().insert_var("b", 8).unwrap();
        assert_eq!(eval(&mut scope, "a + b * 2").unwrap(), num("23"));
        assert_eq!(eval(&mut scope, "-a + +b").unwrap(), num("1"));
        assert_eq!(eval(&mut scope, "2 ^ 3 ^ 2").unwrap(), num("512"));
        assert_eq!(eval(&mut scope, "a % b ^ 2").unwrap(), num("7"));
    }

    #[test]
    fn declared_variables_evaluate_to_void() {
        let mut scope = Scope::new();
        scope.insert(Variable::declared("x", ValueType::Number).unwrap());
        assert_eq!(eval(&mut scope, "x").unwrap(), Value::Void);
        assert_eq!(eval(&mut scope, "x + 2").unwrap(), num("2"));
        assert_eq!(eval(&mut scope, "x * 3").unwrap(), num("3"));
    }

    #[test]
    fn assignment() {
        let mut scope = Scope::new();
        assert_eq!(eval(&mut scope, "a = 2 ^ 3").unwrap(), num("8"));
        assert_eq!(scope.get_var("a"), Some(&num("8")));
        assert_eq!(scope.variables().count(), 1);

        assert_eq!(eval(&mut scope, "a = a * a").unwrap(), num("64"));
        assert_eq!(scope.get_var("a"), Some(&num("64")));
    }

    #[test]
    fn assignment_to_constant() {
        let mut scope = Scope::new();
        scope.insert_constant("pi", num("3.14")).unwrap();
        assert_matches!(eval(&mut scope, "pi = 3").unwrap_err(), EvalError::CannotAssignToConstant);
        assert_eq!(scope.get_var("pi"), Some(&num("3.14")));

        scope.insert_var("x", 1).unwrap();
        scope.clear();
        assert!(scope.get_var("x").is_none());
        assert!(scope.get_var("pi").is_some());
    }

    #[test]
    fn failed_evaluation_does_not_leak_variables() {
        let mut scope = Scope::new();
        let expr = Expr::parse(Span::new("a + b")).unwrap();
        let err = scope.evaluate_positional(&expr, &[num("1")]).unwrap_err();
        assert_matches!(err.extra, EvalError::UndefinedVariable);
        assert_eq!(err.fragment, "b");
        assert_eq!(scope.variables().count(), 0);
    }

    #[test]
    fn positional_binding() {
        let mut scope = Scope::new();
        let expr = Expr::parse(Span::new("x + y * z ^ x")).unwrap();
        let value = scope
            .evaluate_positional(&expr, &[num("1"), num("2"), num("3")])
            .unwrap();
        assert_eq!(value, num("7"));
        assert_eq!(scope.get_var("z"), Some(&num("3")));

        let mut scope = Scope::new();
        scope.insert_var("a", 100).unwrap();
        let expr = Expr::parse(Span::new("a + b")).unwrap();
        let value = scope.evaluate_positional(&expr, &[num("5")]).unwrap();
        assert_eq!(value, num("105"));
    }

    #[test]
    fn evaluation_errors() {
        let mut scope = Scope::new();
        assert_matches!(eval(&mut scope, "abs(x)").unwrap_err(), EvalError::UndefinedVariable);
        assert_matches!(eval(&mut scope, "abss(1)").unwrap_err(), EvalError::UndefinedFunction);
        assert_matches!(
            eval(&mut scope, "abs()").unwrap_err(),
            EvalError::ArityMismatch { actual: 0, .. }
        );
        assert_matches!(
            eval(&mut scope, "1 / 0").unwrap_err(),
            EvalError::Arithmetic(ArithmeticError::DivisionByZero)
        );
        assert_matches!(eval(&mut scope, "abs(sqrt(-1))").unwrap_err(), EvalError::MissingArgument);
        assert_matches!(
            eval(&mut scope, "round(1e5, 9223372036854775807)").unwrap_err(),
            EvalError::Arithmetic(ArithmeticError::ScaleOverflow)
        );
        assert_matches!(
            eval(&mut scope, "round(1, 0.5)").unwrap_err(),
            EvalError::FunctionCall(_)
        );

        scope.insert_var("t", "maybe").unwrap();
        assert_matches!(eval(&mut scope, "t * 2").unwrap_err(), EvalError::NotANumber { .. });
    }

    #[test]
    fn unregistered_operators() {
        let mut registry = Registry::new();
        registry.insert_operator(crate::operators::Arithmetical::mul());
        let mut scope = Scope::with_registry(Arc::new(registry));

        assert_matches!(
            eval(&mut scope, "1 + 2").unwrap_err(),
            EvalError::UndefinedOperator(ref symbol) if symbol == "+"
        );
        assert_matches!(
            eval(&mut scope, "-2").unwrap_err(),
            EvalError::UndefinedOperator(ref symbol) if symbol == "-"
        );
        assert_eq!(eval(&mut scope, "2 * 3").unwrap(), num("6"));
    }

    #[test]
    fn non_unary_operator() {
        let mut registry = Registry::standard();
        registry.insert_operator(crate::operators::Arithmetical::new(
            "-",
            5,
            Decimal::from(0),
            |x, y| Ok(x.minus(y)),
        ));
        let mut scope = Scope::with_registry(Arc::new(registry));
        assert_matches!(eval(&mut scope, "-2").unwrap_err(), EvalError::NotUnary(_));
        assert_eq!(eval(&mut scope, "5 - 2").unwrap(), num("3"));
    }

    #[test]
    fn error_spans() {
        let mut scope = Scope::new();
        let expr = Expr::parse(Span::new("1 + abs(-2, 3)")).unwrap();
        let err = scope.evaluate(&expr).unwrap_err();
        assert_eq!(err.offset, 4);
        assert_eq!(err.fragment, "abs(-2, 3)");

        let expr = Expr::parse(Span::new("1 + foo(2)")).unwrap();
        let err = scope.evaluate(&expr).unwrap_err();
        assert_eq!(err.fragment, "foo");
    }

    #[test]
    fn ad_hoc_functions_shadow_registry() {
        struct Twice;

        impl Function for Twice {
            fn arity(&self) -> FnArity {
                FnArity::Exact(1)
            }

            fn execute(&self, args: &[Decimal]) -> Result<Value, failure::Error> {
                Ok(Value::Number(args[0].times(&Decimal::from(2))?))
            }
        }

        let mut scope = Scope::new();
        scope.insert_fn("abs", Twice);
        assert_eq!(eval(&mut scope, "abs(-3)").unwrap(), num("-6"));
        assert!(scope.function("max").is_some());

        let mut other = Scope::new();
        other.insert_fn("plain", Abs);
        scope.absorb(&other);
        assert_eq!(eval(&mut scope, "plain(-3)").unwrap(), num("3"));
    }
}

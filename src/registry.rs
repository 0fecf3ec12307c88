//! Registry of operators and functions.

use log::debug;
use std::{collections::HashMap, fmt};

use crate::{
    config::Settings,
    functions::{self, Function},
    operators::{Arithmetical, Logical, Operator, Relational},
};

/// Operators keyed by symbol and functions keyed by name.
///
/// The registry is populated once and then only read, so it can be shared
/// among expressions (and threads) via `Arc`. Registering an operator or
/// a function under an existing key replaces the previous entry.
#[derive(Default)]
pub struct Registry {
    operators: HashMap<String, Box<dyn Operator>>,
    functions: HashMap<String, Box<dyn Function>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let mut operators: Vec<_> = self.operators.keys().collect();
        operators.sort();
        let mut functions: Vec<_> = self.functions.keys().collect();
        functions.sort();

        formatter
            .debug_struct("Registry")
            .field("operators", &operators)
            .field("functions", &functions)
            .finish()
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the standard operators and functions
    /// and the default settings.
    pub fn standard() -> Self {
        Self::with_settings(&Settings::default())
    }

    /// Creates a registry with the standard operators and functions
    /// configured according to `settings`.
    pub fn with_settings(settings: &Settings) -> Self {
        let precision = settings.precision();
        let mut registry = Self::new();
        registry
            .insert_operator(Arithmetical::add())
            .insert_operator(Arithmetical::sub())
            .insert_operator(Arithmetical::mul())
            .insert_operator(Arithmetical::div(settings.division()))
            .insert_operator(Arithmetical::rem())
            .insert_operator(Arithmetical::pow(precision))
            .insert_operator(Relational::less())
            .insert_operator(Relational::less_or_equal())
            .insert_operator(Relational::greater())
            .insert_operator(Relational::greater_or_equal())
            .insert_operator(Relational::equal())
            .insert_operator(Relational::not_equal())
            .insert_operator(Logical::and())
            .insert_operator(Logical::or())
            .insert_operator(Logical::not())
            .insert_fn("abs", functions::Abs)
            .insert_fn("max", functions::Max)
            .insert_fn("min", functions::Min)
            .insert_fn("sum", functions::Sum)
            .insert_fn("sqrt", functions::Sqrt { precision })
            .insert_fn("round", functions::Round)
            .insert_fn("sin", functions::Trigonometric::sin(precision))
            .insert_fn("cos", functions::Trigonometric::cos(precision))
            .insert_fn("tan", functions::Trigonometric::tan(precision))
            .insert_fn("random", functions::Random);
        registry
    }

    /// Registers an operator under its symbol.
    pub fn insert_operator<O>(&mut self, operator: O) -> &mut Self
    where
        O: Operator + 'static,
    {
        let symbol = operator.symbol().to_owned();
        if self
            .operators
            .insert(symbol.clone(), Box::new(operator))
            .is_some()
        {
            debug!("Replaced operator `{}`", symbol);
        }
        self
    }

    /// Registers a function under the specified name.
    pub fn insert_fn<F>(&mut self, name: &str, function: F) -> &mut Self
    where
        F: Function + 'static,
    {
        if self
            .functions
            .insert(name.to_owned(), Box::new(function))
            .is_some()
        {
            debug!("Replaced function `{}`", name);
        }
        self
    }

    /// Looks up an operator by symbol.
    pub fn operator(&self, symbol: &str) -> Option<&dyn Operator> {
        self.operators.get(symbol).map(|operator| &**operator)
    }

    /// Looks up a function by name.
    pub fn function(&self, name: &str) -> Option<&dyn Function> {
        self.functions.get(name).map(|function| &**function)
    }

    /// Iterates over registered operator symbols.
    pub fn operator_symbols(&self) -> impl Iterator<Item = &str> + '_ {
        self.operators.keys().map(String::as_str)
    }

    /// Iterates over registered function names.
    pub fn function_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.functions.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decimal::Decimal, interpreter::Value};
    use num_traits::Zero;

    fn assert_shareable<T: Send + Sync>() {}

    #[test]
    fn registry_is_shareable() {
        assert_shareable::<Registry>();
    }

    #[test]
    fn standard_registry() {
        let registry = Registry::standard();
        let mut symbols: Vec<_> = registry.operator_symbols().collect();
        symbols.sort();
        assert_eq!(
            symbols,
            vec!["!", "!=", "%", "&&", "*", "+", "-", "/", "<", "<=", "==", ">", ">=", "^", "||"]
        );

        let mut names: Vec<_> = registry.function_names().collect();
        names.sort();
        assert_eq!(
            names,
            vec!["abs", "cos", "max", "min", "random", "round", "sin", "sqrt", "sum", "tan"]
        );

        assert_eq!(registry.operator("^").unwrap().precedence(), 7);
        assert!(registry.operator("-").unwrap().is_unary());
        assert!(registry.operator("=").is_none());
        assert!(registry.function("abss").is_none());
    }

    #[test]
    fn replacing_entries() {
        let mut registry = Registry::standard();
        registry
            .insert_operator(Arithmetical::new("+", 5, Decimal::zero(), |x, y| {
                Ok(x.minus(y))
            }))
            .insert_fn("abs", functions::Sum);

        let plus = registry.operator("+").unwrap();
        let value = plus
            .apply(&Value::from(5), &Value::from(3))
            .unwrap();
        assert_eq!(value, Value::from(2));
        assert!(!plus.is_unary());
        assert!(registry.function("abs").unwrap().arity().accepts(3));
    }

    #[test]
    fn debug_output_lists_keys() {
        let mut registry = Registry::new();
        registry.insert_fn("sum", functions::Sum);
        assert_eq!(
            format!("{:?}", registry),
            "Registry { operators: [], functions: [\"sum\"] }"
        );
    }
}

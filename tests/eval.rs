use assert_matches::assert_matches;
use std::{sync::Arc, thread};

use decimal_expr::{
    evaluate, functions::{FnArity, Function}, operators::Operator, ArithmeticError, Decimal,
    Division, ErrorKind, MathExpression, Registry, RoundingMode, Scope, Settings, Value,
};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn with_vars(source: &str) -> MathExpression {
    MathExpression::new(source)
        .with_var("a", 7)
        .and_then(|expr| expr.with_var("b", 8))
        .and_then(|expr| expr.with_var("c", 9))
        .and_then(|expr| expr.with_var("d", -8))
        .and_then(|expr| expr.with_var("n", 2))
        .unwrap()
}

fn check_all(cases: &[(&str, &str)]) {
    for &(source, expected) in cases {
        let value = with_vars(source)
            .evaluate()
            .unwrap_or_else(|e| panic!("Error evaluating `{}`: {}", source, e));
        assert_eq!(value, Value::Number(dec(expected)), "{}", source);
    }
}

#[test]
fn eval_arithmetic() {
    //! Checks that operations with the same priority are performed from left to right.

    check_all(&[
        ("1", "1"),
        ("1+2+3+4", "10"),
        ("2 - -4", "6"),
        ("4 + -1", "3"),
        ("1.2 + 0.4", "1.6"),
        ("1.2 + .4", "1.6"),
        ("0.2 - 0.4", "-0.2"),
        ("-4 + 1", "-3"),
        ("-4 + -1", "-5"),
        ("4 * -3", "-12"),
        ("-4 * -3", "12"),
        ("4 / 2", "2"),
        ("2 / 4", "0.5"),
        ("4 / -2", "-2"),
        ("7 % 2", "1"),
        ("7 % -2", "1"),
        ("4 * 3 + 2", "14"),
        ("4 + 3 * 2", "10"),
        ("4 / 2 * 8", "16"),
        ("1 - 2 + 3 - 4", "-2"),
        ("2.5e2 + 10 * 10", "350"),
        ("(2.5e2 + 10) * 10", "2600"),
        ("1E-2 * 100", "1"),
    ]);
}

#[test]
fn eval_parentheses() {
    check_all(&[
        ("(4)", "4"),
        ("(-4)", "-4"),
        ("-(4)", "-4"),
        ("-(-4)", "4"),
        ("-(-(4))", "4"),
        ("(4 + 3)", "7"),
        ("-(3 + 3)", "-6"),
        ("(3) + 1", "4"),
        ("(3) - 1", "2"),
        ("(4 + 3) * 2", "14"),
        ("4 + (3 + 1) + (3 + 1) + 1", "13"),
        ("((4 + 3) * 2)", "14"),
        ("((4 + 3) * 2) * 3", "42"),
        ("((4 + 3) * -2) * 3", "-42"),
        ("((4 + 3) * 2) / -7", "-2"),
        ("(4 / 2) * 8", "16"),
        ("4 / (2 * 8)", "0.25"),
        ("(4 * 2) / 8", "1"),
        ("4 * (2 / 8)", "1.00"),
        ("(4 / (2) * 8)", "16"),
        ("-(3 + -(3 - 4))", "-4"),
    ]);
}

#[test]
fn eval_variables() {
    check_all(&[
        ("3 * (5 + a)", "36"),
        ("3 * (5 + (a * b + c))", "210"),
        ("a", "7"),
        ("(a)", "7"),
        ("-(a)", "-7"),
        ("-((a))", "-7"),
        ("((-a))", "-7"),
        ("(-(a))", "-7"),
        ("(-(+a))", "-7"),
        ("-(-(+a))", "7"),
        ("a * b", "56"),
        ("a * -b", "-56"),
        ("a * -(b)", "-56"),
        ("a * (-b)", "-56"),
        ("(-a) * (-(b))", "56"),
        ("(a * b + c)", "65"),
        ("a + b * c", "79"),
        ("d ^ n", "64"),
        ("n ^ -n", "0.25"),
    ]);
}

#[test]
fn eval_functions() {
    check_all(&[
        ("abs(-a)", "7"),
        ("max(2, abs (-(3)) )", "3"),
        ("min(a, d)", "-8"),
        ("sum(a, b, c, d)", "16"),
        ("sqrt(a * a)", "7"),
        ("round(a / n)", "3.50"),
        ("round(2.5, 0) + round(3.5, 0)", "6"),
        ("cos(0) * a", "7"),
    ]);

    let value = with_vars("sqrt(-a)").evaluate().unwrap();
    assert_eq!(value, Value::Void);
}

#[test]
fn relational_and_logical_operators_on_results() {
    let registry = Registry::standard();
    let apply = |symbol: &str, lhs: &str, rhs: &str| {
        let lhs = with_vars(lhs).evaluate().unwrap();
        let rhs = with_vars(rhs).evaluate().unwrap();
        registry.operator(symbol).unwrap().apply(&lhs, &rhs).unwrap()
    };

    let cases = &[
        ("<", "a", "b", true),
        (">=", "a", "b", false),
        ("==", "a + 1", "b", true),
        ("!=", "a", "7", false),
        ("==", "0.1 + 0.2", "0.3", true),
        ("==", "2.0", "2.00", true),
        ("&&", "a", "sqrt(-1)", false),
        ("||", "a - 7", "b", true),
    ];
    for &(symbol, lhs, rhs, expected) in cases {
        assert_eq!(
            apply(symbol, lhs, rhs),
            Value::Bool(expected),
            "({}) {} ({})",
            lhs,
            symbol,
            rhs
        );
    }

    let not = registry.operator("!").unwrap();
    assert!(not.is_unary());
    assert_eq!(not.apply(&Value::Void, &Value::from("yes")).unwrap(), Value::Bool(false));
}

#[test]
fn comparison_and_logic_symbols_are_not_lexed() {
    for &source in &["1 < 2", "!a", "a && b", "c != 0", "x = a >= 1"] {
        let err = with_vars(source).evaluate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lexical, "{}", source);
    }
}

#[test]
fn text_variables() {
    let mut expr = MathExpression::new("x * 2 + y")
        .with_var("x", "2.5")
        .and_then(|expr| expr.with_var("y", "-1"))
        .unwrap();
    assert_eq!(expr.evaluate().unwrap(), Value::from(4));

    let err = MathExpression::new("x * 2")
        .with_var("x", "yes")
        .and_then(|mut expr| expr.evaluate())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn eval_assignments() {
    let mut expr = MathExpression::new("a = 2 ^ 3");
    assert_eq!(expr.variables().count(), 0);
    assert_eq!(expr.evaluate().unwrap(), Value::from(8));
    let variables: Vec<_> = expr.variables().collect();
    assert_eq!(variables.len(), 1);
    assert_eq!(variables[0].name(), "a");
    assert_eq!(variables[0].value(), Some(&Value::from(8)));

    let mut scope = Scope::new();
    scope.insert_var("a", 7).unwrap();
    for &(source, expected) in &[("k = a", "7"), ("l = k * a", "49"), ("m = -l", "-49")] {
        let mut expr = MathExpression::with_scope(source, scope);
        assert_eq!(expr.evaluate().unwrap(), Value::Number(dec(expected)));
        scope = expr.scope().clone();
    }
    assert_eq!(scope.get_var("m"), Some(&Value::from(-49)));
}

#[test]
fn implicit_variables() {
    let value = evaluate("5 + a * b", &[Value::from(5), Value::from(2)]).unwrap();
    assert_eq!(value, Value::from(15));

    let values = [Value::from(1), Value::from(2), Value::from(3)];
    let value = evaluate("x + y * z ^ x", &values).unwrap();
    assert_eq!(value, Value::from(7));

    let err = evaluate("x + y * z", &values[..2]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedVariable);
    assert_eq!(err.position().unwrap().fragment, "z");
}

#[test]
fn evaluation_errors() {
    let cases = &[
        ("abs(x)", ErrorKind::UndefinedVariable),
        ("abss(1)", ErrorKind::UndefinedFunction),
        ("abs()", ErrorKind::Arity),
        ("max(2,3,4)", ErrorKind::Arity),
        ("sum()", ErrorKind::Arity),
        ("1/3", ErrorKind::Arithmetic),
        ("1 / (a - 7)", ErrorKind::Arithmetic),
        ("a = 1 % 0", ErrorKind::Arithmetic),
        ("round(1, 0.5)", ErrorKind::Function),
    ];
    for &(source, kind) in cases {
        let err = MathExpression::new(source)
            .with_var("a", 7)
            .unwrap()
            .evaluate()
            .unwrap_err();
        assert_eq!(err.kind(), kind, "{}", source);
        assert!(err.position().is_some());
    }

    let mut expr = MathExpression::new("abs()");
    let err = expr.evaluate().unwrap_err();
    assert_eq!(
        err.message(),
        "The function abs requires 1 argument(s), but 0 were supplied (line 1, offset 0, at `abs()`)"
    );
}

#[test]
fn failed_assignment_leaves_variables_intact() {
    let mut expr = MathExpression::new("a = 1 / b")
        .with_var("a", 1)
        .and_then(|expr| expr.with_var("b", 0))
        .unwrap();
    assert!(expr.evaluate().is_err());
    assert_eq!(expr.get_var("a"), Some(&Value::from(1)));
}

#[test]
fn invalid_expressions() {
    let sources = &[
        "-",
        "1 +",
        "1 -",
        "1 + -",
        "--1",
        "1 * / 1",
        "*1",
        "(1",
        "1 * (",
        "1 - )",
        "(1))",
        "((1)",
        "((1 + 1)) * 2)",
        "1 * ()",
        "1 (*) 1",
        "",
        "a = ",
        "1 = a",
        "f(1,)",
    ];
    for &source in sources {
        let err = MathExpression::new(source).evaluate().unwrap_err();
        assert_matches!(
            err.kind(),
            ErrorKind::MismatchedToken | ErrorKind::NoViableAlt,
            "{}",
            source
        );
        assert!(err.position().is_some());
    }

    let err = MathExpression::new("1 + #").evaluate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lexical);
    assert_eq!(err.position().unwrap().offset, 4);
}

#[test]
fn scaled_division() {
    let settings = Settings::default().with_division(Division::Scaled {
        scale: 10,
        rounding: RoundingMode::HalfEven,
    });
    let registry = Arc::new(Registry::with_settings(&settings));
    let mut expr = MathExpression::with_registry("1 / 3 * 3", registry);
    assert_eq!(expr.evaluate().unwrap(), Value::Number(dec("0.9999999999")));
}

#[test]
fn parenthesization_and_infix_output_preserve_value() {
    let settings = Settings::default().with_division(Division::Scaled {
        scale: 10,
        rounding: RoundingMode::HalfEven,
    });
    let registry = Arc::new(Registry::with_settings(&settings));
    let expr = |source: &str| MathExpression::with_registry(source, Arc::clone(&registry));

    let cases = &[
        ("3+4*5/6", "3+((4*5)/6)"),
        ("(300+23)*(43-21)/(84+7)", "((300+23)*(43-21))/(84+7)"),
    ];
    for &(source, equivalent) in cases {
        let infix = expr(source).to_infix().unwrap();
        let values: Vec<_> = [source, source, equivalent, infix.as_str(), infix.as_str()]
            .iter()
            .map(|&source| expr(source).evaluate().unwrap())
            .collect();
        for value in &values[1..] {
            assert_eq!(*value, values[0], "{}", source);
        }
    }

    let value = expr("3+4*5/6").evaluate().unwrap();
    assert_eq!(value, Value::Number(dec("6.3333333333")));
}

#[test]
fn scale_overflow_is_arithmetic_error() {
    let sources = &[
        "round(1e5, 9223372036854775807)",
        "round(2, 10000000000)",
        "(1e-2000000000 * 1e-2000000000) ^ 4294967295",
        "1e-2000000000 ^ 2",
    ];
    for &source in sources {
        let err = MathExpression::new(source).evaluate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arithmetic, "{}", source);
        assert!(err.position().is_some());
    }
}

#[test]
fn arithmetic_errors_from_functions() {
    struct Reciprocal;

    impl Function for Reciprocal {
        fn arity(&self) -> FnArity {
            FnArity::Exact(1)
        }

        fn execute(&self, args: &[Decimal]) -> Result<Value, failure::Error> {
            let value = Decimal::from(1).divide(&args[0])?;
            Ok(Value::Number(value))
        }
    }

    let mut expr = MathExpression::new("inv(a) + inv(a - 4)")
        .with_fn("inv", Reciprocal)
        .with_var("a", 4)
        .unwrap();
    let err = expr.evaluate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arithmetic);
    assert_eq!(err.position().unwrap().fragment, "inv(a - 4)");

    let err = MathExpression::new("inv(3)")
        .with_fn("inv", Reciprocal)
        .evaluate()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arithmetic);
    assert!(err.message().contains(&ArithmeticError::NonTerminating.to_string()));
}

#[test]
fn custom_operator_precedence() {
    use decimal_expr::operators::Arithmetical;

    let mut registry = Registry::standard();
    // `%` as a percentage of the LHS, binding tighter than `^`.
    registry.insert_operator(Arithmetical::new("%", 8, Decimal::from(1), |x, y| {
        x.times(y)?.divide(&Decimal::from(100))
    }));
    let mut expr = MathExpression::with_registry("2 ^ 50 % 4", Arc::new(registry));
    assert_eq!(expr.to_infix().unwrap(), "(2 ^ (50 % 4))");
    assert_eq!(expr.evaluate().unwrap(), Value::from(4));
}

#[test]
fn concurrent_evaluation() {
    let registry = Arc::new(Registry::standard());
    let handles: Vec<_> = (0..4_i64)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                MathExpression::with_registry("x * x + 1", registry)
                    .with_var("x", i)
                    .and_then(|mut expr| expr.evaluate())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let value = handle.join().unwrap().unwrap();
        let i = i as i64;
        assert_eq!(value, Value::from(i * i + 1));
    }
}

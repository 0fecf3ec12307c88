//! Error kinds and the owned error type returned by the high-level API.

use failure_derive::*;
use std::fmt;

use crate::{
    interpreter::EvalError,
    parser::{ParseError, Spanned},
};

/// Kind of an error, independent of the stage that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input character matches no token rule.
    Lexical,
    /// Parser expected one token and found another.
    MismatchedToken,
    /// No grammar production matches the lookahead.
    NoViableAlt,
    /// Variable has no binding at evaluation time.
    UndefinedVariable,
    /// Call references an unregistered function.
    UndefinedFunction,
    /// Operator symbol has no registered implementation, or cannot be used
    /// in the requested position.
    UndefinedOperator,
    /// Function called with a wrong number of arguments.
    Arity,
    /// Arithmetic failure, e.g., a non-terminating division.
    Arithmetic,
    /// Assignment to a constant.
    Constant,
    /// Value cannot be coerced or does not match a declared type.
    TypeMismatch,
    /// Variable name does not start with a letter or contains whitespace.
    InvalidName,
    /// Function body reported a failure.
    Function,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(match self {
            ErrorKind::Lexical => "lexical error",
            ErrorKind::MismatchedToken => "mismatched token",
            ErrorKind::NoViableAlt => "no viable alternative",
            ErrorKind::UndefinedVariable => "undefined variable",
            ErrorKind::UndefinedFunction => "undefined function",
            ErrorKind::UndefinedOperator => "undefined operator",
            ErrorKind::Arity => "arity mismatch",
            ErrorKind::Arithmetic => "arithmetic error",
            ErrorKind::Constant => "assignment to constant",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::InvalidName => "invalid variable name",
            ErrorKind::Function => "function error",
        })
    }
}

/// Location of an error in the expression text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Byte offset from the start of the expression.
    pub offset: usize,
    /// 1-based line number.
    pub line: u32,
    /// Source fragment the error relates to. Empty at the end of input.
    pub fragment: String,
}

impl Position {
    pub(crate) fn new<T>(span: &Spanned<T>) -> Self {
        Position {
            offset: span.offset,
            line: span.line,
            fragment: span.fragment.to_owned(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        if self.fragment.is_empty() {
            write!(formatter, "line {}, offset {}", self.line, self.offset)
        } else {
            write!(
                formatter,
                "line {}, offset {}, at `{}`",
                self.line, self.offset, self.fragment
            )
        }
    }
}

/// Error raised while parsing or evaluating an expression.
///
/// Unlike [`ParseError`] and [`EvalError`], this type does not borrow
/// the expression text and can be freely passed around.
///
/// [`ParseError`]: parser/enum.ParseError.html
/// [`EvalError`]: enum.EvalError.html
#[derive(Debug, Clone, Fail)]
#[fail(display = "{}", message)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    position: Option<Position>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            position: None,
        }
    }

    fn spanned<T>(kind: ErrorKind, description: impl fmt::Display, span: &Spanned<T>) -> Self {
        let position = Position::new(span);
        Error {
            kind,
            message: format!("{} ({})", description, position),
            position: Some(position),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the error location, if the error relates to a specific
    /// part of the expression.
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }
}

impl From<Spanned<'_, ParseError>> for Error {
    fn from(err: Spanned<'_, ParseError>) -> Self {
        Error::spanned(err.extra.kind(), err.extra, &err)
    }
}

impl From<EvalError> for Error {
    fn from(err: EvalError) -> Self {
        Error::new(err.kind(), err.to_string())
    }
}

impl From<Spanned<'_, EvalError>> for Error {
    fn from(err: Spanned<'_, EvalError>) -> Self {
        Error::spanned(err.extra.kind(), &err.extra, &err)
    }
}

//! Packrat parser turning expression text into an AST.
//!
//! The grammar is
//!
//! ```text
//! statement  := expression END | assignment END
//! assignment := IDENT '=' expression
//! expression := term (BINARY_OP term)*     # combined by operator priority
//! term       := NUMBER | call | IDENT | '(' expression ')' | unary
//! call       := IDENT '(' (expression (',' expression)*)? ')'
//! unary      := ('+' | '-') (NUMBER | call | IDENT | '(' expression ')')
//! ```
//!
//! Alternatives are resolved by speculation: the parser marks its position
//! in the token buffer, tries an alternative and rewinds if it fails.
//! Outcomes of rules are memoized per starting token, so a rule is parsed
//! at most once at each position.

use log::trace;
use nom_locate::{LocatedSpan, LocatedSpanEx};
use std::{collections::HashMap, fmt};

use crate::{
    decimal::Decimal,
    error::ErrorKind,
    lexer::{Lexer, Token, TokenKind},
    registry::Registry,
};


/// Code span.
pub type Span<'a> = LocatedSpan<&'a str>;
/// Value with an associated code span.
pub type Spanned<'a, T> = LocatedSpanEx<&'a str, T>;

pub(crate) fn create_span<T, U>(span: Spanned<T>, extra: U) -> Spanned<U> {
    Spanned {
        offset: span.offset,
        line: span.line,
        fragment: span.fragment,
        extra,
    }
}

pub(crate) fn map_span_ref<'a, T, U>(span: &Spanned<'a, T>, extra: U) -> Spanned<'a, U> {
    Spanned {
        offset: span.offset,
        line: span.line,
        fragment: span.fragment,
        extra,
    }
}

fn unite_spans<'a, T, U>(input: Span<'a>, start: &Spanned<T>, end: &Spanned<U>) -> Span<'a> {
    debug_assert!(input.offset <= start.offset);
    debug_assert!(start.offset <= end.offset);
    debug_assert!(input.offset + input.fragment.len() >= end.offset + end.fragment.len());

    let start_idx = start.offset - input.offset;
    let end_idx = end.offset + end.fragment.len() - input.offset;
    Span {
        offset: start.offset,
        line: start.line,
        fragment: &input.fragment[start_idx..end_idx],
        extra: (),
    }
}

/// Parsing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// Assignment target.
    Var,
    /// Function invocation.
    Fun,
    /// Arithmetic expression.
    Expr,
}

impl fmt::Display for Context {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Context::Var => formatter.write_str("assignment"),
            Context::Fun => formatter.write_str("function call"),
            Context::Expr => formatter.write_str("arithmetic expression"),
        }
    }
}

/// Parsing error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParseError {
    /// No token rule accepts this character.
    UnexpectedChar,

    /// Numeric literal cannot be represented (e.g., its exponent overflows).
    InvalidNumber,

    /// The parser expected a specific token and found another one.
    Mismatched {
        /// Parsing context.
        context: Context,
        /// Expected token kind.
        expected: TokenKind,
        /// Actual token kind.
        found: TokenKind,
    },

    /// No grammar rule applies to the token.
    NoViableAlt {
        /// Parsing context.
        context: Context,
        /// Actual token kind.
        found: TokenKind,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::UnexpectedChar => formatter.write_str("Unexpected character"),
            ParseError::InvalidNumber => formatter.write_str("Malformed number literal"),
            ParseError::Mismatched {
                context,
                expected,
                found,
            } => write!(
                formatter,
                "Mismatched input in {}: expected {}, found {}",
                context, expected, found
            ),
            ParseError::NoViableAlt { context, found } => write!(
                formatter,
                "No viable alternative in {} at {}",
                context, found
            ),
        }
    }
}

impl ParseError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::UnexpectedChar | ParseError::InvalidNumber => ErrorKind::Lexical,
            ParseError::Mismatched { .. } => ErrorKind::MismatchedToken,
            ParseError::NoViableAlt { .. } => ErrorKind::NoViableAlt,
        }
    }

    /// Lexical errors abort parsing regardless of pending alternatives.
    fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Lexical
    }
}

/// Binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Addition (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`).
    Mul,
    /// Division (`/`).
    Div,
    /// Remainder (`%`).
    Rem,
    /// Power (`^`).
    Pow,
}

impl BinaryOp {
    fn from_token(token: Token) -> Option<Spanned<Self>> {
        let op = match (token.extra, token.fragment) {
            (TokenKind::Sign, "+") => BinaryOp::Add,
            (TokenKind::Sign, "-") => BinaryOp::Sub,
            (TokenKind::Operator, "*") => BinaryOp::Mul,
            (TokenKind::Operator, "/") => BinaryOp::Div,
            (TokenKind::Operator, "%") => BinaryOp::Rem,
            (TokenKind::Operator, "^") => BinaryOp::Pow,
            _ => return None,
        };
        Some(create_span(token, op))
    }

    /// Returns the operator symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "^",
        }
    }

    /// Returns the default priority of the operation. Operations with
    /// higher priority bind tighter.
    pub fn priority(self) -> usize {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
            BinaryOp::Pow => 7,
        }
    }

    /// `x ^ y ^ z` is `x ^ (y ^ z)`; all other operations group to the left.
    pub fn is_right_assoc(self) -> bool {
        self == BinaryOp::Pow
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(self.symbol())
    }
}

/// Unary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Identity (`+x`).
    Plus,
    /// Negation (`-x`).
    Minus,
}

impl UnaryOp {
    /// Returns the operator symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(self.symbol())
    }
}

/// Expression AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    /// Number literal, e.g., `2.5e3`.
    Number(Decimal),

    /// Variable use, e.g., `x`. The variable name is the span fragment.
    Variable,

    /// Function call, e.g., `max(x, 1)`.
    Function {
        /// Function name.
        name: Span<'a>,
        /// Function arguments.
        args: Vec<SpannedExpr<'a>>,
    },

    /// Unary operation, e.g., `-x`.
    Unary {
        /// Operator.
        op: Spanned<'a, UnaryOp>,
        /// Operand.
        inner: Box<SpannedExpr<'a>>,
    },

    /// Binary operation, e.g., `x + 1`.
    Binary {
        /// LHS of the operation.
        lhs: Box<SpannedExpr<'a>>,
        /// Operator.
        op: Spanned<'a, BinaryOp>,
        /// RHS of the operation.
        rhs: Box<SpannedExpr<'a>>,
    },

    /// Assignment, e.g., `x = y * 2`. Can only occur at the top level.
    Assign {
        /// Name of the assigned variable.
        name: Span<'a>,
        /// Assigned value.
        value: Box<SpannedExpr<'a>>,
    },
}

/// `Expr` with the associated code span.
pub type SpannedExpr<'a> = Spanned<'a, Expr<'a>>;

impl<'a> Expr<'a> {
    /// Parses an expression or an assignment.
    pub fn parse(input: Span<'a>) -> Result<SpannedExpr<'a>, Spanned<'a, ParseError>> {
        Parser::new(input).parse()
    }
}

/// Renders an expression in the fully parenthesized infix form, e.g.,
/// `3+4*5/6` becomes `(3 + ((4 * 5) / 6))`. The output parses back
/// into an equivalent expression.
pub fn infix(expr: &SpannedExpr) -> String {
    match &expr.extra {
        Expr::Number(value) => value.to_string(),
        Expr::Variable => expr.fragment.to_owned(),
        Expr::Function { name, args } => {
            let args: Vec<_> = args.iter().map(infix).collect();
            format!("{}({})", name.fragment, args.join(", "))
        }
        Expr::Unary { op, inner } => format!("({}{})", op.extra, infix(inner)),
        Expr::Binary { lhs, op, rhs } => {
            format!("({} {} {})", infix(lhs), op.extra, infix(rhs))
        }
        Expr::Assign { name, value } => format!("{} = {}", name.fragment, infix(value)),
    }
}

/// Renders an expression in the reverse Polish notation, e.g., `3+4*5/6`
/// becomes `3 4 5 * 6 / +`. Unary operators are prefixed with `u`
/// (`-x` becomes `x u-`); function calls are rendered as `name/arity`.
pub fn postfix(expr: &SpannedExpr) -> String {
    fn push_terms(expr: &SpannedExpr, output: &mut Vec<String>) {
        match &expr.extra {
            Expr::Number(value) => output.push(value.to_string()),
            Expr::Variable => output.push(expr.fragment.to_owned()),
            Expr::Function { name, args } => {
                for arg in args {
                    push_terms(arg, output);
                }
                output.push(format!("{}/{}", name.fragment, args.len()));
            }
            Expr::Unary { op, inner } => {
                push_terms(inner, output);
                output.push(format!("u{}", op.extra));
            }
            Expr::Binary { lhs, op, rhs } => {
                push_terms(lhs, output);
                push_terms(rhs, output);
                output.push(op.extra.to_string());
            }
            Expr::Assign { name, value } => {
                output.push(name.fragment.to_owned());
                push_terms(value, output);
                output.push("=".to_owned());
            }
        }
    }

    let mut output = vec![];
    push_terms(expr, &mut output);
    output.join(" ")
}

type ParseResult<'a, T> = Result<T, Spanned<'a, ParseError>>;

/// Rules with memoized outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Rule {
    Expression,
    Call,
    Paren,
    Unary,
}

#[derive(Debug)]
enum Memo<'a> {
    Failed(Spanned<'a, ParseError>),
    Parsed { stop: usize, node: SpannedExpr<'a> },
}

/// Speculative recursive-descent parser with memoization (a packrat parser).
///
/// Tokens are pulled from the lexer on demand and buffered, so the parser
/// can look arbitrarily far ahead and rewind to any earlier position.
/// A parser instance handles a single expression.
pub struct Parser<'a, 'r> {
    input: Span<'a>,
    lexer: Lexer<'a>,
    tokens: Vec<Token<'a>>,
    position: usize,
    markers: Vec<usize>,
    memo: HashMap<(Rule, usize), Memo<'a>>,
    registry: Option<&'r Registry>,
}

impl fmt::Debug for Parser<'_, '_> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("Parser")
            .field("input", &self.input)
            .field("tokens", &self.tokens)
            .field("position", &self.position)
            .field("memo_len", &self.memo.len())
            .finish()
    }
}

impl<'a> Parser<'a, 'static> {
    /// Creates a parser using default operator priorities.
    pub fn new(input: Span<'a>) -> Self {
        Parser {
            input,
            lexer: Lexer::new(input),
            tokens: vec![],
            position: 0,
            markers: vec![],
            memo: HashMap::new(),
            registry: None,
        }
    }
}

impl<'a, 'r> Parser<'a, 'r> {
    /// Creates a parser taking binary operator priorities from the registry.
    /// Operators missing from the registry use their default priority.
    pub fn with_registry(input: Span<'a>, registry: &'r Registry) -> Self {
        Parser {
            input,
            lexer: Lexer::new(input),
            tokens: vec![],
            position: 0,
            markers: vec![],
            memo: HashMap::new(),
            registry: Some(registry),
        }
    }

    /// Parses the input as a single expression or assignment.
    pub fn parse(mut self) -> ParseResult<'a, SpannedExpr<'a>> {
        let expr_error = match self.attempt(|parser| parser.terminated(Self::expression))? {
            Ok(expr) => return Ok(expr),
            Err(err) => err,
        };
        let assign_error = match self.attempt(|parser| parser.terminated(Self::assignment))? {
            Ok(expr) => return Ok(expr),
            Err(err) => err,
        };

        // Report the alternative that got further into the input.
        Err(if assign_error.offset > expr_error.offset {
            assign_error
        } else {
            expr_error
        })
    }

    fn priority(&self, op: BinaryOp) -> usize {
        self.registry
            .and_then(|registry| registry.operator(op.symbol()))
            .map_or_else(|| op.priority(), |operator| operator.precedence())
    }

    /// Returns the `i`-th token of the lookahead, starting from 1.
    fn token(&mut self, i: usize) -> ParseResult<'a, Token<'a>> {
        debug_assert!(i >= 1);
        let index = self.position + i - 1;
        while self.tokens.len() <= index {
            match self.lexer.next() {
                Some(token) => self.tokens.push(token?),
                None => break,
            }
        }

        // The lexer is exhausted; everything past the end is `End`.
        let token = self.tokens.get(index).or_else(|| self.tokens.last());
        token
            .copied()
            .ok_or_else(|| create_span(self.input, ParseError::UnexpectedChar))
    }

    fn lookahead(&mut self, i: usize) -> ParseResult<'a, TokenKind> {
        self.token(i).map(|token| token.extra)
    }

    fn consume(&mut self) {
        self.position += 1;
    }

    fn expect(&mut self, kind: TokenKind, context: Context) -> ParseResult<'a, Token<'a>> {
        let token = self.token(1)?;
        if token.extra == kind {
            self.consume();
            Ok(token)
        } else {
            let err = ParseError::Mismatched {
                context,
                expected: kind,
                found: token.extra,
            };
            Err(create_span(token, err))
        }
    }

    fn mark(&mut self) {
        self.markers.push(self.position);
    }

    fn release(&mut self) {
        if let Some(position) = self.markers.pop() {
            self.position = position;
        }
    }

    /// Runs `parse` speculatively. On a recoverable failure, rewinds to
    /// the starting position and returns the error as `Ok(Err(_))`.
    fn attempt<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> ParseResult<'a, T>,
    ) -> ParseResult<'a, ParseResult<'a, T>> {
        self.mark();
        match parse(self) {
            Ok(output) => {
                self.markers.pop();
                Ok(Ok(output))
            }
            Err(err) if err.extra.is_fatal() => {
                self.markers.pop();
                Err(err)
            }
            Err(err) => {
                self.release();
                trace!(
                    "Speculation failed at token {}: {} (offset {})",
                    self.position,
                    err.extra,
                    err.offset
                );
                Ok(Err(err))
            }
        }
    }

    fn speculate(&mut self, rule: Rule) -> ParseResult<'a, ParseResult<'a, SpannedExpr<'a>>> {
        self.attempt(|parser| parser.apply(rule))
    }

    /// Applies a rule at the current position, reusing a memoized outcome
    /// if there is one.
    fn apply(&mut self, rule: Rule) -> ParseResult<'a, SpannedExpr<'a>> {
        let start = self.position;
        if let Some(memo) = self.memo.get(&(rule, start)) {
            trace!("Reusing {:?} outcome at token {}", rule, start);
            return match memo {
                Memo::Failed(err) => Err(*err),
                Memo::Parsed { stop, node } => {
                    self.position = *stop;
                    Ok(node.clone())
                }
            };
        }

        let result = match rule {
            Rule::Expression => self.binary_expr(0),
            Rule::Call => self.call(),
            Rule::Paren => self.paren(),
            Rule::Unary => self.unary(),
        };
        match &result {
            Ok(node) => {
                let memo = Memo::Parsed {
                    stop: self.position,
                    node: node.clone(),
                };
                self.memo.insert((rule, start), memo);
            }
            Err(err) if !err.extra.is_fatal() => {
                self.memo.insert((rule, start), Memo::Failed(*err));
            }
            Err(_) => { /* fatal errors are not cached */ }
        }
        result
    }

    fn terminated(
        &mut self,
        parse: fn(&mut Self) -> ParseResult<'a, SpannedExpr<'a>>,
    ) -> ParseResult<'a, SpannedExpr<'a>> {
        let expr = parse(self)?;
        self.expect(TokenKind::End, Context::Expr)?;
        Ok(expr)
    }

    fn expression(&mut self) -> ParseResult<'a, SpannedExpr<'a>> {
        self.apply(Rule::Expression)
    }

    fn assignment(&mut self) -> ParseResult<'a, SpannedExpr<'a>> {
        let name = self.expect(TokenKind::Ident, Context::Var)?;
        self.expect(TokenKind::Equals, Context::Var)?;
        let value = self.expression()?;

        let span = unite_spans(self.input, &name, &value);
        let assign = Expr::Assign {
            name: create_span(name, ()),
            value: Box::new(value),
        };
        Ok(create_span(span, assign))
    }

    /// Precedence climbing: parses terms joined by operators with priority
    /// of at least `min_priority`.
    fn binary_expr(&mut self, min_priority: usize) -> ParseResult<'a, SpannedExpr<'a>> {
        let mut lhs = self.term()?;
        loop {
            let op = match BinaryOp::from_token(self.token(1)?) {
                Some(op) => op,
                None => break,
            };
            let priority = self.priority(op.extra);
            if priority < min_priority {
                break;
            }
            self.consume();

            let rhs_priority = if op.extra.is_right_assoc() {
                priority
            } else {
                priority + 1
            };
            let rhs = self.binary_expr(rhs_priority)?;
            let span = unite_spans(self.input, &lhs, &rhs);
            let binary = Expr::Binary {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            };
            lhs = create_span(span, binary);
        }
        Ok(lhs)
    }

    fn term(&mut self) -> ParseResult<'a, SpannedExpr<'a>> {
        let token = self.token(1)?;
        match token.extra {
            TokenKind::Number => self.number(),

            TokenKind::Ident => {
                let call_error = match self.speculate(Rule::Call)? {
                    Ok(call) => return Ok(call),
                    Err(err) => err,
                };
                // `name(` can only start a call, so its error is the relevant one.
                if self.lookahead(2)? == TokenKind::LeftParen {
                    Err(call_error)
                } else {
                    self.consume();
                    Ok(create_span(token, Expr::Variable))
                }
            }

            TokenKind::LeftParen => self.apply(Rule::Paren),
            TokenKind::Sign => self.apply(Rule::Unary),

            found => {
                let err = ParseError::NoViableAlt {
                    context: Context::Expr,
                    found,
                };
                Err(create_span(token, err))
            }
        }
    }

    fn number(&mut self) -> ParseResult<'a, SpannedExpr<'a>> {
        let token = self.expect(TokenKind::Number, Context::Expr)?;
        let value = token
            .fragment
            .parse::<Decimal>()
            .map_err(|_| create_span(token, ParseError::InvalidNumber))?;
        Ok(create_span(token, Expr::Number(value)))
    }

    fn call(&mut self) -> ParseResult<'a, SpannedExpr<'a>> {
        let name = self.expect(TokenKind::Ident, Context::Fun)?;
        self.expect(TokenKind::LeftParen, Context::Fun)?;

        let mut args = vec![];
        if self.lookahead(1)? != TokenKind::RightParen {
            args.push(self.expression()?);
            while self.lookahead(1)? == TokenKind::Comma {
                self.consume();
                args.push(self.expression()?);
            }
        }
        let closing = self.expect(TokenKind::RightParen, Context::Fun)?;

        let span = unite_spans(self.input, &name, &closing);
        let call = Expr::Function {
            name: create_span(name, ()),
            args,
        };
        Ok(create_span(span, call))
    }

    fn paren(&mut self) -> ParseResult<'a, SpannedExpr<'a>> {
        let opening = self.expect(TokenKind::LeftParen, Context::Expr)?;
        let inner = self.expression()?;
        let closing = self.expect(TokenKind::RightParen, Context::Expr)?;
        if let Expr::Variable = inner.extra {
            // The variable name is its span fragment.
            return Ok(inner);
        }
        Ok(create_span(
            unite_spans(self.input, &opening, &closing),
            inner.extra,
        ))
    }

    fn unary(&mut self) -> ParseResult<'a, SpannedExpr<'a>> {
        let token = self.token(1)?;
        let op = match (token.extra, token.fragment) {
            (TokenKind::Sign, "+") => UnaryOp::Plus,
            (TokenKind::Sign, _) => UnaryOp::Minus,
            (found, _) => {
                let err = ParseError::NoViableAlt {
                    context: Context::Expr,
                    found,
                };
                return Err(create_span(token, err));
            }
        };
        self.consume();

        // Only a primary term may follow; `--1` or `-*1` are rejected.
        let operand_token = self.token(1)?;
        let inner = match operand_token.extra {
            TokenKind::Number | TokenKind::Ident | TokenKind::LeftParen => self.term()?,
            found => {
                let err = ParseError::NoViableAlt {
                    context: Context::Expr,
                    found,
                };
                return Err(create_span(operand_token, err));
            }
        };

        let span = unite_spans(self.input, &token, &inner);
        let unary = Expr::Unary {
            op: create_span(token, op),
            inner: Box::new(inner),
        };
        Ok(create_span(span, unary))
    }
}

//! Tokenizer producing a lazy stream of tokens.

use nom::{
    branch::alt,
    bytes::complete::take_while,
    character::complete::{alpha1, char as tag_char, digit1, one_of},
    combinator::{map, opt, recognize},
    sequence::{pair, tuple},
    IResult,
};
use std::fmt;

use crate::parser::{create_span, ParseError, Span, Spanned};

/// Token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// End of input. Produced exactly once, as the last token.
    End,
    /// `+` or `-`. Whether the sign is unary or binary is decided by the parser.
    Sign,
    /// Binary operator other than a sign: `*`, `/`, `%` or `^`.
    Operator,
    /// `(`.
    LeftParen,
    /// `)`.
    RightParen,
    /// `=`.
    Equals,
    /// `,`.
    Comma,
    /// Identifier consisting of ASCII letters, e.g., `abs`.
    Ident,
    /// Numeric literal, e.g., `2.5e-3` or `.4`.
    Number,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(match self {
            TokenKind::End => "end of input",
            TokenKind::Sign => "sign",
            TokenKind::Operator => "operator",
            TokenKind::LeftParen => "`(`",
            TokenKind::RightParen => "`)`",
            TokenKind::Equals => "`=`",
            TokenKind::Comma => "`,`",
            TokenKind::Ident => "identifier",
            TokenKind::Number => "number",
        })
    }
}

/// Token together with its span in the source text.
pub type Token<'a> = Spanned<'a, TokenKind>;

type LexResult<'a, T> = IResult<Span<'a>, T>;

fn is_whitespace(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\n' || c == '\r' || c == '\x0c'
}

/// Number literal: digits with an optional fraction and exponent.
fn number(input: Span) -> LexResult<Span> {
    let mantissa = alt((
        recognize(pair(digit1, opt(pair(tag_char('.'), digit1)))),
        recognize(pair(tag_char('.'), digit1)),
    ));
    let exponent = tuple((one_of("eE"), opt(one_of("+-")), digit1));
    recognize(pair(mantissa, opt(exponent)))(input)
}

/// Binary operators except for signs.
fn operator(input: Span) -> LexResult<Span> {
    recognize(one_of("*/%^"))(input)
}

fn whitespace(input: Span) -> LexResult<Span> {
    take_while(is_whitespace)(input)
}

fn single<'a>(c: char, kind: TokenKind) -> impl Fn(Span<'a>) -> LexResult<'a, Token<'a>> {
    map(recognize(tag_char(c)), move |span| create_span(span, kind))
}

fn token(input: Span) -> LexResult<Token> {
    alt((
        map(number, |span| create_span(span, TokenKind::Number)),
        map(alpha1, |span| create_span(span, TokenKind::Ident)),
        map(operator, |span| create_span(span, TokenKind::Operator)),
        map(recognize(one_of("+-")), |span| create_span(span, TokenKind::Sign)),
        single('(', TokenKind::LeftParen),
        single(')', TokenKind::RightParen),
        single('=', TokenKind::Equals),
        single(',', TokenKind::Comma),
    ))(input)
}

/// Lazy token stream over an expression.
///
/// The lexer yields tokens until (and including) [`TokenKind::End`]. On
/// an unrecognized character it yields a single error and stops.
///
/// [`TokenKind::End`]: enum.TokenKind.html#variant.End
#[derive(Debug)]
pub struct Lexer<'a> {
    rest: Span<'a>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over the specified input.
    pub fn new(input: Span<'a>) -> Self {
        Lexer {
            rest: input,
            finished: false,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, Spanned<'a, ParseError>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if let Ok((rest, _)) = whitespace(self.rest) {
            self.rest = rest;
        }

        if self.rest.fragment.is_empty() {
            self.finished = true;
            return Some(Ok(create_span(self.rest, TokenKind::End)));
        }

        match token(self.rest) {
            Ok((rest, token)) => {
                self.rest = rest;
                Some(Ok(token))
            }
            Err(_) => {
                self.finished = true;
                let char_len = self.rest.fragment.chars().next().map_or(1, char::len_utf8);
                let mut span = self.rest;
                span.fragment = &span.fragment[..char_len];
                Some(Err(create_span(span, ParseError::UnexpectedChar)))
            }
        }
    }
}

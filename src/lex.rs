use std::fmt::Display;

use miette::{Diagnostic, Error, LabeledSpan, NamedSource, SourceSpan, miette};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected character '{token}'")]
#[diagnostic(help("remove or correct the character: `{token}`"))]
pub struct SingleTokenError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this character")]
    bad_bit: SourceSpan,

    pub token: char,
}

impl SingleTokenError {
    pub fn line(&self) -> usize {
        self.src.inner()[..self.bad_bit.offset()].matches('\n').count() + 1
    }
}

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected '!'")]
#[diagnostic(help("`!` is only valid as part of `!=`"))]
pub struct BangError {
    #[source_code]
    src: NamedSource<String>,

    #[label("expected `=` after this")]
    bad_bit: SourceSpan,
}

impl BangError {
    pub fn line(&self) -> usize {
        self.src.inner()[..self.bad_bit.offset()].matches('\n').count() + 1
    }
}

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected end of input, expected {expected}")]
#[diagnostic(help(
    "The input ended unexpectedly, possibly due to a missing closing brace or parenthesis."
))]
pub struct Eof {
    #[source_code]
    src: NamedSource<String>,

    #[label("input ends here")]
    bad_line: SourceSpan,

    pub expected: String,
}

impl Eof {
    pub fn build(lexer: &Lexer<'_>, expected: impl Into<String>) -> Self {
        let end = lexer.whole.len();
        Eof {
            src: lexer.source(),
            bad_line: SourceSpan::from(end.saturating_sub(1)..end),
            expected: expected.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    pub offset: usize,
}

impl Token<'_> {
    pub fn span(&self) -> SourceSpan {
        SourceSpan::from(self.offset..self.offset + self.literal.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Minus,
    Plus,
    Semicolon,
    Star,
    Slash,
    BangEqual,
    EqualEqual,
    GreaterEqual,
    LessEqual,
    Greater,
    Less,
    Equal,
    Ident,
    Number(f64),
    Else,
    For,
    Func,
    If,
    Return,
    While,
    Eof,
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal;
        match self.kind {
            TokenKind::LeftParen => write!(f, "LEFT_PAREN {lit} null"),
            TokenKind::RightParen => write!(f, "RIGHT_PAREN {lit} null"),
            TokenKind::LeftBrace => write!(f, "LEFT_BRACE {lit} null"),
            TokenKind::RightBrace => write!(f, "RIGHT_BRACE {lit} null"),
            TokenKind::Comma => write!(f, "COMMA {lit} null"),
            TokenKind::Minus => write!(f, "MINUS {lit} null"),
            TokenKind::Plus => write!(f, "PLUS {lit} null"),
            TokenKind::Semicolon => write!(f, "SEMICOLON {lit} null"),
            TokenKind::Star => write!(f, "STAR {lit} null"),
            TokenKind::Slash => write!(f, "SLASH {lit} null"),
            TokenKind::BangEqual => write!(f, "BANG_EQUAL {lit} null"),
            TokenKind::EqualEqual => write!(f, "EQUAL_EQUAL {lit} null"),
            TokenKind::GreaterEqual => write!(f, "GREATER_EQUAL {lit} null"),
            TokenKind::LessEqual => write!(f, "LESS_EQUAL {lit} null"),
            TokenKind::Greater => write!(f, "GREATER {lit} null"),
            TokenKind::Less => write!(f, "LESS {lit} null"),
            TokenKind::Equal => write!(f, "EQUAL {lit} null"),
            TokenKind::Ident => write!(f, "IDENTIFIER {lit} null"),
            TokenKind::Number(n) => write!(f, "NUMBER {lit} {n:.1}"),
            TokenKind::Else => write!(f, "ELSE {lit} null"),
            TokenKind::For => write!(f, "FOR {lit} null"),
            TokenKind::Func => write!(f, "FUNC {lit} null"),
            TokenKind::If => write!(f, "IF {lit} null"),
            TokenKind::Return => write!(f, "RETURN {lit} null"),
            TokenKind::While => write!(f, "WHILE {lit} null"),
            TokenKind::Eof => write!(f, "EOF {lit} null"),
        }
    }
}

/// Streams tokens out of a single source text, one at a time.
///
/// The lexer never backtracks; any lookahead is owned by its consumer.
pub struct Lexer<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    rest: &'de str,
    byte: usize,
}

impl<'de> Lexer<'de> {
    pub fn new(filename: Option<&'de str>, input: &'de str) -> Self {
        Lexer {
            filename,
            whole: input,
            rest: input,
            byte: 0,
        }
    }

    pub(crate) fn source(&self) -> NamedSource<String> {
        NamedSource::new(self.filename.unwrap_or("<input>"), self.whole.to_string())
    }

    /// Like [`Iterator::next`], but reports the end of input as an
    /// [`TokenKind::Eof`] token, as many times as it is asked.
    pub fn next_token(&mut self) -> Result<Token<'de>, Error> {
        match self.next() {
            Some(token) => token,
            None => Ok(Token {
                kind: TokenKind::Eof,
                literal: "",
                offset: self.whole.len(),
            }),
        }
    }
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Result<Token<'de>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut chars = self.rest.chars();
            let c = chars.next()?;
            let offset = self.byte;
            let literal = &self.rest[..c.len_utf8()];
            let cur = self.rest;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();

            enum Start {
                Ident,
                Number,
                IfEqualElse(TokenKind, Option<TokenKind>),
            }

            let process = |kind: TokenKind| {
                Some(Ok(Token {
                    kind,
                    literal,
                    offset,
                }))
            };

            let started = match c {
                '(' => return process(TokenKind::LeftParen),
                ')' => return process(TokenKind::RightParen),
                '{' => return process(TokenKind::LeftBrace),
                '}' => return process(TokenKind::RightBrace),
                ',' => return process(TokenKind::Comma),
                '-' => return process(TokenKind::Minus),
                '+' => return process(TokenKind::Plus),
                ';' => return process(TokenKind::Semicolon),
                '*' => return process(TokenKind::Star),
                '/' => return process(TokenKind::Slash),
                '!' => Start::IfEqualElse(TokenKind::BangEqual, None),
                '=' => Start::IfEqualElse(TokenKind::EqualEqual, Some(TokenKind::Equal)),
                '>' => Start::IfEqualElse(TokenKind::GreaterEqual, Some(TokenKind::Greater)),
                '<' => Start::IfEqualElse(TokenKind::LessEqual, Some(TokenKind::Less)),
                'a'..='z' | 'A'..='Z' | '_' => Start::Ident,
                '0'..='9' => Start::Number,
                c if c.is_whitespace() => continue,
                c => {
                    return Some(Err(SingleTokenError {
                        src: self.source(),
                        bad_bit: SourceSpan::from(offset..self.byte),
                        token: c,
                    }
                    .into()));
                }
            };

            match started {
                Start::Ident => {
                    let first_non_ident = cur
                        .find(|c| !matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_'))
                        .unwrap_or(cur.len());

                    let literal = &cur[..first_non_ident];

                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    let kind = match literal {
                        "if" => TokenKind::If,
                        "else" => TokenKind::Else,
                        "while" => TokenKind::While,
                        "for" => TokenKind::For,
                        "func" => TokenKind::Func,
                        "return" => TokenKind::Return,
                        _ => TokenKind::Ident,
                    };

                    return Some(Ok(Token {
                        kind,
                        literal,
                        offset,
                    }));
                }
                Start::Number => {
                    // whole-number literals only: `1.5` lexes as `1`, then an error at `.`
                    let first_non_digit = cur
                        .find(|c: char| !c.is_ascii_digit())
                        .unwrap_or(cur.len());

                    let literal = &cur[..first_non_digit];

                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    let n = match literal.parse() {
                        Ok(n) => n,
                        Err(e) => {
                            return Some(Err(miette!(
                                code = "ParseFloatError",
                                url =
                                    "https://doc.rust-lang.org/std/num/struct.ParseFloatError.html",
                                labels = vec![LabeledSpan::at(
                                    offset..self.byte,
                                    "this numeric literal"
                                )],
                                "{e}",
                            )
                            .with_source_code(self.whole.to_string())));
                        }
                    };

                    return Some(Ok(Token {
                        kind: TokenKind::Number(n),
                        literal,
                        offset,
                    }));
                }
                Start::IfEqualElse(yes, no) => {
                    if self.rest.starts_with('=') {
                        self.rest = &self.rest[1..];
                        self.byte += 1;
                        return Some(Ok(Token {
                            kind: yes,
                            literal: &cur[..c.len_utf8() + 1],
                            offset,
                        }));
                    }
                    return match no {
                        Some(kind) => process(kind),
                        None => Some(Err(BangError {
                            src: self.source(),
                            bad_bit: SourceSpan::from(offset..self.byte),
                        }
                        .into())),
                    };
                }
            }
        }
    }
}

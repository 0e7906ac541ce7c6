use std::{fmt::Display, rc::Rc};

use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use thiserror::Error;

use crate::{
    Lexer,
    lex::{Eof, Token, TokenKind},
};

#[derive(Error, Debug, Diagnostic)]
#[error("Expected {expected}, found `{found}`")]
pub struct UnexpectedToken {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    bad_bit: SourceSpan,

    pub expected: String,
    pub found: String,
}

#[derive(Error, Debug, Diagnostic)]
#[error("Left side of assignment must be an identifier")]
#[diagnostic(help("only plain variable names can be assigned to"))]
pub struct InvalidAssignTarget {
    #[source_code]
    src: NamedSource<String>,

    #[label("this is not a variable name")]
    bad_bit: SourceSpan,
}

/// Expressions: everything that sits inside a statement and yields a number.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenTree {
    Atom(Atom),
    Binary {
        op: Op,
        lhs: Box<TokenTree>,
        rhs: Box<TokenTree>,
    },
    Assign {
        name: String,
        value: Box<TokenTree>,
    },
    Call {
        callee: String,
        arguments: Vec<TokenTree>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Number(f64),
    Ident(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Minus,
    Plus,
    Star,
    Slash,
    BangEqual,
    EqualEqual,
    GreaterEqual,
    LessEqual,
    Greater,
    Less,
}

impl Op {
    fn from_kind(kind: TokenKind) -> Option<Op> {
        Some(match kind {
            TokenKind::Minus => Op::Minus,
            TokenKind::Plus => Op::Plus,
            TokenKind::Star => Op::Star,
            TokenKind::Slash => Op::Slash,
            TokenKind::BangEqual => Op::BangEqual,
            TokenKind::EqualEqual => Op::EqualEqual,
            TokenKind::GreaterEqual => Op::GreaterEqual,
            TokenKind::LessEqual => Op::LessEqual,
            TokenKind::Greater => Op::Greater,
            TokenKind::Less => Op::Less,
            _ => return None,
        })
    }
}

/// A named function. Shared between the tree that declared it and every
/// environment it gets registered in, so it outlives the parsed line.
#[derive(Debug, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: StatementTree,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementTree {
    Expression(TokenTree),
    Block(Vec<StatementTree>),
    If {
        condition: TokenTree,
        then_branch: Box<StatementTree>,
        else_branch: Option<Box<StatementTree>>,
    },
    While {
        condition: TokenTree,
        body: Box<StatementTree>,
    },
    For {
        init: Option<TokenTree>,
        condition: Option<TokenTree>,
        increment: Option<TokenTree>,
        body: Box<StatementTree>,
    },
    Fun(Rc<FunctionDef>),
    Return(Option<TokenTree>),
}

/// Recursive-descent parser over one line of source.
///
/// Holds exactly one token of lookahead in `current`.
pub struct Parser<'de> {
    lexer: Lexer<'de>,
    current: Token<'de>,
}

impl<'de> Parser<'de> {
    pub fn new(filename: Option<&'de str>, whole: &'de str) -> Self {
        Parser {
            lexer: Lexer::new(filename, whole),
            current: Token {
                kind: TokenKind::Eof,
                literal: "",
                offset: 0,
            },
        }
    }

    /// Parses the whole input into a single root block.
    pub fn parse_program(mut self) -> Result<StatementTree, Error> {
        self.advance()?;
        let mut statements = Vec::new();
        while self.current.kind != TokenKind::Eof {
            statements.push(self.parse_statement()?);
        }
        Ok(StatementTree::Block(statements))
    }

    fn advance(&mut self) -> Result<Token<'de>, Error> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> Result<bool, Error> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, expected: TokenKind, error: &str) -> Result<Token<'de>, Error> {
        self.expect_where(|token| token.kind == expected, error)
    }

    fn expect_where(
        &mut self,
        check: impl FnOnce(&Token<'de>) -> bool,
        error: &str,
    ) -> Result<Token<'de>, Error> {
        if check(&self.current) {
            return self.advance();
        }
        Err(self.unexpected(error))
    }

    fn unexpected(&self, expected: &str) -> Error {
        if self.current.kind == TokenKind::Eof {
            return Eof::build(&self.lexer, expected).into();
        }
        UnexpectedToken {
            src: self.lexer.source(),
            bad_bit: self.current.span(),
            expected: expected.to_string(),
            found: self.current.literal.to_string(),
        }
        .into()
    }

    fn parse_statement(&mut self) -> Result<StatementTree, Error> {
        match self.current.kind {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Func => self.parse_fun(),
            TokenKind::Return => self.parse_return(),
            TokenKind::LeftBrace => self.parse_block(),
            _ => {
                let expr = self.parse_expression()?;
                self.eat(TokenKind::Semicolon)?;
                Ok(StatementTree::Expression(expr))
            }
        }
    }

    fn parse_block(&mut self) -> Result<StatementTree, Error> {
        self.expect(TokenKind::LeftBrace, "`{`")?;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RightBrace, "`}`")?;
        Ok(StatementTree::Block(statements))
    }

    fn parse_if(&mut self) -> Result<StatementTree, Error> {
        self.expect(TokenKind::If, "`if`")?;
        self.expect(TokenKind::LeftParen, "`(` after `if`")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RightParen, "`)` after if condition")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(TokenKind::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StatementTree::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Result<StatementTree, Error> {
        self.expect(TokenKind::While, "`while`")?;
        self.expect(TokenKind::LeftParen, "`(` after `while`")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RightParen, "`)` after while condition")?;
        let body = Box::new(self.parse_statement()?);
        Ok(StatementTree::While { condition, body })
    }

    fn parse_for(&mut self) -> Result<StatementTree, Error> {
        self.expect(TokenKind::For, "`for`")?;
        self.expect(TokenKind::LeftParen, "`(` after `for`")?;
        let init = self.parse_clause(TokenKind::Semicolon)?;
        self.expect(TokenKind::Semicolon, "`;` after for initializer")?;
        let condition = self.parse_clause(TokenKind::Semicolon)?;
        self.expect(TokenKind::Semicolon, "`;` after for condition")?;
        let increment = self.parse_clause(TokenKind::RightParen)?;
        self.expect(TokenKind::RightParen, "`)` after for clauses")?;
        let body = Box::new(self.parse_statement()?);
        Ok(StatementTree::For {
            init,
            condition,
            increment,
            body,
        })
    }

    fn parse_clause(&mut self, terminator: TokenKind) -> Result<Option<TokenTree>, Error> {
        if self.check(terminator) {
            Ok(None)
        } else {
            self.parse_expression().map(Some)
        }
    }

    fn parse_fun(&mut self) -> Result<StatementTree, Error> {
        self.expect(TokenKind::Func, "`func`")?;
        let name = self.expect(TokenKind::Ident, "function name")?.literal.to_string();
        self.expect(TokenKind::LeftParen, "`(` after function name")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                let param = self.expect(TokenKind::Ident, "parameter name")?;
                params.push(param.literal.to_string());
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "`)` after parameters")?;
        let body = self.parse_block()?;
        Ok(StatementTree::Fun(Rc::new(FunctionDef { name, params, body })))
    }

    fn parse_return(&mut self) -> Result<StatementTree, Error> {
        self.expect(TokenKind::Return, "`return`")?;
        let value = if matches!(
            self.current.kind,
            TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
        ) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat(TokenKind::Semicolon)?;
        Ok(StatementTree::Return(value))
    }

    fn parse_expression(&mut self) -> Result<TokenTree, Error> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<TokenTree, Error> {
        let start = self.current.offset;
        let lhs = self.parse_binary(0)?;
        if !self.check(TokenKind::Equal) {
            return Ok(lhs);
        }
        let TokenTree::Atom(Atom::Ident(name)) = lhs else {
            return Err(InvalidAssignTarget {
                src: self.lexer.source(),
                bad_bit: SourceSpan::from(start..self.current.offset),
            }
            .into());
        };
        self.advance()?;
        let value = Box::new(self.parse_assignment()?);
        Ok(TokenTree::Assign { name, value })
    }

    /// Precedence climbing over the left-associative binary levels.
    fn parse_binary(&mut self, min_bp: u8) -> Result<TokenTree, Error> {
        let mut lhs = self.parse_unary()?;

        loop {
            let Some(op) = Op::from_kind(self.current.kind) else {
                break;
            };
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            self.advance()?;
            let rhs = self.parse_binary(r_bp)?;
            lhs = TokenTree::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<TokenTree, Error> {
        if self.eat(TokenKind::Plus)? {
            return self.parse_unary();
        }
        if self.eat(TokenKind::Minus)? {
            let rhs = self.parse_unary()?;
            return Ok(TokenTree::Binary {
                op: Op::Minus,
                lhs: Box::new(TokenTree::Atom(Atom::Number(0.0))),
                rhs: Box::new(rhs),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<TokenTree, Error> {
        match self.current.kind {
            TokenKind::Number(n) => {
                self.advance()?;
                Ok(TokenTree::Atom(Atom::Number(n)))
            }
            TokenKind::Ident => {
                let name = self.advance()?.literal.to_string();
                if !self.eat(TokenKind::LeftParen)? {
                    return Ok(TokenTree::Atom(Atom::Ident(name)));
                }
                let mut arguments = Vec::new();
                if !self.check(TokenKind::RightParen) {
                    loop {
                        arguments.push(self.parse_expression()?);
                        if !self.eat(TokenKind::Comma)? {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RightParen, "`)` after arguments")?;
                Ok(TokenTree::Call {
                    callee: name,
                    arguments,
                })
            }
            TokenKind::LeftParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen, "`)`")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}

fn infix_binding_power(op: Op) -> (u8, u8) {
    match op {
        Op::EqualEqual | Op::BangEqual => (1, 2),
        Op::Less | Op::Greater | Op::LessEqual | Op::GreaterEqual => (3, 4),
        Op::Plus | Op::Minus => (5, 6),
        Op::Star | Op::Slash => (7, 8),
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Op::Minus => "-",
                Op::Plus => "+",
                Op::Star => "*",
                Op::Slash => "/",
                Op::BangEqual => "!=",
                Op::EqualEqual => "==",
                Op::GreaterEqual => ">=",
                Op::LessEqual => "<=",
                Op::Greater => ">",
                Op::Less => "<",
            }
        )
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Atom::Number(n) => {
                if *n == n.trunc() {
                    write!(f, "{n}.0")
                } else {
                    write!(f, "{n}")
                }
            }
            Atom::Ident(name) => write!(f, "{name}"),
        }
    }
}

impl Display for TokenTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenTree::Atom(atom) => write!(f, "{atom}"),
            TokenTree::Binary { op, lhs, rhs } => write!(f, "({op} {lhs} {rhs})"),
            TokenTree::Assign { name, value } => write!(f, "(= {name} {value})"),
            TokenTree::Call { callee, arguments } => {
                write!(f, "(call {callee}")?;
                for argument in arguments {
                    write!(f, " {argument}")?;
                }
                write!(f, ")")
            }
        }
    }
}

struct DisplayOption<'a>(&'a Option<TokenTree>);

impl Display for DisplayOption<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(expr) => write!(f, "{expr}"),
            None => write!(f, "nil"),
        }
    }
}

impl Display for StatementTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementTree::Expression(expr) => write!(f, "{expr}"),
            StatementTree::Block(statements) => {
                write!(f, "{{")?;
                for statement in statements {
                    write!(f, " {statement}")?;
                }
                write!(f, " }}")
            }
            StatementTree::If {
                condition,
                then_branch,
                else_branch,
            } => {
                write!(f, "(if {condition} {then_branch}")?;
                if let Some(else_branch) = else_branch {
                    write!(f, " {else_branch}")?;
                }
                write!(f, ")")
            }
            StatementTree::While { condition, body } => write!(f, "(while {condition} {body})"),
            StatementTree::For {
                init,
                condition,
                increment,
                body,
            } => write!(
                f,
                "(for {} {} {} {body})",
                DisplayOption(init),
                DisplayOption(condition),
                DisplayOption(increment)
            ),
            StatementTree::Fun(def) => {
                write!(f, "(func {} ({}) {})", def.name, def.params.join(" "), def.body)
            }
            StatementTree::Return(value) => write!(f, "(return {})", DisplayOption(value)),
        }
    }
}

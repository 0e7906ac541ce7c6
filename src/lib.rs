//! A line-oriented interpreter for a small numeric scripting language.
//!
//! Every value is an `f64`. A host feeds one line at a time through [`parse`]
//! and [`evaluate`], keeping a single [`Environment`] alive between lines so
//! variables and functions persist for the whole session.

use std::io::Write;

use miette::Error;

pub mod env;
pub mod eval;
pub mod lex;
pub mod parse;

pub use env::Environment;
pub use eval::{Flow, Interpreter, RuntimeError, format_number};
pub use lex::Lexer;
pub use parse::{Parser, StatementTree, TokenTree};

/// Lexes and parses one line of source into a root block.
pub fn parse(source: &str) -> Result<StatementTree, Error> {
    Parser::new(None, source).parse_program()
}

/// Evaluates a parsed line, writing `print` output to `out`.
///
/// Side effects made before an error stay in `environment`.
pub fn evaluate(
    program: &StatementTree,
    environment: &mut Environment,
    out: &mut dyn Write,
) -> Result<f64, Error> {
    Interpreter::new(environment, out).run(program)
}

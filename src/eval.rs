use std::io::Write;

use log::{debug, trace};
use miette::{Diagnostic, Error};
use thiserror::Error;

use crate::{
    env::Environment,
    parse::{Atom, Op, StatementTree, TokenTree},
};

/// Name of the one function every scope can call without defining it.
pub const PRINT: &str = "print";

#[derive(Error, Debug, Diagnostic)]
pub enum RuntimeError {
    #[error("Variable not defined: {0}")]
    #[diagnostic(help("assign to the variable before reading it"))]
    UndefinedVariable(String),

    #[error("Function not defined: {0}")]
    #[diagnostic(help("define the function with `func` before calling it"))]
    UndefinedFunction(String),

    #[error("wrong number of args in call to {name}: expected {expected}, found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("`return` used outside of a function")]
    TopLevelReturn,

    #[error("failed to write output")]
    Output(#[source] std::io::Error),
}

/// Outcome of evaluating a statement: either its value, or a `return`
/// travelling up to the nearest call boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flow {
    Value(f64),
    Return(f64),
}

pub struct Interpreter<'a> {
    environment: &'a mut Environment,
    out: &'a mut dyn Write,
}

impl<'a> Interpreter<'a> {
    pub fn new(environment: &'a mut Environment, out: &'a mut dyn Write) -> Self {
        Self { environment, out }
    }

    /// Evaluates one parsed line against the persistent environment.
    pub fn run(&mut self, program: &StatementTree) -> Result<f64, Error> {
        match self.eval_statement(program)? {
            Flow::Value(value) => Ok(value),
            Flow::Return(_) => Err(RuntimeError::TopLevelReturn.into()),
        }
    }

    pub fn eval_statement(&mut self, statement: &StatementTree) -> Result<Flow, Error> {
        Ok(match statement {
            StatementTree::Expression(expr) => Flow::Value(self.eval_expression(expr)?),
            StatementTree::Block(statements) => {
                let mut last = 0.0;
                for statement in statements {
                    match self.eval_statement(statement)? {
                        Flow::Value(value) => last = value,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Flow::Value(last)
            }
            StatementTree::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if truthy(self.eval_expression(condition)?) {
                    self.eval_statement(then_branch)?
                } else if let Some(else_branch) = else_branch {
                    self.eval_statement(else_branch)?
                } else {
                    Flow::Value(0.0)
                }
            }
            StatementTree::While { condition, body } => {
                let mut last = 0.0;
                while truthy(self.eval_expression(condition)?) {
                    match self.eval_statement(body)? {
                        Flow::Value(value) => last = value,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Flow::Value(last)
            }
            StatementTree::For {
                init,
                condition,
                increment,
                body,
            } => {
                if let Some(init) = init {
                    self.eval_expression(init)?;
                }
                let mut last = 0.0;
                // no condition loops until a `return` or an error
                loop {
                    if let Some(condition) = condition {
                        if !truthy(self.eval_expression(condition)?) {
                            break;
                        }
                    }
                    match self.eval_statement(body)? {
                        Flow::Value(value) => last = value,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                    if let Some(increment) = increment {
                        self.eval_expression(increment)?;
                    }
                }
                Flow::Value(last)
            }
            StatementTree::Fun(def) => {
                debug!("define function {}({})", def.name, def.params.join(", "));
                self.environment.define_function(&def.name, def.clone());
                Flow::Value(0.0)
            }
            StatementTree::Return(value) => {
                let value = match value {
                    Some(value) => self.eval_expression(value)?,
                    None => 0.0,
                };
                trace!("return {value}");
                Flow::Return(value)
            }
        })
    }

    pub fn eval_expression(&mut self, expr: &TokenTree) -> Result<f64, Error> {
        Ok(match expr {
            TokenTree::Atom(Atom::Number(value)) => *value,
            TokenTree::Atom(Atom::Ident(name)) => self.environment.get_variable(name)?,
            TokenTree::Binary { op, lhs, rhs } => {
                let lhs = self.eval_expression(lhs)?;
                let rhs = self.eval_expression(rhs)?;
                apply(*op, lhs, rhs)
            }
            TokenTree::Assign { name, value } => {
                let value = self.eval_expression(value)?;
                self.environment.set_variable(name, value);
                value
            }
            TokenTree::Call { callee, arguments } => self.call(callee, arguments)?,
        })
    }

    fn call(&mut self, callee: &str, arguments: &[TokenTree]) -> Result<f64, Error> {
        if callee == PRINT {
            return self.print(arguments);
        }

        let def = self.environment.get_function(callee)?;
        if def.params.len() != arguments.len() {
            return Err(RuntimeError::ArityMismatch {
                name: callee.to_string(),
                expected: def.params.len(),
                found: arguments.len(),
            }
            .into());
        }

        let values = self.eval_arguments(arguments)?;
        debug!("call {callee}{values:?} at depth {}", self.environment.depth());

        self.environment.push();
        for (param, value) in def.params.iter().zip(values) {
            self.environment.define_variable(param, value);
        }
        let result = self.eval_statement(&def.body);
        self.environment.pop();

        match result? {
            Flow::Value(value) | Flow::Return(value) => Ok(value),
        }
    }

    fn print(&mut self, arguments: &[TokenTree]) -> Result<f64, Error> {
        let line = self
            .eval_arguments(arguments)?
            .into_iter()
            .map(format_number)
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(self.out, "{line}").map_err(RuntimeError::Output)?;
        Ok(0.0)
    }

    fn eval_arguments(&mut self, arguments: &[TokenTree]) -> Result<Vec<f64>, Error> {
        arguments
            .iter()
            .map(|argument| self.eval_expression(argument))
            .collect()
    }
}

fn truthy(value: f64) -> bool {
    value != 0.0
}

fn apply(op: Op, lhs: f64, rhs: f64) -> f64 {
    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    match op {
        Op::Plus => lhs + rhs,
        Op::Minus => lhs - rhs,
        Op::Star => lhs * rhs,
        Op::Slash => lhs / rhs,
        Op::EqualEqual => flag(lhs == rhs),
        Op::BangEqual => flag(lhs != rhs),
        Op::Less => flag(lhs < rhs),
        Op::Greater => flag(lhs > rhs),
        Op::LessEqual => flag(lhs <= rhs),
        Op::GreaterEqual => flag(lhs >= rhs),
    }
}

/// Renders a number the way `print` and the REPL show it: whole values
/// without a fractional part, everything else in shortest decimal form.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        // `+ 0.0` folds -0 into 0
        format!("{}", value + 0.0)
    } else {
        format!("{value}")
    }
}

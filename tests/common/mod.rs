#![allow(dead_code)]

use numlang::Environment;

/// One interpreter session: a persistent environment plus captured `print`
/// output.
pub struct Session {
    pub environment: Environment,
    pub output: Vec<u8>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            environment: Environment::new(),
            output: Vec::new(),
        }
    }

    /// Parses and evaluates one line against this session.
    pub fn eval(&mut self, source: &str) -> miette::Result<f64> {
        let program = numlang::parse(source)?;
        numlang::evaluate(&program, &mut self.environment, &mut self.output)
    }

    pub fn value(&mut self, source: &str) -> f64 {
        self.eval(source)
            .unwrap_or_else(|e| panic!("`{source}` failed: {e:?}"))
    }

    pub fn error(&mut self, source: &str) -> miette::Report {
        match self.eval(source) {
            Ok(value) => panic!("`{source}` succeeded with {value} but was expected to fail"),
            Err(e) => e,
        }
    }

    /// Takes everything printed so far.
    pub fn printed(&mut self) -> String {
        String::from_utf8(std::mem::take(&mut self.output)).expect("print writes utf-8")
    }
}

pub fn eval(source: &str) -> f64 {
    Session::new().value(source)
}

use std::{collections::HashMap, rc::Rc};

use log::trace;

use crate::{eval::RuntimeError, parse::FunctionDef};

#[derive(Debug, Default)]
pub struct Scope {
    variables: HashMap<String, f64>,
    functions: HashMap<String, Rc<FunctionDef>>,
}

/// A chain of scopes rooted at the global scope.
///
/// Calls push a frame whose parent is the caller's innermost scope, so the
/// chain is always a stack: `frames` innermost last, then `globals`.
#[derive(Debug, Default)]
pub struct Environment {
    globals: Scope,
    frames: Vec<Scope>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of call frames above the global scope.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self) {
        self.frames.push(Scope::default());
        trace!("push scope, depth {}", self.frames.len());
    }

    /// Discards the innermost call frame. The global scope is never popped.
    pub fn pop(&mut self) {
        self.frames.pop();
        trace!("pop scope, depth {}", self.frames.len());
    }

    fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.frames.iter().rev().chain(std::iter::once(&self.globals))
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Scope> {
        self.frames
            .iter_mut()
            .rev()
            .chain(std::iter::once(&mut self.globals))
    }

    fn current_mut(&mut self) -> &mut Scope {
        self.frames.last_mut().unwrap_or(&mut self.globals)
    }

    pub fn get_variable(&self, name: &str) -> Result<f64, RuntimeError> {
        self.iter()
            .find_map(|scope| scope.variables.get(name).copied())
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }

    /// Overwrites the nearest existing binding, or declares `name` in the
    /// innermost scope.
    pub fn set_variable(&mut self, name: &str, value: f64) {
        if let Some(slot) = self
            .iter_mut()
            .find_map(|scope| scope.variables.get_mut(name))
        {
            *slot = value;
            return;
        }
        self.current_mut().variables.insert(name.to_string(), value);
    }

    /// Binds `name` in the innermost scope only, shadowing any outer binding.
    pub fn define_variable(&mut self, name: &str, value: f64) {
        self.current_mut().variables.insert(name.to_string(), value);
    }

    pub fn define_function(&mut self, name: &str, def: Rc<FunctionDef>) {
        self.current_mut().functions.insert(name.to_string(), def);
    }

    pub fn get_function(&self, name: &str) -> Result<Rc<FunctionDef>, RuntimeError> {
        self.iter()
            .find_map(|scope| scope.functions.get(name).cloned())
            .ok_or_else(|| RuntimeError::UndefinedFunction(name.to_string()))
    }
}

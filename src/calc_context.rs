use std::collections::HashMap;
use std::fmt;

use crate::calc_types::{Token, Value};

/// A user-defined operator, either `op name x = body` or `op x name y = body`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub left: Option<String>,
    pub right: String,
    pub body: Vec<Token>,
}

impl FunctionDef {
    pub fn is_binary(&self) -> bool {
        self.left.is_some()
    }
}

impl fmt::Display for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "op ")?;
        if let Some(left) = &self.left {
            write!(f, "{} ", left)?;
        }
        write!(f, "{} {} =", self.name, self.right)?;
        for token in &self.body {
            write!(f, " {}", token)?;
        }
        Ok(())
    }
}

/// Unary and binary operator definitions, looked up by name, plus the
/// session's global variables.
///
/// One name can carry both a unary and a binary form at once.
#[derive(Debug, Default)]
pub struct Context {
    unary_fn: HashMap<String, FunctionDef>,
    binary_fn: HashMap<String, FunctionDef>,
    globals: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// Stores `def`, replacing any earlier definition of the same arity.
    pub fn define(&mut self, def: FunctionDef) {
        let table = if def.is_binary() { &mut self.binary_fn } else { &mut self.unary_fn };
        table.insert(def.name.clone(), def);
    }

    pub fn unary(&self, name: &str) -> Option<&FunctionDef> {
        self.unary_fn.get(name)
    }

    pub fn binary(&self, name: &str) -> Option<&FunctionDef> {
        self.binary_fn.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.unary_fn.contains_key(name) || self.binary_fn.contains_key(name)
    }

    pub fn assign(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_string(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }
}

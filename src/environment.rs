//! Chained variable scopes.
//!
//! Scopes are shared (`Rc<RefCell<_>>`): a closure keeps its defining scope
//! alive and sees every later mutation made through it.

use crate::error::{Result, TurtleError};
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// A root (global) scope.
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn enclosing(&self) -> Option<EnvRef> {
        self.enclosing.clone()
    }

    /// Introduce or overwrite a binding in *this* scope only.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up here, then outward through the enclosing chain.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Overwrite an existing binding, searching outward.  Never declares.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// Drop every binding and the parent link.  Used to break reference
    /// cycles once the interpreter that owns this scope goes away.
    pub fn clear(&mut self) {
        self.values.clear();
        self.enclosing = None;
    }
}

fn undefined(name: &Token) -> TurtleError {
    TurtleError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

/// The scope `distance` hops outward from `env` (0 is `env` itself).
pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
    let mut current: EnvRef = Rc::clone(env);

    for _ in 0..distance {
        let next = current.borrow().enclosing()?;
        current = next;
    }

    Some(current)
}

/// Read a resolved local: only the scope at `distance` is consulted.
pub fn get_at(env: &EnvRef, distance: usize, name: &Token) -> Result<Value> {
    let scope: EnvRef = ancestor(env, distance).ok_or_else(|| undefined(name))?;
    let value = scope.borrow().values.get(&name.lexeme).cloned();
    value.ok_or_else(|| undefined(name))
}

/// Write a resolved local: only the scope at `distance` is consulted.
pub fn assign_at(env: &EnvRef, distance: usize, name: &Token, value: Value) -> Result<()> {
    let scope: EnvRef = ancestor(env, distance).ok_or_else(|| undefined(name))?;
    let mut scope = scope.borrow_mut();

    match scope.values.get_mut(&name.lexeme) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(undefined(name)),
    }
}

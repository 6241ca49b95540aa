//! Classes and their instances.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::Function;
use crate::error::{Result, TurtleError};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::{InstanceRef, Value};

/// Name of the method run on instantiation.
pub const INITIALIZER: &str = "init";

/// A class: immutable once declared.
pub struct Class {
    name: String,
    superclass: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Own methods first, then each superclass in turn.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        let mut class: &Class = self;

        loop {
            if let Some(method) = class.methods.get(name) {
                return Some(Rc::clone(method));
            }

            class = class.superclass.as_deref()?;
        }
    }

    /// A class called as a constructor takes whatever its `init` takes.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER).map_or(0, |init| init.arity())
    }

    /// Allocate the instance, then run a bound `init` if there is one.  The
    /// initializer's own result is discarded: the instance is always yielded.
    pub fn instantiate(
        class: &Rc<Class>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Instantiating class '{}'", class.name);

        let instance: InstanceRef = interpreter.new_instance(Rc::clone(class));

        if let Some(init) = class.find_method(INITIALIZER) {
            init.bind(Rc::clone(&instance))
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

/// An object: its class plus a bag of fields created on first assignment.
pub struct Instance {
    class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    /// Fields shadow methods; a method comes back bound to `instance`.
    pub fn get(instance: &InstanceRef, name: &Token) -> Result<Value> {
        let this = instance.borrow();

        if let Some(value) = this.fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = this.class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(Rc::clone(instance)))));
        }

        Err(TurtleError::runtime(
            name,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }

    /// Drop every field.  Used to break reference cycles on teardown.
    pub fn clear(&mut self) {
        self.fields.clear();
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class.name)
    }
}

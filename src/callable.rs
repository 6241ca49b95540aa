//! The call capability shared by user functions, classes and natives.
//!
//! The set of callables is closed, so dispatch is a `match` over
//! [`Callable`] rather than a trait object.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::ast::FunctionDecl;
use crate::class::Class;
use crate::environment::{self, EnvRef, Environment};
use crate::error::{Result, TurtleError};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::{InstanceRef, NativeFunction, Value};

/// Anything that can appear to the left of `(...)`.
#[derive(Debug, Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Class(Rc<Class>),
    Native(Rc<NativeFunction>),
}

impl Callable {
    /// Number of arguments a call must supply.
    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(f) => f.arity(),
            Callable::Class(c) => c.arity(),
            Callable::Native(n) => n.arity,
        }
    }

    /// Invoke with already‑evaluated arguments.  The argument count has been
    /// checked against [`Callable::arity`] by the caller; `paren` attributes
    /// errors raised by natives.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        match self {
            Callable::Function(f) => f.call(interpreter, arguments),
            Callable::Class(c) => Class::instantiate(c, interpreter, arguments),
            Callable::Native(n) => {
                debug!("Calling native function '{}'", n.name);
                (n.func)(&arguments).map_err(|msg| TurtleError::runtime(paren, msg))
            }
        }
    }
}

/// A user‑defined function or method together with the scope it closes over.
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
    is_initializer: bool,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this method whose closure is a fresh child scope binding
    /// `this` to `instance`.  The original method is left untouched.
    pub fn bind(&self, instance: InstanceRef) -> Function {
        let mut scope = Environment::with_enclosing(Rc::clone(&self.closure));
        scope.define("this", Value::Instance(instance));

        Function {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(scope)),
            is_initializer: self.is_initializer,
        }
    }

    /// Run the body in a new scope whose parent is the closure (lexical, not
    /// the caller's scope).  Initializers always evaluate to their `this`.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!("Calling user-defined function '{}'", self.name());

        let scope: EnvRef = interpreter.new_scope(Rc::clone(&self.closure));
        {
            let mut scope = scope.borrow_mut();
            for (param, argument) in self.declaration.params.iter().zip(arguments) {
                scope.define(&param.lexeme, argument);
            }
        }

        let flow: Flow = interpreter.execute_block(&self.declaration.body, scope)?;

        if self.is_initializer {
            let this = Token::synthetic("this", self.declaration.name.line);
            return environment::get_at(&self.closure, 0, &this);
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// Built‑ins installed in every fresh global scope.
pub fn natives() -> Vec<NativeFunction> {
    vec![NativeFunction {
        name: "clock",
        arity: 0,
        func: |_args: &[Value]| {
            let seconds: f64 = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| format!("Clock error: {}", e))?
                .as_secs_f64();
            Ok(Value::Number(seconds))
        },
    }]
}

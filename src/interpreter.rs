//! Tree‑walking evaluator.
//!
//! Expressions evaluate to exactly one [`Value`]; statements execute for
//! effect and report, through [`Flow`], whether a `return` is unwinding.
//! Runtime errors short‑circuit through `?` all the way to [`Interpreter::interpret`].

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt, VarRef};
use crate::callable::{self, Callable, Function};
use crate::class::{Class, Instance, INITIALIZER};
use crate::environment::{self, EnvRef, Environment};
use crate::error::{Result, TurtleError};
use crate::heap::Heap;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use crate::value::{InstanceRef, Value};

/// Deepest chain of nested calls before "Stack overflow." is raised.
pub const MAX_CALL_DEPTH: usize = 4096;

/// Outcome of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Fall through to the next statement.
    Normal,

    /// A `return` is unwinding toward the nearest function call.
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    heap: Heap,
    out: Box<dyn Write>,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// An interpreter whose `print` output goes to `out`.  Native functions
    /// such as `clock` are defined in the fresh global scope.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let mut heap = Heap::new();
        let globals: EnvRef = heap.scope(Environment::new());

        for native in callable::natives() {
            debug!("Defining native function '{}'", native.name);
            globals
                .borrow_mut()
                .define(native.name, Value::Native(Rc::new(native)));
        }

        Self {
            environment: Rc::clone(&globals),
            globals,
            heap,
            out,
            call_depth: 0,
        }
    }

    pub fn globals(&self) -> EnvRef {
        Rc::clone(&self.globals)
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Execute a program.  Stops at the first runtime error; output produced
    /// by earlier statements has already been written.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        let mut result: Result<()> = Ok(());
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}
                // Only reachable if the resolver was skipped.
                Ok(Flow::Return(_)) => break,
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        // Output of statements that ran before an error is kept.
        self.out.flush()?;

        if result.is_ok() {
            info!("Interpretation completed successfully");
        }
        result
    }

    /// Allocate a scope nested in `enclosing`.
    pub(crate) fn new_scope(&mut self, enclosing: EnvRef) -> EnvRef {
        self.heap.scope(Environment::with_enclosing(enclosing))
    }

    /// Allocate an empty instance of `class`.
    pub(crate) fn new_instance(&mut self, class: Rc<Class>) -> InstanceRef {
        self.heap.instance(class)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        ensure_sufficient_stack(|| self.execute_inner(stmt))
    }

    fn execute_inner(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' ({})", name.lexeme, value.type_name());
                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let scope = self.new_scope(Rc::clone(&self.environment));
                return self.execute_block(statements, scope);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let flow @ Flow::Return(_) = self.execute(body)? {
                        return Ok(flow);
                    }
                }
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);
                let function = Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.declare_class(name, superclass.as_ref(), methods)?,
        }

        Ok(Flow::Normal)
    }

    /// Run `statements` in `scope`, restoring the current scope afterwards
    /// whether they finish, return, or fail.
    pub fn execute_block(&mut self, statements: &[Stmt], scope: EnvRef) -> Result<Flow> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, scope);

        let mut result: Result<Flow> = Ok(Flow::Normal);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;
        result
    }

    fn declare_class(
        &mut self,
        name: &Token,
        superclass: Option<&VarRef>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        let superclass: Option<Rc<Class>> = match superclass {
            Some(var) => match self.look_up_variable(var)? {
                Value::Class(class) => Some(class),
                _ => return Err(TurtleError::runtime(&var.name, "Superclass must be a class.")),
            },
            None => None,
        };

        // Methods close over a scope binding `super` when there is one.
        let method_scope: EnvRef = match &superclass {
            Some(sup) => {
                let scope = self.new_scope(Rc::clone(&self.environment));
                scope
                    .borrow_mut()
                    .define("super", Value::Class(Rc::clone(sup)));
                scope
            }
            None => Rc::clone(&self.environment),
        };

        let methods: HashMap<String, Rc<Function>> = methods
            .iter()
            .map(|decl| {
                let is_initializer = decl.name.lexeme == INITIALIZER;
                let function = Function::new(Rc::clone(decl), Rc::clone(&method_scope), is_initializer);
                (decl.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        info!(
            "Declaring class '{}' with {} method(s){}",
            name.lexeme,
            methods.len(),
            superclass
                .as_ref()
                .map(|s| format!(" inheriting from '{}'", s.name()))
                .unwrap_or_default()
        );

        let class = Class::new(name.lexeme.clone(), superclass, methods);
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Class(Rc::new(class)));

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        ensure_sufficient_stack(|| self.evaluate_inner(expr))
    }

    fn evaluate_inner(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.token_type {
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(TurtleError::runtime(operator, "Operand must be a number.")),
                    },
                    _ => Err(TurtleError::runtime(operator, "Invalid unary operator.")),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                // The deciding operand is the result, uncoerced.
                let decided = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if decided {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable(var) => self.look_up_variable(var),

            Expr::Assign { target, value } => {
                let value = self.evaluate(value)?;

                match target.depth() {
                    Some(distance) => environment::assign_at(
                        &self.environment,
                        distance,
                        &target.name,
                        value.clone(),
                    )?,
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&target.name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                let callable: Callable = callee.as_callable().ok_or_else(|| {
                    TurtleError::runtime(paren, "Can only call functions and classes.")
                })?;

                if values.len() != callable.arity() {
                    return Err(TurtleError::runtime(
                        paren,
                        format!(
                            "Expected {} arguments but got {}.",
                            callable.arity(),
                            values.len()
                        ),
                    ));
                }

                self.invoke(&callable, paren, values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(TurtleError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(TurtleError::runtime(name, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::This(keyword) => self.look_up_variable(keyword),

            Expr::Super { keyword, method } => self.super_method(keyword, method),
        }
    }

    /// Enter a call frame.  Guards the depth and grows the native stack so
    /// runaway recursion surfaces as a runtime error rather than a crash.
    fn invoke(&mut self, callable: &Callable, paren: &Token, arguments: Vec<Value>) -> Result<Value> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(TurtleError::runtime(paren, "Stack overflow."));
        }

        self.call_depth += 1;
        let result = ensure_sufficient_stack(|| callable.call(self, paren, arguments));
        self.call_depth -= 1;

        result
    }

    /// `super.method`: the superclass is the one bound where the enclosing
    /// method was *declared*, and `this` lives one scope nearer.
    fn super_method(&mut self, keyword: &VarRef, method: &Token) -> Result<Value> {
        let misplaced = || TurtleError::runtime(&keyword.name, "Can't use 'super' outside of a class.");

        let distance: usize = keyword.depth().ok_or_else(misplaced)?;

        let Value::Class(superclass) =
            environment::get_at(&self.environment, distance, &keyword.name)?
        else {
            return Err(misplaced());
        };

        let this = Token::synthetic("this", keyword.name.line);
        let Value::Instance(instance) = environment::get_at(
            &self.environment,
            distance.checked_sub(1).ok_or_else(misplaced)?,
            &this,
        )?
        else {
            return Err(misplaced());
        };

        let bound = superclass
            .find_method(&method.lexeme)
            .ok_or_else(|| {
                TurtleError::runtime(method, format!("Undefined property '{}'.", method.lexeme))
            })?
            .bind(instance);

        Ok(Value::Function(Rc::new(bound)))
    }

    fn look_up_variable(&self, var: &VarRef) -> Result<Value> {
        match var.depth() {
            Some(distance) => environment::get_at(&self.environment, distance, &var.name),
            None => self.globals.borrow().get(&var.name),
        }
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        let _ = self.out.flush();
        debug!(
            "Interpreter dropped with {} live scope(s) and {} live instance(s)",
            self.heap.live_scopes(),
            self.heap.live_instances()
        );
        self.heap.sweep();
    }
}

/// Arithmetic, comparison and equality.  No implicit coercion; division by
/// zero follows IEEE‑754 (`inf` / `NaN`).
fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    use Value::{Bool, Number};

    let numbers = || TurtleError::runtime(operator, "Operands must be numbers.");

    match operator.token_type {
        TokenType::PLUS => match (left, right) {
            (Number(a), Number(b)) => Ok(Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            _ => Err(TurtleError::runtime(
                operator,
                "Operands must be two numbers or two strings.",
            )),
        },

        TokenType::EQUAL_EQUAL => Ok(Bool(left == right)),
        TokenType::BANG_EQUAL => Ok(Bool(left != right)),

        _ => {
            let (Number(a), Number(b)) = (left, right) else {
                return Err(numbers());
            };

            match operator.token_type {
                TokenType::MINUS => Ok(Number(a - b)),
                TokenType::STAR => Ok(Number(a * b)),
                TokenType::SLASH => Ok(Number(a / b)),
                TokenType::GREATER => Ok(Bool(a > b)),
                TokenType::GREATER_EQUAL => Ok(Bool(a >= b)),
                TokenType::LESS => Ok(Bool(a < b)),
                TokenType::LESS_EQUAL => Ok(Bool(a <= b)),
                _ => Err(TurtleError::runtime(operator, "Invalid binary operator.")),
            }
        }
    }
}

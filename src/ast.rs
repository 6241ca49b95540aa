//! Syntax tree produced by the [`Parser`](crate::parser::Parser).
//!
//! Every node owns its children.  Function declarations are reference
//! counted so that runtime function values can share them with the tree
//! instead of cloning whole bodies.
//!
//! Dropping a tree is iterative: nested children are detached onto a work
//! list first, so a deeply nested expression or block frees without
//! recursing once per level.

use std::cell::Cell;
use std::mem;
use std::rc::Rc;

use crate::token::Token;

/// A **literal constant** that appears directly in the source code.
///
/// The parser copies (or converts) the value at parse‑time so the AST
/// does not depend on the token that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constant `true`.
    True,

    /// The boolean constant `false`.
    False,

    /// The `nil` literal.
    Nil,
}

/// A use of a name whose binding the resolver locates statically.
///
/// `depth` is the number of scopes between the use and the scope that
/// declares the name.  It stays `None` for globals.
#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub name: Token,
    depth: Cell<Option<usize>>,
}

impl VarRef {
    pub fn new(name: Token) -> Self {
        Self {
            name,
            depth: Cell::new(None),
        }
    }

    /// Record the scope distance found by the resolver.
    pub fn resolve(&self, depth: usize) {
        self.depth.set(Some(depth));
    }

    pub fn depth(&self) -> Option<usize> {
        self.depth.get()
    }
}

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Prefix unary operator expression
    /// *Example:* `!isReady` or `-42`
    Unary {
        /// The operator token (`!` or `-`).
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix binary operator expression
    /// *Example:* `a + b`, `x <= y`
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token, // `AND` or `OR`
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Variable access.
    Variable(VarRef),

    /// Assignment expression: `identifier "=" expression`
    Assign { target: VarRef, value: Box<Expr> },

    /// Function‑, method‑ or constructor‑call expression.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This(VarRef),

    /// `super.method` inside a subclass method.
    Super { keyword: VarRef, method: Token },
}

/// A named function or method: shared between the tree and the runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

/// **Abstract‑Syntax‑Tree node** for *statements*.  A program is a sequence
/// of these nodes returned by [`Parser::parse`](crate::parser::Parser::parse).
///
/// `for` loops do not appear here: the parser lowers them to `While`.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    /// Function declaration ‑ becomes a first‑class callable value.
    Function(Rc<FunctionDecl>),

    /// `return` statement.  Absent value ⇒ `nil` is returned.
    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    /// `class Name (< Super)? { methods }`
    Class {
        name: Token,
        superclass: Option<VarRef>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}

impl Expr {
    fn is_leaf(&self) -> bool {
        matches!(
            self,
            Expr::Literal(_) | Expr::Variable(_) | Expr::This(_) | Expr::Super { .. }
        )
    }

    /// Move every non-leaf child into `out`, leaving `nil` in its place.
    fn detach_children(&mut self, out: &mut Vec<Expr>) {
        let mut detach = |slot: &mut Box<Expr>| {
            if !slot.is_leaf() {
                out.push(mem::replace(&mut **slot, Expr::Literal(LiteralValue::Nil)));
            }
        };

        match self {
            Expr::Literal(_) | Expr::Variable(_) | Expr::This(_) | Expr::Super { .. } => {}
            Expr::Unary { right, .. } => detach(right),
            Expr::Grouping(inner) => detach(inner),
            Expr::Assign { value, .. } => detach(value),
            Expr::Get { object, .. } => detach(object),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                detach(left);
                detach(right);
            }
            Expr::Set { object, value, .. } => {
                detach(object);
                detach(value);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                detach(callee);
                out.extend(arguments.drain(..).filter(|arg| !arg.is_leaf()));
            }
        }
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        if self.is_leaf() {
            return;
        }

        let mut pending: Vec<Expr> = Vec::new();
        self.detach_children(&mut pending);

        while let Some(mut expr) = pending.pop() {
            expr.detach_children(&mut pending);
        }
    }
}

impl Stmt {
    /// Move nested statements into `out`, leaving empty blocks behind.
    fn detach_children(&mut self, out: &mut Vec<Stmt>) {
        let mut detach = |slot: &mut Box<Stmt>| {
            out.push(mem::replace(&mut **slot, Stmt::Block(Vec::new())));
        };

        match self {
            Stmt::Block(statements) => out.append(statements),
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                detach(then_branch);
                if let Some(else_branch) = else_branch {
                    detach(else_branch);
                }
            }
            Stmt::While { body, .. } => detach(body),
            Stmt::Expression(_)
            | Stmt::Print(_)
            | Stmt::Var { .. }
            | Stmt::Function(_)
            | Stmt::Return { .. }
            | Stmt::Class { .. } => {}
        }
    }
}

impl Drop for Stmt {
    fn drop(&mut self) {
        let mut pending: Vec<Stmt> = Vec::new();
        self.detach_children(&mut pending);

        while let Some(mut stmt) = pending.pop() {
            stmt.detach_children(&mut pending);
        }
    }
}

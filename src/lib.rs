pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod heap;
pub mod interpreter;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod stack;
pub mod token;
pub mod value;

pub use error::{Result, TurtleError};
pub use session::{Outcome, Session};

//! Driver that sequences scan → parse → resolve → interpret per unit of input.
//!
//! A [`Session`] owns the "had error" state explicitly.  A file run is one
//! unit; the interactive prompt runs one unit per line and calls
//! [`Session::reset`] in between, so an error on one line does not poison the
//! next while globals defined earlier stay visible.

use std::io::{self, BufRead, Write};

use log::{info, warn};

use crate::error::{Result, TurtleError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan;

/// Usage error (bad command line).
pub const EX_USAGE: i32 = 64;

/// Input data error: lexical, syntax or resolution diagnostics.
pub const EX_DATAERR: i32 = 65;

/// Internal software error: a runtime error aborted the program.
pub const EX_SOFTWARE: i32 = 70;

/// I/O error reading the script.
pub const EX_IOERR: i32 = 74;

/// What happened to one unit of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Ran to completion.
    Ok,

    /// Static diagnostics were reported; nothing was executed.
    StaticError,

    /// Execution started and was aborted by a runtime error.
    RuntimeError,
}

impl Outcome {
    /// Conventional process exit status for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Ok => 0,
            Outcome::StaticError => EX_DATAERR,
            Outcome::RuntimeError => EX_SOFTWARE,
        }
    }
}

pub struct Session {
    interpreter: Interpreter,
    diagnostics: Box<dyn Write>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Program output to stdout, diagnostics to stderr.
    pub fn new() -> Self {
        Self::with_sinks(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn with_sinks(out: Box<dyn Write>, diagnostics: Box<dyn Write>) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
            diagnostics,
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// A static diagnostic has been reported since the last reset.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// A runtime error has been reported since the last reset.
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Clear both error flags.  Interpreter state is kept.
    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    /// Run one unit of input.  Evaluation is skipped entirely while the
    /// static error flag is set.
    pub fn run(&mut self, source: &str) -> Outcome {
        info!("Running unit of {} bytes", source.len());

        let (tokens, lex_errors) = scan(source);
        self.report_all(lex_errors);

        let (statements, parse_errors) = Parser::new(tokens).parse();
        self.report_all(parse_errors);

        if self.had_error {
            return Outcome::StaticError;
        }

        let resolve_errors = Resolver::new().resolve(&statements);
        self.report_all(resolve_errors);

        if self.had_error {
            return Outcome::StaticError;
        }

        match self.interpreter.interpret(&statements) {
            Ok(()) => Outcome::Ok,
            Err(e) => {
                self.report(&e);
                Outcome::RuntimeError
            }
        }
    }

    /// Read‑eval‑print loop: one unit per line until end of input.
    pub fn run_prompt<R: BufRead>(&mut self, input: R, prompt: &mut dyn Write) -> Result<()> {
        info!("Starting interactive prompt");

        let mut lines = input.lines();

        loop {
            write!(prompt, "> ")?;
            prompt.flush()?;

            let Some(line) = lines.next() else {
                break;
            };

            self.run(&line?);
            self.reset();
        }

        writeln!(prompt)?;
        Ok(())
    }

    fn report_all(&mut self, errors: Vec<TurtleError>) {
        for e in &errors {
            self.report(e);
        }
    }

    fn report(&mut self, error: &TurtleError) {
        if error.is_static() {
            self.had_error = true;
        } else {
            self.had_runtime_error = true;
        }

        if let Err(io) = writeln!(self.diagnostics, "{}", error) {
            warn!("Failed to write diagnostic: {}", io);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::SharedBuffer;

    #[test]
    fn exit_codes() {
        assert_eq!(Outcome::Ok.exit_code(), 0);
        assert_eq!(Outcome::StaticError.exit_code(), 65);
        assert_eq!(Outcome::RuntimeError.exit_code(), 70);
    }

    #[test]
    fn static_error_flag_survives_until_reset() {
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let mut session = Session::with_sinks(Box::new(out.clone()), Box::new(err.clone()));

        assert_eq!(session.run("print ;"), Outcome::StaticError);
        assert!(session.had_error());

        // Still flagged: a file run would not evaluate further units.
        assert_eq!(session.run("print 1;"), Outcome::StaticError);
        assert_eq!(out.contents(), "");

        session.reset();
        assert_eq!(session.run("print 1;"), Outcome::Ok);
        assert_eq!(out.contents(), "1\n");
    }

    #[test]
    fn runtime_error_flag_is_separate() {
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let mut session = Session::with_sinks(Box::new(out.clone()), Box::new(err.clone()));

        assert_eq!(session.run("print nope;"), Outcome::RuntimeError);
        assert!(session.had_runtime_error());
        assert!(!session.had_error());
        assert_eq!(err.contents(), "Undefined variable 'nope'.\n[line 1] at 'nope'\n");

        // A runtime error does not block later units.
        assert_eq!(session.run("print 2;"), Outcome::Ok);
        assert_eq!(out.contents(), "2\n");

        session.reset();
        assert!(!session.had_runtime_error());
    }
}

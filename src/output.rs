//! Output sinks for `print` and diagnostics.
//!
//! The interpreter writes through any `std::io::Write`.  Production uses
//! stdout/stderr; tests and embedders use [`SharedBuffer`] to capture output
//! and read it back after a run.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// An in‑memory, clonable writer.  Every clone appends to the same buffer.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    buffer: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.buffer.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

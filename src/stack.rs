//! Native stack growth for the recursive passes.
//!
//! The parser, the resolver, the interpreter and the tree printer all recurse
//! once per level of syntactic nesting.  Their recursive entry points run
//! through [`ensure_sufficient_stack`], so a deeply nested program continues
//! on a freshly allocated stack segment instead of overflowing the thread's
//! stack.

/// Keep at least this much native stack free before recursing.
const RED_ZONE: usize = 128 * 1024;

/// Native stack added each time the red zone is hit.
const STACK_GROWTH: usize = 2 * 1024 * 1024;

/// Run `f`, first switching to a new stack segment if less than the red
/// zone remains.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_GROWTH, f)
}

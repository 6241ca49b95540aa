//! Bookkeeping for runtime allocations that can form reference cycles.
//!
//! Scopes and instances are reference counted, so anything acyclic is freed
//! as soon as it becomes unreachable.  Cycles (a global function closing over
//! the globals, an instance holding its own bound method) are not: the heap
//! keeps a weak handle to every scope and instance and [`Heap::sweep`] clears
//! whatever is still alive, which breaks every cycle at once.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::debug;

use crate::class::{Class, Instance};
use crate::environment::{EnvRef, Environment};
use crate::value::InstanceRef;

/// Dead handles are pruned when a list grows past twice its last live size.
const MIN_PRUNE_THRESHOLD: usize = 256;

pub struct Heap {
    scopes: Vec<Weak<RefCell<Environment>>>,
    instances: Vec<Weak<RefCell<Instance>>>,
    scope_threshold: usize,
    instance_threshold: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            instances: Vec::new(),
            scope_threshold: MIN_PRUNE_THRESHOLD,
            instance_threshold: MIN_PRUNE_THRESHOLD,
        }
    }

    /// Allocate and track a scope.
    pub fn scope(&mut self, env: Environment) -> EnvRef {
        let env: EnvRef = Rc::new(RefCell::new(env));
        self.scopes.push(Rc::downgrade(&env));

        if self.scopes.len() >= self.scope_threshold {
            prune(&mut self.scopes, &mut self.scope_threshold);
        }

        env
    }

    /// Allocate and track an instance of `class`.
    pub fn instance(&mut self, class: Rc<Class>) -> InstanceRef {
        let instance: InstanceRef = Rc::new(RefCell::new(Instance::new(class)));
        self.instances.push(Rc::downgrade(&instance));

        if self.instances.len() >= self.instance_threshold {
            prune(&mut self.instances, &mut self.instance_threshold);
        }

        instance
    }

    /// Number of tracked scopes that are still alive.
    pub fn live_scopes(&self) -> usize {
        self.scopes.iter().filter(|w| w.strong_count() > 0).count()
    }

    /// Number of tracked instances that are still alive.
    pub fn live_instances(&self) -> usize {
        self.instances.iter().filter(|w| w.strong_count() > 0).count()
    }

    /// Clear every live scope and instance.  Values that were only kept alive
    /// through a cycle are freed as a result.
    pub fn sweep(&mut self) {
        debug!(
            "Sweeping {} scope handle(s) and {} instance handle(s)",
            self.scopes.len(),
            self.instances.len()
        );

        for scope in self.scopes.drain(..) {
            if let Some(scope) = scope.upgrade() {
                if let Ok(mut scope) = scope.try_borrow_mut() {
                    scope.clear();
                }
            }
        }

        for instance in self.instances.drain(..) {
            if let Some(instance) = instance.upgrade() {
                if let Ok(mut instance) = instance.try_borrow_mut() {
                    instance.clear();
                }
            }
        }
    }
}

fn prune<T>(handles: &mut Vec<Weak<T>>, threshold: &mut usize) {
    handles.retain(|w| w.strong_count() > 0);
    *threshold = (handles.len() * 2).max(MIN_PRUNE_THRESHOLD);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::collections::HashMap;

    #[test]
    fn sweep_breaks_instance_self_cycle() {
        let mut heap = Heap::new();
        let class = Rc::new(Class::new("Node".into(), None, HashMap::new()));
        let node = heap.instance(class);
        let weak = Rc::downgrade(&node);

        let name = crate::token::Token::synthetic("me", 1);
        node.borrow_mut().set(&name, Value::Instance(node.clone()));
        drop(node);

        assert_eq!(heap.live_instances(), 1, "cycle keeps the node alive");

        heap.sweep();
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn dead_handles_are_pruned() {
        let mut heap = Heap::new();

        for _ in 0..(MIN_PRUNE_THRESHOLD * 4) {
            let _ = heap.scope(Environment::new());
        }

        assert!(heap.scopes.len() < MIN_PRUNE_THRESHOLD);
        assert_eq!(heap.live_scopes(), 0);
    }
}

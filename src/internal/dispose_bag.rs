//! Tracked-instance bag with LIFO disposal.

use std::sync::Arc;

use crate::dispose::Dispose;

/// Ordered collection of tracked disposables belonging to one scope.
///
/// Instances are disposed in reverse creation order. Draining on disposal
/// makes a second run a no-op, so double-disposing a scope never re-runs
/// user cleanup.
#[derive(Default)]
pub(crate) struct DisposeBag {
    items: Vec<Arc<dyn Dispose>>,
}

impl DisposeBag {
    pub(crate) fn new() -> Self {
        DisposeBag::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn push(&mut self, item: Arc<dyn Dispose>) {
        self.items.push(item);
    }

    /// Disposes all tracked instances, newest first. Panics propagate.
    pub(crate) fn run_reverse(&mut self) {
        while let Some(item) = self.items.pop() {
            item.dispose();
        }
    }

    /// Disposes all tracked instances, newest first, swallowing panics from
    /// individual disposers so the remainder still runs.
    pub(crate) fn run_reverse_best_effort(&mut self) {
        while let Some(item) = self.items.pop() {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| item.dispose()));
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

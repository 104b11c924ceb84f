//! Scopes: disposal tracking and scoped-singleton caching.
//!
//! Scopes form a tree under the container's implicit root scope. Scoped
//! registrations cache once per top-level scope tree; disposal walks
//! children first, then runs the scope's own tracked items in reverse
//! registration order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::compiler::CacheKey;
use crate::dispose::Dispose;
use crate::error::{DiError, DiResult};
use crate::internal::{DisposeBag, OnceMap};
use crate::types::{Instance, TypeRef};

use super::{Container, ContainerInner};

/// A disposal scope. Cheap to clone; all clones share the same scope state.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

pub(crate) struct ScopeInner {
    container: Weak<ContainerInner>,
    parent: Option<Weak<ScopeInner>>,
    /// True for the container's implicit root scope.
    is_root: bool,
    children: Mutex<Vec<Arc<ScopeInner>>>,
    tracked: Mutex<DisposeBag>,
    scoped: OnceMap<CacheKey, Instance>,
    disposed: AtomicBool,
}

impl Scope {
    pub(crate) fn root(container: Weak<ContainerInner>) -> Scope {
        Scope {
            inner: Arc::new(ScopeInner {
                container,
                parent: None,
                is_root: true,
                children: Mutex::new(Vec::new()),
                tracked: Mutex::new(DisposeBag::new()),
                scoped: OnceMap::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Opens a child scope. A child of the root scope starts a new top-level
    /// scope tree; deeper children share their ancestor's tree.
    pub fn create_scope(&self) -> DiResult<Scope> {
        if self.is_disposed() {
            return Err(DiError::Disposed("scope"));
        }
        let child = Arc::new(ScopeInner {
            container: self.inner.container.clone(),
            parent: Some(Arc::downgrade(&self.inner)),
            is_root: false,
            children: Mutex::new(Vec::new()),
            tracked: Mutex::new(DisposeBag::new()),
            scoped: OnceMap::new(),
            disposed: AtomicBool::new(false),
        });
        self.inner.children.lock().unwrap().push(child.clone());
        Ok(Scope { inner: child })
    }

    /// Resolves `contract` with this scope active, so tracked and scoped
    /// instances attach here rather than to the container root.
    pub fn resolve(&self, contract: &TypeRef, name: Option<&str>) -> DiResult<Instance> {
        let container = self.container()?;
        container.resolve_in_scope(contract, name, self)
    }

    /// Like [`resolve`](Scope::resolve), mapping a missing registration to
    /// `None` instead of an error.
    pub fn try_resolve(&self, contract: &TypeRef, name: Option<&str>) -> DiResult<Option<Instance>> {
        match self.resolve(contract, name) {
            Ok(v) => Ok(Some(v)),
            Err(DiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Registers a disposable with this scope. It runs, in reverse
    /// registration order, when the scope is disposed.
    pub fn track(&self, item: Arc<dyn Dispose>) -> DiResult<()> {
        if self.is_disposed() {
            return Err(DiError::Disposed("scope"));
        }
        self.inner.tracked.lock().unwrap().push(item);
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Disposes this scope: children first (depth-first), then this scope's
    /// tracked items newest-first. Repeated calls are no-ops.
    pub fn dispose(&self) {
        self.inner.dispose();
        self.unlink();
    }

    /// The root of this scope's top-level tree: the nearest ancestor whose
    /// parent is the container root. The root scope is its own tree.
    pub(crate) fn tree_root(&self) -> Scope {
        let mut current = self.inner.clone();
        loop {
            let parent = match &current.parent {
                None => return Scope { inner: current },
                Some(weak) => match weak.upgrade() {
                    Some(parent) => parent,
                    None => return Scope { inner: current },
                },
            };
            if parent.is_root {
                return Scope { inner: current };
            }
            current = parent;
        }
    }

    pub(crate) fn scoped_cache(&self) -> &OnceMap<CacheKey, Instance> {
        &self.inner.scoped
    }

    pub(crate) fn container(&self) -> DiResult<Container> {
        match self.inner.container.upgrade() {
            Some(inner) => Ok(Container::from_inner(inner)),
            None => Err(DiError::Disposed("container")),
        }
    }

    fn unlink(&self) {
        let parent = self
            .inner
            .parent
            .as_ref()
            .and_then(|weak| weak.upgrade());
        if let Some(parent) = parent {
            parent
                .children
                .lock()
                .unwrap()
                .retain(|c| !Arc::ptr_eq(c, &self.inner));
        }
    }
}

impl ScopeInner {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let children = std::mem::take(&mut *self.children.lock().unwrap());
        for child in children {
            child.dispose();
        }
        self.tracked.lock().unwrap().run_reverse();
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        let bag = self.tracked.get_mut().unwrap();
        if !bag.is_empty() {
            eprintln!(
                "warning: scope dropped without dispose(); running {} tracked item(s)",
                bag.len()
            );
            bag.run_reverse_best_effort();
        }
    }
}

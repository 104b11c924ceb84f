//! The live resolution context handed to delegates and plan execution.

use std::sync::Arc;

use crate::error::DiResult;
use crate::types::{downcast, Instance, TypeRef};

use super::{Container, Scope};

/// Everything a resolution in flight can see: the container, the active
/// scope, and the name of the original request. Nested resolutions keep the
/// original name, so a request for `"app.web"` deferred into a dependency
/// still walks the same name ladder.
pub struct ResolveContext<'a> {
    container: &'a Container,
    scope: Scope,
    name: Option<Arc<str>>,
}

impl<'a> ResolveContext<'a> {
    pub(crate) fn new(
        container: &'a Container,
        scope: Scope,
        name: Option<&str>,
    ) -> ResolveContext<'a> {
        ResolveContext {
            container,
            scope,
            name: name.map(Arc::from),
        }
    }

    pub fn container(&self) -> &Container {
        self.container
    }

    /// The scope tracked instances attach to.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The name of the original request, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Resolves a dependency under the original request's name.
    pub fn resolve(&self, contract: &TypeRef) -> DiResult<Instance> {
        self.container
            .resolve_in_scope(contract, self.name(), &self.scope)
    }

    /// Resolves a dependency under an explicit name, replacing the original.
    pub fn resolve_named(&self, contract: &TypeRef, name: &str) -> DiResult<Instance> {
        self.container
            .resolve_in_scope(contract, Some(name), &self.scope)
    }

    /// Resolves and downcasts in one step, for delegate bodies.
    pub fn resolve_as<T: Send + Sync + 'static>(&self, contract: &TypeRef) -> DiResult<Arc<T>> {
        downcast::<T>(&self.resolve(contract)?)
    }

    /// The same request context with the container root scope active.
    pub(crate) fn at_root(&self) -> ResolveContext<'a> {
        ResolveContext {
            container: self.container,
            scope: self.container.root_scope().clone(),
            name: self.name.clone(),
        }
    }

    /// The same request context with `scope` active.
    pub(crate) fn at_scope(&self, scope: Scope) -> ResolveContext<'a> {
        ResolveContext {
            container: self.container,
            scope,
            name: self.name.clone(),
        }
    }
}

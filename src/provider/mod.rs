//! The container: compiled-plan cache, singleton storage, and the root of
//! the scope tree.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::compiler::{CacheKey, CompileContext, Plan};
use crate::composer::{self, ResolvedCollection};
use crate::config::ContainerOptions;
use crate::error::{DiError, DiResult};
use crate::internal::OnceMap;
use crate::registry::RegistryLayer;
use crate::types::{downcast, Instance, TypeGraph, TypeRef};

mod context;
mod scope;

pub use context::ResolveContext;
pub use scope::Scope;

type PlanKey = (TypeRef, Option<Arc<str>>);

pub(crate) struct ContainerInner {
    graph: Arc<TypeGraph>,
    options: ContainerOptions,
    layer: Arc<RegistryLayer>,
    /// Kept alive so parent singletons and scopes outlive every child.
    parent: Option<Container>,
    plans: Mutex<HashMap<PlanKey, Arc<Plan>>>,
    collection_plans: Mutex<HashMap<TypeRef, Arc<Plan>>>,
    singletons: OnceMap<CacheKey, Instance>,
    root_scope: OnceCell<Scope>,
}

/// An immutable resolution container. Cheap to clone; all clones share the
/// same plan cache, singleton storage, and root scope.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    pub(crate) fn build(
        graph: Arc<TypeGraph>,
        options: ContainerOptions,
        layer: Arc<RegistryLayer>,
        parent: Option<Container>,
    ) -> Container {
        let inner = Arc::new(ContainerInner {
            graph,
            options,
            layer,
            parent,
            plans: Mutex::new(HashMap::new()),
            collection_plans: Mutex::new(HashMap::new()),
            singletons: OnceMap::new(),
            root_scope: OnceCell::new(),
        });
        let root = Scope::root(Arc::downgrade(&inner));
        // Freshly created cell, the set cannot fail.
        let _ = inner.root_scope.set(root);
        Container { inner }
    }

    pub(crate) fn from_inner(inner: Arc<ContainerInner>) -> Container {
        Container { inner }
    }

    /// The type graph this container resolves against.
    pub fn graph(&self) -> &TypeGraph {
        &self.inner.graph
    }

    /// The parent this container is layered over, if any.
    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    /// Resolves a closed contract, optionally under a hierarchical name.
    pub fn resolve(&self, contract: &TypeRef, name: Option<&str>) -> DiResult<Instance> {
        self.resolve_in_scope(contract, name, self.root_scope())
    }

    /// Resolves and downcasts in one step.
    pub fn resolve_as<T: Send + Sync + 'static>(
        &self,
        contract: &TypeRef,
        name: Option<&str>,
    ) -> DiResult<Arc<T>> {
        downcast::<T>(&self.resolve(contract, name)?)
    }

    /// Like [`resolve`](Container::resolve), mapping a missing registration
    /// to `None` instead of an error.
    pub fn try_resolve(
        &self,
        contract: &TypeRef,
        name: Option<&str>,
    ) -> DiResult<Option<Instance>> {
        match self.resolve(contract, name) {
            Ok(v) => Ok(Some(v)),
            Err(DiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Every registration compatible with `element`, composed the same way
    /// an `Enumerable<element>` request would be, regardless of whether
    /// collection injection is enabled.
    pub fn resolve_all(&self, element: &TypeRef) -> DiResult<Arc<ResolvedCollection>> {
        let plan = self.collection_plan(element)?;
        let ctx = ResolveContext::new(self, self.root_scope().clone(), None);
        downcast::<ResolvedCollection>(&plan.execute(&ctx)?)
    }

    /// Opens a new top-level scope tree.
    pub fn create_scope(&self) -> DiResult<Scope> {
        self.root_scope().create_scope()
    }

    /// Disposes the container: every open scope, then every tracked
    /// singleton, newest first. Resolution afterwards fails with
    /// [`DiError::Disposed`]. Repeated calls are no-ops.
    pub fn dispose(&self) {
        self.root_scope().dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.root_scope().is_disposed()
    }

    pub(crate) fn root_scope(&self) -> &Scope {
        // Set during build, before the container is handed out.
        self.inner.root_scope.get().unwrap()
    }

    pub(crate) fn singletons(&self) -> &OnceMap<CacheKey, Instance> {
        &self.inner.singletons
    }

    pub(crate) fn layer(&self) -> &Arc<RegistryLayer> {
        &self.inner.layer
    }

    pub(crate) fn resolve_in_scope(
        &self,
        contract: &TypeRef,
        name: Option<&str>,
        scope: &Scope,
    ) -> DiResult<Instance> {
        if scope.is_disposed() {
            return Err(DiError::Disposed("scope"));
        }
        let plan = self.plan_for(contract, name)?;
        let ctx = ResolveContext::new(self, scope.clone(), name);
        plan.execute(&ctx)
    }

    fn plan_for(&self, contract: &TypeRef, name: Option<&str>) -> DiResult<Arc<Plan>> {
        let key: PlanKey = (contract.clone(), name.map(Arc::from));
        if let Some(plan) = self.inner.plans.lock().unwrap().get(&key) {
            return Ok(plan.clone());
        }
        // Compiled outside the lock; racing threads produce equivalent plans
        // and the first insert wins.
        let mut ctx = CompileContext::new(
            &self.inner.graph,
            &self.inner.options,
            self.inner.layer.clone(),
            name,
        );
        let plan = Arc::new(ctx.compile_request(contract, name)?);
        Ok(self
            .inner
            .plans
            .lock()
            .unwrap()
            .entry(key)
            .or_insert(plan)
            .clone())
    }

    fn collection_plan(&self, element: &TypeRef) -> DiResult<Arc<Plan>> {
        if let Some(plan) = self.inner.collection_plans.lock().unwrap().get(element) {
            return Ok(plan.clone());
        }
        let mut ctx = CompileContext::new(
            &self.inner.graph,
            &self.inner.options,
            self.inner.layer.clone(),
            None,
        );
        let plan = Arc::new(composer::compose_collection(&mut ctx, element)?);
        Ok(self
            .inner
            .collection_plans
            .lock()
            .unwrap()
            .entry(element.clone())
            .or_insert(plan)
            .clone())
    }
}

/// A late-binding handle for one contract, produced by automatic
/// `Func<T>` injection. Each call re-enters the container, so transient
/// contracts yield a fresh instance per call.
pub struct Factory {
    container: Container,
    scope: Scope,
    contract: TypeRef,
    name: Option<Arc<str>>,
}

impl Factory {
    pub(crate) fn new(
        container: Container,
        scope: Scope,
        contract: TypeRef,
        name: Option<Arc<str>>,
    ) -> Factory {
        Factory {
            container,
            scope,
            contract,
            name,
        }
    }

    /// The contract this factory produces.
    pub fn contract(&self) -> &TypeRef {
        &self.contract
    }

    /// Resolves a fresh value against the scope the factory was created in.
    pub fn resolve(&self) -> DiResult<Instance> {
        self.container
            .resolve_in_scope(&self.contract, self.name.as_deref(), &self.scope)
    }

    pub fn resolve_as<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        downcast::<T>(&self.resolve()?)
    }
}

/// A memoized handle produced by automatic `Lazy<T>` injection: the first
/// `get` resolves and caches, later calls return the cached instance.
pub struct LazyInstance {
    factory: Factory,
    cell: OnceCell<Instance>,
}

impl LazyInstance {
    pub(crate) fn new(factory: Factory) -> LazyInstance {
        LazyInstance {
            factory,
            cell: OnceCell::new(),
        }
    }

    /// The resolved instance, produced on first call.
    pub fn get(&self) -> DiResult<Instance> {
        self.cell
            .get_or_try_init(|| self.factory.resolve())
            .cloned()
    }

    pub fn get_as<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        downcast::<T>(&self.get()?)
    }

    /// The cached instance, if `get` has already succeeded.
    pub fn peek(&self) -> Option<&Instance> {
        self.cell.get()
    }
}

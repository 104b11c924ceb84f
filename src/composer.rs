//! Decorator application and automatic composition.
//!
//! When a request has no direct registration, the composer can still satisfy
//! it: collection shapes materialize every compatible registration, and
//! `Func`/`Lazy` shapes wrap the inner contract in a deferred handle.

use std::sync::Arc;

use crate::compiler::{CompileContext, Plan};
use crate::error::DiResult;
use crate::registry::{Registry, RegistryLayer};
use crate::target::Target;
use crate::types::{downcast, Instance, TypeRef};

/// The materialized form of an `Array<T>`, `List<T>` or `Enumerable<T>`
/// request: every compatible registration's instance, in registration order.
///
/// Resolved values downcast to this type:
///
/// ```ignore
/// let all = downcast::<ResolvedCollection>(&container.resolve(&handlers, None)?)?;
/// for item in all.items() { /* ... */ }
/// ```
pub struct ResolvedCollection {
    element: TypeRef,
    items: Vec<Instance>,
}

impl ResolvedCollection {
    /// A collection built by hand, for explicit registrations that replace
    /// automatic composition.
    pub fn new(element: TypeRef, items: Vec<Instance>) -> ResolvedCollection {
        ResolvedCollection { element, items }
    }

    /// The element contract the collection was composed for.
    pub fn element(&self) -> &TypeRef {
        &self.element
    }

    /// The composed instances in registration order. Empty when nothing
    /// compatible is registered.
    pub fn items(&self) -> &[Instance] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Downcasts every item to `T`, failing on the first mismatch.
    pub fn items_as<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.items.iter().map(downcast::<T>).collect()
    }
}

/// Wraps `plan` in every decorator registered for `requested`, most recently
/// registered outermost. Each decorator sees the partially wrapped chain as a
/// context-local prebuilt registration for the same contract, so resolving
/// the decorated contract from inside a decorator yields the next inner
/// component rather than recursing.
pub(crate) fn apply_decorators(
    ctx: &mut CompileContext<'_>,
    plan: Plan,
    requested: &TypeRef,
) -> DiResult<Plan> {
    let decorators = ctx.layer().decorators_for(requested);
    let mut plan = plan;
    for decorator in decorators {
        let mut local = Registry::new();
        local.register(
            requested.clone(),
            None,
            Arc::new(Target::compiled(requested.clone(), Arc::new(plan))),
        );
        let layer = RegistryLayer::over(local, ctx.layer().clone());
        plan = ctx.with_layer(layer, |ctx| ctx.compile(&decorator, requested))?;
    }
    Ok(plan)
}

/// Automatic composition for unregistered requests. Returns `None` when the
/// contract is not an enabled composition shape.
pub(crate) fn compose_auto(
    ctx: &mut CompileContext<'_>,
    contract: &TypeRef,
    name: Option<&str>,
) -> DiResult<Option<Plan>> {
    let def = match contract.def() {
        Some(def) => def.clone(),
        None => return Ok(None),
    };
    if contract.args().len() != 1 {
        return Ok(None);
    }
    let inner = contract.args()[0].clone();
    let builtins = ctx.graph().builtins();

    let enabled = if def == builtins.array {
        ctx.options().array_injection_for(inner.def())
    } else if def == builtins.list {
        ctx.options().list_injection_for(inner.def())
    } else if def == builtins.enumerable {
        ctx.options().collection_injection_for(inner.def())
    } else if def == builtins.func {
        if !ctx.options().auto_func_injection_for(inner.def()) {
            return Ok(None);
        }
        return Ok(Some(Plan::Func {
            contract: inner,
            name: name.map(Arc::from),
        }));
    } else if def == builtins.lazy {
        if !ctx.options().auto_lazy_injection_for(inner.def()) {
            return Ok(None);
        }
        return Ok(Some(Plan::Lazy {
            contract: inner,
            name: name.map(Arc::from),
        }));
    } else {
        return Ok(None);
    };
    if !enabled {
        return Ok(None);
    }
    compose_collection(ctx, &inner).map(Some)
}

/// Builds the item plans for a collection of `element`: every compatible
/// unnamed registration, in global registration order, each decorated as an
/// individually requested `element` would be.
pub(crate) fn compose_collection(ctx: &mut CompileContext<'_>, element: &TypeRef) -> DiResult<Plan> {
    let targets = ctx.layer().clone().compatible_for_element(ctx.graph(), element);
    let mut items = Vec::with_capacity(targets.len());
    for target in targets {
        let item = ctx.compile(&target, element)?;
        items.push(apply_decorators(ctx, item, element)?);
    }
    Ok(Plan::Collection {
        element: element.clone(),
        items,
    })
}

//! Request compilation: turning `(target, requested type)` pairs into
//! executable plans.
//!
//! A plan is an interpreted tree built once per `(contract, name)` request
//! and cached by the container. Compilation walks the dependency graph
//! eagerly, so circular constructor chains are caught here with a full path
//! rather than at execution time.

use std::sync::Arc;

use crate::binder::{self, ParamSource};
use crate::composer;
use crate::config::{ContainerOptions, MemberBinding};
use crate::error::{DiError, DiResult};
use crate::provider::{Factory, LazyInstance, ResolveContext};
use crate::registry::RegistryLayer;
use crate::target::{DelegateFn, Target, TargetKind, Tracking};
use crate::types::graph::{ConstructFn, InjectFn, Invocation, TrackFn};
use crate::types::{map_type, Instance, TypeGraph, TypeRef};

/// Cache key for singleton and scoped instances: the identity of the
/// lifetime-wrapping target plus the closed requested type, so one open
/// generic singleton registration caches independently per closed type.
pub(crate) type CacheKey = (usize, TypeRef);

/// One member injection applied after construction.
pub(crate) struct MemberStep {
    pub(crate) inject: InjectFn,
    pub(crate) plan: Plan,
    /// A missing registration skips the member instead of failing.
    pub(crate) optional: bool,
}

/// A bound constructor invocation with everything needed at execution time.
pub(crate) struct ConstructStep {
    pub(crate) closed_type: TypeRef,
    pub(crate) construct: ConstructFn,
    pub(crate) params: Vec<Plan>,
    pub(crate) members: Vec<MemberStep>,
    pub(crate) track: Option<TrackFn>,
}

/// Executable resolution plan.
pub(crate) enum Plan {
    /// Returns a shared pre-built instance.
    Constant(Instance),
    /// Delegates to an already-compiled shared plan.
    Prebuilt(Arc<Plan>),
    /// Invokes a bound constructor, then member injection and tracking.
    Construct(ConstructStep),
    /// Caches the inner plan's instance in the container for its lifetime.
    Singleton {
        key: CacheKey,
        inner: Box<Plan>,
    },
    /// Caches the inner plan's instance once per top-level scope tree.
    Scoped {
        key: CacheKey,
        inner: Box<Plan>,
    },
    /// Materializes every compatible registration for an element contract.
    Collection {
        element: TypeRef,
        items: Vec<Plan>,
    },
    /// Invokes a user factory against the live resolve context.
    Delegate {
        factory: DelegateFn,
        track: Option<TrackFn>,
    },
    /// Re-enters the container at execution time, carrying the original
    /// request name, with an optional fallback when nothing is registered.
    Deferred {
        contract: TypeRef,
        fallback: Option<Box<Plan>>,
    },
    /// Produces a [`Factory`](crate::provider::Factory) handle for the
    /// contract instead of an instance.
    Func {
        contract: TypeRef,
        name: Option<Arc<str>>,
    },
    /// Produces a [`LazyInstance`](crate::provider::LazyInstance) handle.
    Lazy {
        contract: TypeRef,
        name: Option<Arc<str>>,
    },
    /// Sentinel for a contract with no registration. Only fails when an
    /// execution path actually reaches it.
    Missing(TypeRef),
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plan::Constant(_) => f.write_str("Constant"),
            Plan::Prebuilt(inner) => f.debug_tuple("Prebuilt").field(inner).finish(),
            Plan::Construct(step) => f
                .debug_struct("Construct")
                .field("closed_type", &step.closed_type)
                .finish_non_exhaustive(),
            Plan::Singleton { key, inner } => f
                .debug_struct("Singleton")
                .field("key", key)
                .field("inner", inner)
                .finish(),
            Plan::Scoped { key, inner } => f
                .debug_struct("Scoped")
                .field("key", key)
                .field("inner", inner)
                .finish(),
            Plan::Collection { element, items } => f
                .debug_struct("Collection")
                .field("element", element)
                .field("items", items)
                .finish(),
            Plan::Delegate { .. } => f.write_str("Delegate"),
            Plan::Deferred { contract, fallback } => f
                .debug_struct("Deferred")
                .field("contract", contract)
                .field("fallback", fallback)
                .finish(),
            Plan::Func { contract, name } => f
                .debug_struct("Func")
                .field("contract", contract)
                .field("name", name)
                .finish(),
            Plan::Lazy { contract, name } => f
                .debug_struct("Lazy")
                .field("contract", contract)
                .field("name", name)
                .finish(),
            Plan::Missing(contract) => f.debug_tuple("Missing").field(contract).finish(),
        }
    }
}

struct CycleFrame {
    target: usize,
    requested: TypeRef,
    label: String,
}

/// Compilation state: the type graph, effective options, the registry layer
/// in scope, and the explicit in-progress stack used for cycle detection.
pub(crate) struct CompileContext<'a> {
    graph: &'a TypeGraph,
    options: &'a ContainerOptions,
    layer: Arc<RegistryLayer>,
    /// Name of the originating request. Nested dependency lookups walk the
    /// same name ladder as the request that triggered them.
    request_name: Option<Arc<str>>,
    stack: Vec<CycleFrame>,
}

impl<'a> CompileContext<'a> {
    pub(crate) fn new(
        graph: &'a TypeGraph,
        options: &'a ContainerOptions,
        layer: Arc<RegistryLayer>,
        request_name: Option<&str>,
    ) -> Self {
        CompileContext {
            graph,
            options,
            layer,
            request_name: request_name.map(Arc::from),
            stack: Vec::new(),
        }
    }

    pub(crate) fn graph(&self) -> &TypeGraph {
        self.graph
    }

    pub(crate) fn options(&self) -> &ContainerOptions {
        self.options
    }

    pub(crate) fn layer(&self) -> &Arc<RegistryLayer> {
        &self.layer
    }

    /// Runs `f` with `layer` temporarily installed. Used for context-local
    /// synthetic registrations such as a decorator's undecorated inner.
    pub(crate) fn with_layer<R>(
        &mut self,
        layer: Arc<RegistryLayer>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let saved = std::mem::replace(&mut self.layer, layer);
        let out = f(self);
        self.layer = saved;
        out
    }

    /// Compiles a request for `contract` under `name`, consulting the
    /// registry and falling back to automatic composition (collections,
    /// factories, lazies) when nothing is registered.
    pub(crate) fn compile_request(
        &mut self,
        contract: &TypeRef,
        name: Option<&str>,
    ) -> DiResult<Plan> {
        if !contract.is_closed() {
            return Err(DiError::UnboundTypeParams {
                declared: contract.to_string(),
                requested: contract.to_string(),
            });
        }

        // The most recent registration that can structurally satisfy the
        // request; incompatible entries are skipped, not errors.
        let candidates = self.layer.fetch_all(contract, name);
        let chosen = candidates
            .iter()
            .rev()
            .find(|t| t.supports_type(self.graph, contract));
        if let Some(target) = chosen {
            let plan = self.compile(target, contract)?;
            // Synthetic prebuilt targets are already-decorated material.
            if matches!(target.kind(), TargetKind::Compiled { .. }) {
                return Ok(plan);
            }
            return composer::apply_decorators(self, plan, contract);
        }

        if let Some(plan) = composer::compose_auto(self, contract, name)? {
            return Ok(plan);
        }

        Ok(Plan::Missing(contract.clone()))
    }

    /// Compiles `target` for the closed `requested` contract, detecting
    /// circular dependencies against the in-progress stack.
    pub(crate) fn compile(
        &mut self,
        target: &Arc<Target>,
        requested: &TypeRef,
    ) -> DiResult<Plan> {
        let identity = Arc::as_ptr(target) as usize;
        if self
            .stack
            .iter()
            .any(|f| f.target == identity && f.requested == *requested)
        {
            let mut path: Vec<String> = self.stack.iter().map(|f| f.label.clone()).collect();
            path.push(requested.to_string());
            return Err(DiError::Circular(path));
        }
        self.stack.push(CycleFrame {
            target: identity,
            requested: requested.clone(),
            label: requested.to_string(),
        });
        let out = self.compile_kind(target, requested);
        self.stack.pop();
        out
    }

    fn compile_kind(&mut self, target: &Arc<Target>, requested: &TypeRef) -> DiResult<Plan> {
        match target.kind() {
            TargetKind::Constant { value } => Ok(Plan::Constant(value.clone())),
            TargetKind::Compiled { plan } => Ok(Plan::Prebuilt(plan.clone())),
            TargetKind::Constructor { named_args } => {
                self.compile_constructor(target, target.declared(), &[], named_args)
            }
            TargetKind::GenericConstructor { named_args } => {
                let def = match target.declared().def() {
                    Some(def) => def.clone(),
                    None => {
                        return Err(DiError::IncompatibleRegistration {
                            declared: target.declared().to_string(),
                            contract: requested.to_string(),
                        })
                    }
                };
                let mapping = map_type(self.graph, &def, requested);
                if !mapping.success {
                    return Err(DiError::IncompatibleRegistration {
                        declared: target.declared().to_string(),
                        contract: requested.to_string(),
                    });
                }
                if !mapping.fully_bound {
                    return Err(DiError::UnboundTypeParams {
                        declared: target.declared().to_string(),
                        requested: requested.to_string(),
                    });
                }
                // fully_bound guarantees a closing type.
                let closed = mapping.closing_type.clone().unwrap();
                self.compile_constructor(target, &closed, &mapping.bindings, named_args)
            }
            TargetKind::Singleton { inner } => Ok(Plan::Singleton {
                key: (identity_of(target), requested.clone()),
                inner: Box::new(self.compile(inner, requested)?),
            }),
            TargetKind::Scoped { inner } => Ok(Plan::Scoped {
                key: (identity_of(target), requested.clone()),
                inner: Box::new(self.compile(inner, requested)?),
            }),
            TargetKind::Delegate { factory } => Ok(Plan::Delegate {
                factory: factory.clone(),
                track: self.tracker_for(target, target.declared()),
            }),
            TargetKind::Deferred { contract, fallback } => {
                let fallback_plan = match fallback {
                    Some(inner) => Some(Box::new(self.compile(inner, contract)?)),
                    None => None,
                };
                // A deferral to its own contract would re-enter this plan at
                // execution time, so collapse it to its fallback here.
                if contract == requested {
                    return Ok(match fallback_plan {
                        Some(plan) => *plan,
                        None => Plan::Missing(contract.clone()),
                    });
                }
                Ok(Plan::Deferred {
                    contract: contract.clone(),
                    fallback: fallback_plan,
                })
            }
        }
    }

    fn compile_constructor(
        &mut self,
        target: &Arc<Target>,
        closed: &TypeRef,
        bindings: &[Option<TypeRef>],
        named_args: &std::collections::HashMap<String, Arc<Target>>,
    ) -> DiResult<Plan> {
        let def = match closed.def() {
            Some(def) => def.clone(),
            None => {
                return Err(DiError::NoConstructor(closed.to_string()));
            }
        };
        let descriptor = self.graph.descriptor_required(&def)?;
        let bound = binder::bind_best(self.graph, &self.layer, descriptor, bindings, named_args)?;
        let construct = bound.construct.clone();
        let track = self.tracker_for(target, closed);

        let mut params = Vec::with_capacity(bound.params.len());
        for param in bound.params {
            let plan = match param.source {
                ParamSource::Override(over) => self.compile(&over, &param.contract)?,
                ParamSource::Registry => {
                    let name = self.request_name.clone();
                    self.compile_request(&param.contract, name.as_deref())?
                }
                ParamSource::Default => {
                    // Presence checked by the binder.
                    Plan::Constant(param.default.clone().unwrap())
                }
                ParamSource::Unresolved => Plan::Deferred {
                    contract: param.contract.clone(),
                    fallback: None,
                },
            };
            params.push(plan);
        }

        let members = self.compile_members(&def, bindings)?;
        Ok(Plan::Construct(ConstructStep {
            closed_type: closed.clone(),
            construct,
            params,
            members,
            track,
        }))
    }

    fn compile_members(
        &mut self,
        def: &crate::types::TypeDef,
        bindings: &[Option<TypeRef>],
    ) -> DiResult<Vec<MemberStep>> {
        let mode = self.options.member_binding_for(Some(def));
        if mode == MemberBinding::None {
            return Ok(Vec::new());
        }
        let descriptor = match self.graph.descriptor(def) {
            Some(d) => d,
            None => return Ok(Vec::new()),
        };
        let members: Vec<(String, TypeRef, bool, InjectFn)> = descriptor
            .members()
            .iter()
            .map(|m| {
                let contract = if bindings.is_empty() {
                    m.contract.clone()
                } else {
                    m.contract.substitute(bindings)
                };
                let optional = m.optional || mode == MemberBinding::IfAvailable;
                (m.name.clone(), contract, optional, m.inject.clone())
            })
            .collect();

        let mut out = Vec::with_capacity(members.len());
        for (_, contract, optional, inject) in members {
            let name = self.request_name.clone();
            let plan = self.compile_request(&contract, name.as_deref())?;
            if optional && matches!(plan, Plan::Missing(_)) {
                continue;
            }
            out.push(MemberStep {
                inject,
                plan,
                optional,
            });
        }
        Ok(out)
    }

    /// The tracking adapter for instances this target produces, honoring the
    /// target's tracking hint.
    fn tracker_for(&self, target: &Arc<Target>, produced: &TypeRef) -> Option<TrackFn> {
        if target.tracking() == Tracking::Disabled {
            return None;
        }
        let def = produced.def()?;
        self.graph.descriptor(def)?.tracker().cloned()
    }
}

fn identity_of(target: &Arc<Target>) -> usize {
    Arc::as_ptr(target) as usize
}

impl Plan {
    /// Runs the plan against a live request context.
    pub(crate) fn execute(&self, ctx: &ResolveContext<'_>) -> DiResult<Instance> {
        match self {
            Plan::Constant(value) => Ok(value.clone()),
            Plan::Prebuilt(plan) => plan.execute(ctx),
            Plan::Construct(step) => step.execute(ctx),
            Plan::Singleton { key, inner } => ctx
                .container()
                .singletons()
                .get_or_try_init(key, || inner.execute(&ctx.at_root())),
            Plan::Scoped { key, inner } => {
                let tree = ctx.scope().tree_root();
                if tree.is_disposed() {
                    return Err(DiError::Disposed("scope"));
                }
                let cache = tree.scoped_cache();
                cache.get_or_try_init(key, || inner.execute(&ctx.at_scope(tree.clone())))
            }
            Plan::Collection { element, items } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(item.execute(ctx)?);
                }
                Ok(Arc::new(composer::ResolvedCollection::new(
                    element.clone(),
                    values,
                )))
            }
            Plan::Delegate { factory, track } => {
                let value = factory(ctx)?;
                if let Some(track) = track {
                    if let Some(disposable) = track(&value) {
                        ctx.scope().track(disposable)?;
                    }
                }
                Ok(value)
            }
            Plan::Deferred { contract, fallback } => match ctx.resolve(contract) {
                Ok(value) => Ok(value),
                Err(DiError::NotFound(missing)) => {
                    // The fallback covers an absent registration for the
                    // contract itself. A not-found raised by a nested
                    // dependency of a present registration is a real error
                    // and must not be masked.
                    let registered = ctx
                        .container()
                        .layer()
                        .fetch_all(contract, ctx.name())
                        .iter()
                        .any(|t| t.supports_type(ctx.container().graph(), contract));
                    if registered {
                        return Err(DiError::NotFound(missing));
                    }
                    match fallback {
                        Some(plan) => plan.execute(ctx),
                        None => Err(DiError::NotFound(contract.to_string())),
                    }
                }
                Err(e) => Err(e),
            },
            Plan::Func { contract, name } => Ok(Arc::new(Factory::new(
                ctx.container().clone(),
                ctx.scope().clone(),
                contract.clone(),
                name.clone(),
            ))),
            Plan::Lazy { contract, name } => Ok(Arc::new(LazyInstance::new(Factory::new(
                ctx.container().clone(),
                ctx.scope().clone(),
                contract.clone(),
                name.clone(),
            )))),
            Plan::Missing(contract) => Err(DiError::NotFound(contract.to_string())),
        }
    }
}

impl ConstructStep {
    fn execute(&self, ctx: &ResolveContext<'_>) -> DiResult<Instance> {
        let mut args = Vec::with_capacity(self.params.len());
        for param in &self.params {
            args.push(param.execute(ctx)?);
        }
        let mut instance = (self.construct)(Invocation {
            closed_type: self.closed_type.clone(),
            args,
        })?;
        for member in &self.members {
            match member.plan.execute(ctx) {
                Ok(value) => instance = (member.inject)(instance, value)?,
                Err(DiError::NotFound(_)) if member.optional => {}
                Err(e) => return Err(e),
            }
        }
        if let Some(track) = &self.track {
            if let Some(disposable) = track(&instance) {
                ctx.scope().track(disposable)?;
            }
        }
        Ok(instance)
    }
}

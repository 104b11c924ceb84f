//! Targets: abstract resolution strategies.
//!
//! A target declares what it can produce and how, without committing to a
//! specific requested type. The compiler turns a `(target, requested type)`
//! pair into an executable plan. Targets are immutable once constructed and
//! shared as `Arc<Target>`; the cycle stack identifies them by reference.

use std::collections::HashMap;
use std::sync::Arc;

use crate::compiler::Plan;
use crate::error::DiResult;
use crate::provider::ResolveContext;
use crate::types::{map_type, Instance, TypeGraph, TypeRef};

/// Factory backing a delegate target.
pub type DelegateFn = Arc<dyn Fn(&ResolveContext<'_>) -> DiResult<Instance> + Send + Sync>;

/// Whether instances produced by a target participate in scope tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracking {
    /// Track in the active scope when the type descriptor is disposable.
    Tracked,
    /// Never track, even for disposable types.
    Disabled,
}

/// Resolution strategy variants.
pub(crate) enum TargetKind {
    /// A pre-built instance.
    Constant {
        /// The shared instance returned for every resolution.
        value: Instance,
    },
    /// Constructor binding against a closed concrete type.
    Constructor {
        /// Explicit per-parameter overrides, by parameter name.
        named_args: HashMap<String, Arc<Target>>,
    },
    /// Constructor binding against an open generic definition, closed per
    /// request through the generic mapper.
    GenericConstructor {
        /// Explicit per-parameter overrides, by parameter name.
        named_args: HashMap<String, Arc<Target>>,
    },
    /// Caches the inner target's instance once per closed requested type for
    /// the container's lifetime.
    Singleton {
        /// The wrapped strategy.
        inner: Arc<Target>,
    },
    /// Caches the inner target's instance once per top-level scope tree.
    Scoped {
        /// The wrapped strategy.
        inner: Arc<Target>,
    },
    /// A user factory invoked against the live resolve context.
    Delegate {
        /// The factory.
        factory: DelegateFn,
    },
    /// Resolves another contract at call time, optionally falling back.
    Deferred {
        /// The contract resolved when the plan executes.
        contract: TypeRef,
        /// Produced when the contract has no registration at call time.
        fallback: Option<Arc<Target>>,
    },
    /// An already-compiled plan, used for context-local synthetic
    /// registrations such as a decorator's undecorated self-reference.
    Compiled {
        /// The prebuilt plan.
        plan: Arc<Plan>,
    },
}

/// An abstract resolution strategy with its declared type and tracking hint.
pub struct Target {
    declared: TypeRef,
    kind: TargetKind,
    tracking: Tracking,
}

impl Target {
    /// A constant-value provider. Constants are never scope-tracked; their
    /// lifetime belongs to whoever created them.
    pub fn constant(declared: TypeRef, value: Instance) -> Target {
        Target {
            declared,
            kind: TargetKind::Constant { value },
            tracking: Tracking::Disabled,
        }
    }

    /// A bound-constructor provider for a closed concrete type.
    pub fn constructor(declared: TypeRef) -> Target {
        debug_assert!(declared.is_closed());
        Target {
            declared,
            kind: TargetKind::Constructor {
                named_args: HashMap::new(),
            },
            tracking: Tracking::Tracked,
        }
    }

    /// An open-generic constructor provider. `declared` must stay open.
    pub fn generic_constructor(declared: TypeRef) -> Target {
        debug_assert!(!declared.is_closed());
        Target {
            declared,
            kind: TargetKind::GenericConstructor {
                named_args: HashMap::new(),
            },
            tracking: Tracking::Tracked,
        }
    }

    /// Wraps a target so its product is cached once per closed requested
    /// type for the container's lifetime.
    pub fn singleton(inner: Target) -> Target {
        let declared = inner.declared.clone();
        Target {
            declared,
            kind: TargetKind::Singleton {
                inner: Arc::new(inner),
            },
            tracking: Tracking::Tracked,
        }
    }

    /// Wraps a target so its product is cached once per top-level scope tree.
    pub fn scoped(inner: Target) -> Target {
        let declared = inner.declared.clone();
        Target {
            declared,
            kind: TargetKind::Scoped {
                inner: Arc::new(inner),
            },
            tracking: Tracking::Tracked,
        }
    }

    /// A delegate-backed provider.
    pub fn delegate<F>(declared: TypeRef, factory: F) -> Target
    where
        F: Fn(&ResolveContext<'_>) -> DiResult<Instance> + Send + Sync + 'static,
    {
        Target {
            declared,
            kind: TargetKind::Delegate {
                factory: Arc::new(factory),
            },
            tracking: Tracking::Disabled,
        }
    }

    /// A deferred provider resolving `contract` at call time.
    pub fn deferred(contract: TypeRef, fallback: Option<Target>) -> Target {
        Target {
            declared: contract.clone(),
            kind: TargetKind::Deferred {
                contract,
                fallback: fallback.map(Arc::new),
            },
            tracking: Tracking::Disabled,
        }
    }

    pub(crate) fn compiled(declared: TypeRef, plan: Arc<Plan>) -> Target {
        Target {
            declared,
            kind: TargetKind::Compiled { plan },
            tracking: Tracking::Disabled,
        }
    }

    /// Adds an explicit named-argument override for constructor binding.
    pub fn with_named_arg(mut self, name: &str, target: Target) -> Target {
        match &mut self.kind {
            TargetKind::Constructor { named_args }
            | TargetKind::GenericConstructor { named_args } => {
                named_args.insert(name.to_string(), Arc::new(target));
            }
            _ => {}
        }
        self
    }

    /// Disables scope tracking for instances produced by this target.
    pub fn untracked(mut self) -> Target {
        self.tracking = Tracking::Disabled;
        self
    }

    /// The type this target declares it produces. Open for generic providers.
    pub fn declared(&self) -> &TypeRef {
        &self.declared
    }

    pub(crate) fn kind(&self) -> &TargetKind {
        &self.kind
    }

    pub(crate) fn tracking(&self) -> Tracking {
        self.tracking
    }

    /// Structural compatibility of this target with a contract.
    ///
    /// Optimistic for open generic providers: a structurally matching request
    /// may still fail to close every type parameter when actually bound, in
    /// which case the failure surfaces at compile time instead.
    pub fn supports_type(&self, graph: &TypeGraph, contract: &TypeRef) -> bool {
        match &self.kind {
            TargetKind::GenericConstructor { .. } => match self.declared.def() {
                Some(def) => map_type(graph, def, contract).success,
                None => false,
            },
            TargetKind::Singleton { inner } | TargetKind::Scoped { inner } => {
                inner.supports_type(graph, contract)
            }
            _ => {
                self.declared == *contract
                    || (self.declared.is_closed() && graph.is_assignable(&self.declared, contract))
            }
        }
    }
}

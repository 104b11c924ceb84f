//! The registration surface: a mutable collection of targets built into an
//! immutable container.

use std::sync::Arc;

use crate::config::ContainerOptions;
use crate::error::{DiError, DiResult};
use crate::provider::{Container, ResolveContext};
use crate::registry::{Registry, RegistryLayer};
use crate::target::{Target, TargetKind};
use crate::types::{Instance, TypeGraph, TypeRef};

/// Accumulates registrations against a type graph, validating as it goes,
/// and builds an immutable [`Container`]. Problems are collected rather than
/// failing fast; [`build`](TargetCollection::build) reports all of them at
/// once.
pub struct TargetCollection {
    graph: TypeGraph,
    registry: Registry,
    options: ContainerOptions,
    parent: Option<Container>,
    problems: Vec<String>,
}

impl TargetCollection {
    pub fn new(graph: TypeGraph) -> TargetCollection {
        TargetCollection {
            graph,
            registry: Registry::new(),
            options: ContainerOptions::new(),
            parent: None,
            problems: Vec::new(),
        }
    }

    /// A collection layered over an existing container. Registrations here
    /// shadow the parent's for the same contract; everything else falls
    /// through. The child starts from a copy of the parent's type graph and
    /// may extend it.
    pub fn child_of(parent: &Container) -> TargetCollection {
        TargetCollection {
            graph: parent.graph().clone(),
            registry: Registry::new(),
            options: ContainerOptions::new(),
            parent: Some(parent.clone()),
            problems: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: ContainerOptions) -> TargetCollection {
        self.options = options;
        self
    }

    /// The type graph, for defining and describing further types.
    pub fn graph_mut(&mut self) -> &mut TypeGraph {
        &mut self.graph
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// Registers `target` for `contract`. The most recent registration for a
    /// contract becomes its default.
    pub fn register(&mut self, contract: TypeRef, target: Target) -> &mut Self {
        self.register_internal(contract, None, target);
        self
    }

    /// Registers under a hierarchical name. Requests walk the name from most
    /// to least specific dotted prefix before falling back to the unnamed
    /// default.
    pub fn register_named(&mut self, contract: TypeRef, name: &str, target: Target) -> &mut Self {
        self.register_internal(contract, Some(Arc::from(name)), target);
        self
    }

    /// Registers a concrete type against its own contract, constructed per
    /// resolution.
    pub fn register_type(&mut self, concrete: TypeRef) -> &mut Self {
        let target = self.constructor_for(&concrete);
        self.register(concrete, target)
    }

    /// Registers a concrete type against a contract it satisfies.
    pub fn register_impl(&mut self, contract: TypeRef, concrete: TypeRef) -> &mut Self {
        let target = self.constructor_for(&concrete);
        self.register(contract, target)
    }

    /// Registers a pre-built instance.
    pub fn register_object(&mut self, contract: TypeRef, value: Instance) -> &mut Self {
        let declared = contract.clone();
        self.register(contract, Target::constant(declared, value))
    }

    /// Registers a concrete type cached once per closed contract for the
    /// container's lifetime.
    pub fn register_singleton(&mut self, contract: TypeRef, concrete: TypeRef) -> &mut Self {
        let target = Target::singleton(self.constructor_for(&concrete));
        self.register(contract, target)
    }

    /// Registers a concrete type cached once per top-level scope tree.
    pub fn register_scoped(&mut self, contract: TypeRef, concrete: TypeRef) -> &mut Self {
        let target = Target::scoped(self.constructor_for(&concrete));
        self.register(contract, target)
    }

    /// Registers a factory closure invoked against the live resolve context.
    pub fn register_delegate<F>(&mut self, contract: TypeRef, factory: F) -> &mut Self
    where
        F: Fn(&ResolveContext<'_>) -> DiResult<Instance> + Send + Sync + 'static,
    {
        let declared = contract.clone();
        self.register(contract, Target::delegate(declared, factory))
    }

    /// Registers a deferred lookup: resolving `contract` re-enters the
    /// container at call time under the original request name, producing
    /// `fallback` when nothing is registered by then.
    pub fn register_deferred(
        &mut self,
        contract: TypeRef,
        deferred_to: TypeRef,
        fallback: Option<Target>,
    ) -> &mut Self {
        self.register(contract, Target::deferred(deferred_to, fallback))
    }

    /// Registers several targets for one contract in order; the last becomes
    /// the default and all participate in collection composition.
    pub fn register_multiple(
        &mut self,
        contract: TypeRef,
        targets: impl IntoIterator<Item = Target>,
    ) -> &mut Self {
        for target in targets {
            self.register_internal(contract.clone(), None, target);
        }
        self
    }

    /// Registers a decorator for `contract`. Decorators wrap every resolution
    /// of the contract, most recently registered outermost. A decorator
    /// registered for a closed generic type replaces, for that exact request
    /// only, any decorators registered for the open definition.
    pub fn register_decorator(&mut self, contract: TypeRef, decorator: Target) -> &mut Self {
        if !decorator.supports_type(&self.graph, &contract) {
            self.problems.push(format!(
                "decorator {} cannot satisfy {}",
                decorator.declared(),
                contract
            ));
        }
        self.validate_constructible(&decorator);
        self.registry.register_decorator(contract, Arc::new(decorator));
        self
    }

    /// Builds the immutable container, reporting every accumulated problem
    /// at once on failure.
    pub fn build(self) -> DiResult<Container> {
        if !self.problems.is_empty() {
            return Err(DiError::Configuration(self.problems));
        }
        let registry = self.registry;
        let layer = match &self.parent {
            Some(parent) => RegistryLayer::over(registry, parent.layer().clone()),
            None => RegistryLayer::root(registry),
        };
        Ok(Container::build(
            Arc::new(self.graph),
            self.options,
            layer,
            self.parent,
        ))
    }

    fn constructor_for(&mut self, concrete: &TypeRef) -> Target {
        if concrete.is_closed() {
            Target::constructor(concrete.clone())
        } else {
            Target::generic_constructor(concrete.clone())
        }
    }

    fn register_internal(&mut self, contract: TypeRef, name: Option<Arc<str>>, target: Target) {
        if !target.supports_type(&self.graph, &contract) {
            self.problems.push(format!(
                "registration for {} declares incompatible type {}",
                contract,
                target.declared()
            ));
        }
        self.validate_constructible(&target);
        self.registry.register(contract, name, Arc::new(target));
    }

    /// Constructor-backed targets need a described type with at least one
    /// constructor; catching that here surfaces all such mistakes in one
    /// build error instead of at first resolution.
    fn validate_constructible(&mut self, target: &Target) {
        let kind = target.kind();
        let constructed = match kind {
            TargetKind::Constructor { .. } | TargetKind::GenericConstructor { .. } => {
                target.declared()
            }
            TargetKind::Singleton { inner } | TargetKind::Scoped { inner } => {
                match inner.kind() {
                    TargetKind::Constructor { .. } | TargetKind::GenericConstructor { .. } => {
                        inner.declared()
                    }
                    _ => return,
                }
            }
            _ => return,
        };
        let def = match constructed.def() {
            Some(def) => def,
            None => return,
        };
        match self.graph.descriptor(def) {
            None => self
                .problems
                .push(format!("no descriptor for constructed type {}", constructed)),
            Some(descriptor) if descriptor.constructors().is_empty() => self
                .problems
                .push(format!("no constructor described for {}", constructed)),
            Some(_) => {}
        }
    }
}

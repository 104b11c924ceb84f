//! Type descriptor graph.
//!
//! The graph is populated while registrations are being collected and frozen
//! into an `Arc` when the container is built. All structural questions the
//! resolution engine asks (base chains, implemented interfaces, variance,
//! constructors, members, disposability) are answered from here.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dispose::Dispose;
use crate::error::{DiError, DiResult};
use crate::types::{Instance, TypeDef, TypeRef};

/// Variance of a generic parameter, consulted when matching collection
/// elements and comparer-style contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variance {
    /// Arguments must match exactly.
    Invariant,
    /// An argument may be substituted by one of its subtypes.
    Covariant,
    /// An argument may be substituted by one of its supertypes.
    Contravariant,
}

/// Arguments handed to a constructor function when a plan executes.
///
/// `closed_type` is the fully substituted type being constructed, so generic
/// constructors can observe which closure they were invoked for.
pub struct Invocation {
    /// The closed type being constructed.
    pub closed_type: TypeRef,
    /// Bound argument instances, one per declared parameter.
    pub args: Vec<Instance>,
}

/// Factory invoked with bound constructor arguments.
pub type ConstructFn = Arc<dyn Fn(Invocation) -> DiResult<Instance> + Send + Sync>;

/// Member injector: receives the constructed instance and the resolved member
/// value, returns the instance with the member applied.
pub type InjectFn = Arc<dyn Fn(Instance, Instance) -> DiResult<Instance> + Send + Sync>;

/// Adapter turning a type-erased instance into its disposable view, if any.
pub type TrackFn = Arc<dyn Fn(&Instance) -> Option<Arc<dyn Dispose>> + Send + Sync>;

/// One declared constructor parameter.
#[derive(Clone)]
pub struct ParameterDescriptor {
    /// Parameter name, matched against explicit named-argument overrides.
    pub name: String,
    /// Contract resolved for this parameter. May mention the declaring
    /// definition's generic parameters.
    pub contract: TypeRef,
    /// Default value; presence marks the parameter optional.
    pub default: Option<Instance>,
}

impl ParameterDescriptor {
    /// A parameter that must be supplied or resolved.
    pub fn required(name: &str, contract: TypeRef) -> ParameterDescriptor {
        ParameterDescriptor {
            name: name.to_string(),
            contract,
            default: None,
        }
    }

    /// A parameter falling back to `default` when no registration matches.
    pub fn optional(name: &str, contract: TypeRef, default: Instance) -> ParameterDescriptor {
        ParameterDescriptor {
            name: name.to_string(),
            contract,
            default: Some(default),
        }
    }
}

/// One declared constructor.
#[derive(Clone)]
pub struct ConstructorDescriptor {
    /// Declared parameters in order.
    pub params: Vec<ParameterDescriptor>,
    /// Factory invoked once every parameter is bound.
    pub construct: ConstructFn,
}

/// One injectable member, produced by the registration-time descriptor
/// visitor in place of attribute scanning.
#[derive(Clone)]
pub struct MemberDescriptor {
    /// Member name, for diagnostics.
    pub name: String,
    /// Contract resolved for the member.
    pub contract: TypeRef,
    /// Whether an unresolved contract is tolerated for this member.
    pub optional: bool,
    /// Applies the resolved value to the constructed instance.
    pub inject: InjectFn,
}

/// Everything the container knows about one type definition.
#[derive(Clone)]
pub struct TypeDescriptor {
    def: TypeDef,
    base: Option<TypeRef>,
    interfaces: Vec<TypeRef>,
    variance: Vec<Variance>,
    constructors: Vec<ConstructorDescriptor>,
    members: Vec<MemberDescriptor>,
    tracker: Option<TrackFn>,
}

impl TypeDescriptor {
    fn new(def: TypeDef) -> Self {
        let arity = def.arity();
        TypeDescriptor {
            def,
            base: None,
            interfaces: Vec::new(),
            variance: vec![Variance::Invariant; arity],
            constructors: Vec::new(),
            members: Vec::new(),
            tracker: None,
        }
    }

    /// The described definition.
    pub fn def(&self) -> &TypeDef {
        &self.def
    }

    /// The declared base type, in this definition's own parameters.
    pub fn base(&self) -> Option<&TypeRef> {
        self.base.as_ref()
    }

    /// Declared interfaces, in declaration order.
    pub fn interfaces(&self) -> &[TypeRef] {
        &self.interfaces
    }

    /// Variance of each generic parameter.
    pub fn variance(&self) -> &[Variance] {
        &self.variance
    }

    /// Declared constructors.
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    /// Declared injectable members.
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    pub(crate) fn tracker(&self) -> Option<&TrackFn> {
        self.tracker.as_ref()
    }
}

/// Well-known shape definitions pre-seeded into every graph.
#[derive(Clone)]
pub struct Builtins {
    /// `Array<T>`, covariant element.
    pub array: TypeDef,
    /// `List<T>`, covariant element.
    pub list: TypeDef,
    /// `Enumerable<T>`, covariant element.
    pub enumerable: TypeDef,
    /// `Func<T>`: deferred per-call resolution of `T`.
    pub func: TypeDef,
    /// `Lazy<T>`: memoized first resolution of `T`.
    pub lazy: TypeDef,
}

/// Registration-time descriptor registry.
///
/// # Examples
///
/// ```
/// use crucible_di::{TypeGraph, TypeRef, Variance};
///
/// let mut graph = TypeGraph::new();
/// let reader = graph.define("Reader", 1);
/// let file_reader = graph.define("FileReader", 1);
/// graph
///     .describe(&file_reader)
///     .implements(reader.close(vec![TypeRef::Param(0)]))
///     .finish();
///
/// let byte = graph.define("Byte", 0);
/// assert!(graph.is_assignable(
///     &file_reader.close(vec![byte.plain()]),
///     &reader.close(vec![byte.plain()]),
/// ));
/// ```
#[derive(Clone)]
pub struct TypeGraph {
    defs: HashMap<TypeDef, TypeDescriptor>,
    builtins: Builtins,
}

impl TypeGraph {
    /// Creates a graph seeded with the built-in shape definitions.
    pub fn new() -> Self {
        let array = TypeDef::new("Array", 1);
        let list = TypeDef::new("List", 1);
        let enumerable = TypeDef::new("Enumerable", 1);
        let func = TypeDef::new("Func", 1);
        let lazy = TypeDef::new("Lazy", 1);

        let mut defs = HashMap::new();
        for shape in [&array, &list, &enumerable] {
            let mut d = TypeDescriptor::new(shape.clone());
            d.variance = vec![Variance::Covariant];
            defs.insert(shape.clone(), d);
        }
        for shape in [&func, &lazy] {
            defs.insert(shape.clone(), TypeDescriptor::new(shape.clone()));
        }

        TypeGraph {
            defs,
            builtins: Builtins {
                array,
                list,
                enumerable,
                func,
                lazy,
            },
        }
    }

    /// The built-in shape definitions.
    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// Defines (or re-interns) a type definition with the given arity.
    pub fn define(&mut self, name: &str, arity: usize) -> TypeDef {
        let def = TypeDef::new(name, arity);
        self.defs
            .entry(def.clone())
            .or_insert_with(|| TypeDescriptor::new(def.clone()));
        def
    }

    /// Starts describing a definition's structure.
    pub fn describe(&mut self, def: &TypeDef) -> DescriptorBuilder<'_> {
        self.defs
            .entry(def.clone())
            .or_insert_with(|| TypeDescriptor::new(def.clone()));
        DescriptorBuilder {
            graph: self,
            def: def.clone(),
        }
    }

    /// Looks up the descriptor for a definition.
    pub fn descriptor(&self, def: &TypeDef) -> Option<&TypeDescriptor> {
        self.defs.get(def)
    }

    pub(crate) fn descriptor_required(&self, def: &TypeDef) -> DiResult<&TypeDescriptor> {
        self.defs
            .get(def)
            .ok_or_else(|| DiError::UnknownDefinition(def.name().to_string()))
    }

    /// Every occurrence of another definition in `def`'s hierarchy, expressed
    /// in `def`'s own parameters: the definition itself, then its base chain,
    /// then implemented interfaces (transitively, in declaration order).
    ///
    /// The walk order is fixed; the first occurrence of a wanted definition
    /// wins during generic mapping.
    pub(crate) fn hierarchy(&self, def: &TypeDef) -> Vec<TypeRef> {
        let mut out = vec![def.open()];
        let mut interface_seeds: Vec<TypeRef> = Vec::new();

        // Base chain first. Substitute each level's arguments into the next
        // level's declarations so every occurrence stays in `def`'s params.
        // A revisited definition means the base declarations form a cycle;
        // the walk stops there instead of looping.
        let mut walked: Vec<TypeDef> = Vec::new();
        let mut current = def.open();
        loop {
            let (cur_def, cur_args) = match &current {
                TypeRef::Named { def, args } => (def.clone(), args.clone()),
                TypeRef::Param(_) => break,
            };
            walked.push(cur_def.clone());
            let desc = match self.defs.get(&cur_def) {
                Some(d) => d,
                None => break,
            };
            let subst: Vec<Option<TypeRef>> = cur_args.into_iter().map(Some).collect();
            for iface in &desc.interfaces {
                interface_seeds.push(iface.substitute(&subst));
            }
            match &desc.base {
                Some(base) => {
                    let occurrence = base.substitute(&subst);
                    if let TypeRef::Named { def, .. } = &occurrence {
                        if walked.contains(def) {
                            break;
                        }
                    }
                    out.push(occurrence.clone());
                    current = occurrence;
                }
                None => break,
            }
        }

        // Then interfaces, depth-first in declaration order.
        let mut queue = interface_seeds;
        let mut i = 0;
        while i < queue.len() {
            let occurrence = queue[i].clone();
            i += 1;
            if out.contains(&occurrence) {
                continue;
            }
            out.push(occurrence.clone());
            if let TypeRef::Named { def, args } = &occurrence {
                if let Some(desc) = self.defs.get(def) {
                    let subst: Vec<Option<TypeRef>> =
                        args.iter().cloned().map(Some).collect();
                    for (offset, nested) in desc.interfaces.iter().enumerate() {
                        queue.insert(i + offset, nested.substitute(&subst));
                    }
                }
            }
        }

        out
    }

    /// Structural, variance-aware assignability between two closed types.
    ///
    /// `from` is assignable to `to` when `to`'s definition occurs in `from`'s
    /// hierarchy and the corresponding arguments are compatible under `to`'s
    /// declared parameter variance.
    pub fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        if from == to {
            return true;
        }
        let (from_def, from_args) = match from {
            TypeRef::Named { def, args } => (def, args),
            TypeRef::Param(_) => return false,
        };
        let to_def = match to.def() {
            Some(d) => d,
            None => return false,
        };

        let variance: Vec<Variance> = self
            .defs
            .get(to_def)
            .map(|d| d.variance.clone())
            .unwrap_or_else(|| vec![Variance::Invariant; to_def.arity()]);

        let subst: Vec<Option<TypeRef>> = from_args.iter().cloned().map(Some).collect();
        for occurrence in self.hierarchy(from_def) {
            if occurrence.def() != Some(to_def) {
                continue;
            }
            let closed = occurrence.substitute(&subst);
            if self.args_compatible(closed.args(), to.args(), &variance) {
                return true;
            }
        }
        false
    }

    fn args_compatible(&self, from: &[TypeRef], to: &[TypeRef], variance: &[Variance]) -> bool {
        if from.len() != to.len() {
            return false;
        }
        from.iter().zip(to).enumerate().all(|(i, (f, t))| {
            match variance.get(i).copied().unwrap_or(Variance::Invariant) {
                Variance::Invariant => f == t,
                Variance::Covariant => self.is_assignable(f, t),
                Variance::Contravariant => self.is_assignable(t, f),
            }
        })
    }
}

impl Default for TypeGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent builder for a definition's descriptor.
pub struct DescriptorBuilder<'a> {
    graph: &'a mut TypeGraph,
    def: TypeDef,
}

impl<'a> DescriptorBuilder<'a> {
    fn entry(&mut self) -> &mut TypeDescriptor {
        self.graph
            .defs
            .get_mut(&self.def)
            .expect("descriptor inserted by describe()")
    }

    /// Declares the base type, in this definition's own parameters.
    pub fn base(mut self, base: TypeRef) -> Self {
        self.entry().base = Some(base);
        self
    }

    /// Declares an implemented interface, in this definition's own parameters.
    pub fn implements(mut self, interface: TypeRef) -> Self {
        self.entry().interfaces.push(interface);
        self
    }

    /// Sets the variance of one generic parameter.
    pub fn variance(mut self, param: usize, variance: Variance) -> Self {
        self.entry().variance[param] = variance;
        self
    }

    /// Declares a constructor from parameter descriptors and a factory.
    pub fn constructor<F>(mut self, params: Vec<ParameterDescriptor>, construct: F) -> Self
    where
        F: Fn(Invocation) -> DiResult<Instance> + Send + Sync + 'static,
    {
        self.entry().constructors.push(ConstructorDescriptor {
            params,
            construct: Arc::new(construct),
        });
        self
    }

    /// Declares an injectable member.
    pub fn member<F>(mut self, name: &str, contract: TypeRef, optional: bool, inject: F) -> Self
    where
        F: Fn(Instance, Instance) -> DiResult<Instance> + Send + Sync + 'static,
    {
        self.entry().members.push(MemberDescriptor {
            name: name.to_string(),
            contract,
            optional,
            inject: Arc::new(inject),
        });
        self
    }

    /// Marks instances of this definition as scope-tracked disposables.
    ///
    /// `T` is the concrete Rust type produced by this definition's
    /// constructors; instances failing the downcast are left untracked.
    pub fn tracked<T>(mut self) -> Self
    where
        T: Dispose + Send + Sync + 'static,
    {
        self.entry().tracker = Some(Arc::new(|instance: &Instance| {
            instance
                .clone()
                .downcast::<T>()
                .ok()
                .map(|arc| arc as Arc<dyn Dispose>)
        }));
        self
    }

    /// Ends the description.
    pub fn finish(self) {}
}

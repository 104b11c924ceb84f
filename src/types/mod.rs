//! Registration-time type model.
//!
//! Everything the container knows about a type is data supplied at
//! registration time: definitions, generic arguments, base chains and
//! implemented interfaces live in a [`TypeGraph`] instead of being queried
//! through reflection. Resolution operates on [`TypeRef`] values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};

pub mod graph;
pub mod mapper;

pub use graph::{
    Builtins, ConstructFn, ConstructorDescriptor, DescriptorBuilder, InjectFn, Invocation,
    MemberDescriptor, ParameterDescriptor, TrackFn, TypeDescriptor, TypeGraph, Variance,
};
pub use mapper::{map_type, GenericMapping};

/// Type-erased, thread-safe instance produced by a target.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Downcasts a resolved [`Instance`] to a concrete Rust type.
///
/// # Examples
///
/// ```
/// use crucible_di::{downcast, Instance};
/// use std::sync::Arc;
///
/// let value: Instance = Arc::new(42usize);
/// let n = downcast::<usize>(&value).unwrap();
/// assert_eq!(*n, 42);
/// ```
pub fn downcast<T: Send + Sync + 'static>(instance: &Instance) -> DiResult<Arc<T>> {
    instance
        .clone()
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
}

struct DefData {
    name: Arc<str>,
    arity: usize,
}

/// Interned handle for a type definition (a name plus generic arity).
///
/// Two handles are equal when their names are equal, so a definition can be
/// re-created from its name without threading the original handle around.
///
/// # Examples
///
/// ```
/// use crucible_di::TypeRef;
/// use crucible_di::TypeGraph;
///
/// let mut graph = TypeGraph::new();
/// let boxed = graph.define("Box", 1);
/// let int = graph.define("Int", 0);
/// let closed = boxed.close(vec![int.plain()]);
/// assert_eq!(closed.to_string(), "Box<Int>");
/// assert!(closed.is_closed());
/// assert!(!boxed.open().is_closed());
/// ```
#[derive(Clone)]
pub struct TypeDef(Arc<DefData>);

impl TypeDef {
    pub(crate) fn new(name: &str, arity: usize) -> Self {
        TypeDef(Arc::new(DefData {
            name: Arc::from(name),
            arity,
        }))
    }

    /// The definition's name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Number of generic parameters.
    pub fn arity(&self) -> usize {
        self.0.arity
    }

    /// Reference to this definition with zero arguments.
    ///
    /// Only meaningful for non-generic definitions.
    pub fn plain(&self) -> TypeRef {
        TypeRef::Named {
            def: self.clone(),
            args: Vec::new(),
        }
    }

    /// The open reference `Def<P0, P1, ...>` with its own parameters as
    /// arguments. This is the declared type of an open generic provider and
    /// is never closed (invariant: an open target's declared type stays open).
    pub fn open(&self) -> TypeRef {
        TypeRef::Named {
            def: self.clone(),
            args: (0..self.0.arity).map(TypeRef::Param).collect(),
        }
    }

    /// Closes this definition over the given arguments.
    pub fn close(&self, args: Vec<TypeRef>) -> TypeRef {
        debug_assert_eq!(args.len(), self.0.arity);
        TypeRef::Named {
            def: self.clone(),
            args,
        }
    }
}

impl PartialEq for TypeDef {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for TypeDef {}

impl std::hash::Hash for TypeDef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDef({}/{})", self.0.name, self.0.arity)
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Reference to a type: either a generic parameter placeholder of the
/// declaring definition, or a (possibly generic) named type.
///
/// A reference is *closed* when no parameter placeholder occurs anywhere in
/// it, and *open* otherwise. Contracts requested from the container must be
/// closed; declared types of open generic providers are open.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypeRef {
    /// Placeholder for the declaring definition's N-th generic parameter.
    Param(usize),
    /// A named type applied to zero or more arguments.
    Named {
        /// The definition being referenced.
        def: TypeDef,
        /// Generic arguments, possibly containing further parameters.
        args: Vec<TypeRef>,
    },
}

impl TypeRef {
    /// True when no generic parameter placeholder occurs at any depth.
    pub fn is_closed(&self) -> bool {
        match self {
            TypeRef::Param(_) => false,
            TypeRef::Named { args, .. } => args.iter().all(TypeRef::is_closed),
        }
    }

    /// The referenced definition, if this is a named reference.
    pub fn def(&self) -> Option<&TypeDef> {
        match self {
            TypeRef::Param(_) => None,
            TypeRef::Named { def, .. } => Some(def),
        }
    }

    /// Generic arguments of a named reference (empty for parameters).
    pub fn args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Param(_) => &[],
            TypeRef::Named { args, .. } => args,
        }
    }

    /// Replaces every `Param(i)` with `substitution[i]`.
    ///
    /// Parameters without a binding are left in place, so the result of a
    /// partial substitution stays open.
    pub fn substitute(&self, substitution: &[Option<TypeRef>]) -> TypeRef {
        match self {
            TypeRef::Param(i) => match substitution.get(*i).and_then(|b| b.as_ref()) {
                Some(bound) => bound.clone(),
                None => TypeRef::Param(*i),
            },
            TypeRef::Named { def, args } => TypeRef::Named {
                def: def.clone(),
                args: args.iter().map(|a| a.substitute(substitution)).collect(),
            },
        }
    }

}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Param(i) => write!(f, "${}", i),
            TypeRef::Named { def, args } => {
                f.write_str(def.name())?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        fmt::Display::fmt(a, f)?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
        }
    }
}

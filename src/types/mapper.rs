//! Open generic mapping.
//!
//! Maps an open generic provider definition onto a requested (usually closed)
//! contract by walking the provider's base chain and interface list for an
//! occurrence of the requested definition, then unifying the occurrence's
//! argument slots against the request. Handles parameter reordering across
//! inheritance and parameters nested arbitrarily deep inside other generics.

use crate::types::{TypeDef, TypeGraph, TypeRef};

/// Result of mapping a provider definition onto a requested type.
///
/// Mapping is optimistic: `success` answers structural compatibility, while
/// `fully_bound` answers whether every provider parameter was determined.
/// Support checks use `success` alone; actual binding requires both (two-phase
/// contract — a provider may support a family of requests and still fail to
/// close for a particular member of it).
#[derive(Debug, Clone)]
pub struct GenericMapping {
    /// Whether the requested definition occurs in the provider's hierarchy
    /// and unification was consistent.
    pub success: bool,
    /// Whether every provider parameter received a binding and the request
    /// was closed.
    pub fully_bound: bool,
    /// The provider's closed type for this request, when fully bound.
    pub closing_type: Option<TypeRef>,
    /// Per-parameter bindings, indexed by the provider's parameter position.
    pub bindings: Vec<Option<TypeRef>>,
}

impl GenericMapping {
    fn failure(arity: usize) -> Self {
        GenericMapping {
            success: false,
            fully_bound: false,
            closing_type: None,
            bindings: vec![None; arity],
        }
    }
}

/// Maps the open generic `provider` definition onto `requested`.
///
/// The walk order is fixed: the provider itself, its base chain, then its
/// interfaces in declaration order. The first occurrence of the requested
/// definition wins; later occurrences in unrelated hierarchy branches are
/// never consulted.
///
/// # Examples
///
/// ```
/// use crucible_di::{map_type, TypeGraph, TypeRef};
///
/// let mut graph = TypeGraph::new();
/// let ibox = graph.define("IBox", 1);
/// let boxed = graph.define("Box", 1);
/// graph
///     .describe(&boxed)
///     .implements(ibox.close(vec![TypeRef::Param(0)]))
///     .finish();
///
/// let int = graph.define("Int", 0);
/// let mapping = map_type(&graph, &boxed, &ibox.close(vec![int.plain()]));
/// assert!(mapping.success && mapping.fully_bound);
/// assert_eq!(
///     mapping.closing_type.unwrap().to_string(),
///     "Box<Int>"
/// );
/// ```
pub fn map_type(graph: &TypeGraph, provider: &TypeDef, requested: &TypeRef) -> GenericMapping {
    let requested_def = match requested.def() {
        Some(d) => d,
        None => return GenericMapping::failure(provider.arity()),
    };

    for occurrence in graph.hierarchy(provider) {
        if occurrence.def() != Some(requested_def) {
            continue;
        }
        let mut bindings = vec![None; provider.arity()];
        if !unify_args(occurrence.args(), requested.args(), &mut bindings) {
            // First occurrence decides; an inconsistent unification is a
            // structural mismatch, not a cue to keep searching.
            return GenericMapping::failure(provider.arity());
        }
        let fully_bound = requested.is_closed() && bindings.iter().all(Option::is_some);
        let closing_type = if fully_bound {
            Some(provider.open().substitute(&bindings))
        } else {
            None
        };
        return GenericMapping {
            success: true,
            fully_bound,
            closing_type,
            bindings,
        };
    }

    GenericMapping::failure(provider.arity())
}

/// Unifies a pattern (in the provider's parameters) against a requested
/// reference, recursing through nested generic argument lists.
fn unify(pattern: &TypeRef, requested: &TypeRef, bindings: &mut [Option<TypeRef>]) -> bool {
    match pattern {
        TypeRef::Param(i) => match &bindings[*i] {
            Some(existing) => existing == requested,
            None => {
                bindings[*i] = Some(requested.clone());
                true
            }
        },
        TypeRef::Named { def, args } => match requested {
            TypeRef::Named {
                def: r_def,
                args: r_args,
            } => def == r_def && unify_args(args, r_args, bindings),
            TypeRef::Param(_) => false,
        },
    }
}

fn unify_args(pattern: &[TypeRef], requested: &[TypeRef], bindings: &mut [Option<TypeRef>]) -> bool {
    pattern.len() == requested.len()
        && pattern
            .iter()
            .zip(requested)
            .all(|(p, r)| unify(p, r, bindings))
}

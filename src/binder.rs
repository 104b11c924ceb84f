//! Constructor selection and parameter binding.
//!
//! A type may declare several constructors; the binder scores each one
//! against the current registrations and any per-target named argument
//! overrides, then binds the winner's parameters to a concrete source.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::registry::RegistryLayer;
use crate::target::Target;
use crate::types::graph::{ConstructFn, TypeDescriptor};
use crate::types::{TypeGraph, TypeRef};

/// Where a bound parameter's value will come from at plan execution time.
pub(crate) enum ParamSource {
    /// A named argument override attached to the target.
    Override(Arc<Target>),
    /// A registration exists for the parameter contract.
    Registry,
    /// No registration; the declared default value fills in.
    Default,
    /// No registration and no default. Resolution is deferred so a child
    /// container layered over this one can still supply it; reaching it at
    /// execution time without one is an error.
    Unresolved,
}

pub(crate) struct BoundParam {
    pub(crate) name: String,
    pub(crate) contract: TypeRef,
    pub(crate) default: Option<crate::types::Instance>,
    pub(crate) source: ParamSource,
}

pub(crate) struct BoundConstructor {
    pub(crate) construct: ConstructFn,
    pub(crate) params: Vec<BoundParam>,
}

impl std::fmt::Debug for ParamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamSource::Override(_) => f.write_str("Override"),
            ParamSource::Registry => f.write_str("Registry"),
            ParamSource::Default => f.write_str("Default"),
            ParamSource::Unresolved => f.write_str("Unresolved"),
        }
    }
}

impl std::fmt::Debug for BoundParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundParam")
            .field("name", &self.name)
            .field("contract", &self.contract)
            .field("default", &self.default.is_some())
            .field("source", &self.source)
            .finish()
    }
}

impl std::fmt::Debug for BoundConstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundConstructor")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Score tuple, compared lexicographically. Greedier constructors win:
/// most parameters, then fewest declared-optional parameters, then the
/// strongest resolvability (override 3, registry 2, assumed 1), then the
/// most named-argument matches. Ties keep declaration order.
///
/// Optional parameters count against a constructor whether or not their
/// default actually fills in; a registry-resolvable optional still marks
/// the constructor as the looser fit among same-arity candidates.
fn score(params: &[BoundParam]) -> (usize, i64, u64, usize) {
    let mut optional = 0i64;
    let mut strength = 0u64;
    let mut named = 0usize;
    for p in params {
        if p.default.is_some() {
            optional += 1;
        }
        match p.source {
            ParamSource::Override(_) => {
                strength += 3;
                named += 1;
            }
            ParamSource::Registry => strength += 2,
            ParamSource::Default => strength += 1,
            ParamSource::Unresolved => strength += 1,
        }
    }
    (params.len(), -optional, strength, named)
}

fn bind_params(
    layer: &RegistryLayer,
    params: &[crate::types::graph::ParameterDescriptor],
    bindings: &[Option<TypeRef>],
    named_args: &HashMap<String, Arc<Target>>,
) -> Vec<BoundParam> {
    let mut out = Vec::with_capacity(params.len());
    for param in params {
        let contract = if bindings.is_empty() {
            param.contract.clone()
        } else {
            param.contract.substitute(bindings)
        };
        let source = if let Some(over) = named_args.get(&param.name) {
            ParamSource::Override(over.clone())
        } else if layer.contains(&contract) {
            ParamSource::Registry
        } else if param.default.is_some() {
            ParamSource::Default
        } else {
            ParamSource::Unresolved
        };
        out.push(BoundParam {
            name: param.name.clone(),
            contract,
            default: param.default.clone(),
            source,
        });
    }
    out
}

/// Picks and binds the best constructor for a described type.
///
/// `bindings` carries the type-argument substitution produced by generic
/// mapping; it is empty for non-generic types.
pub(crate) fn bind_best(
    _graph: &TypeGraph,
    layer: &RegistryLayer,
    descriptor: &TypeDescriptor,
    bindings: &[Option<TypeRef>],
    named_args: &HashMap<String, Arc<Target>>,
) -> DiResult<BoundConstructor> {
    let ctors = descriptor.constructors();
    if ctors.is_empty() {
        return Err(DiError::NoConstructor(descriptor.def().name().to_string()));
    }

    let mut best: Option<(BoundConstructor, (usize, i64, u64, usize))> = None;
    for ctor in ctors {
        let params = bind_params(layer, &ctor.params, bindings, named_args);
        let candidate_score = score(&params);
        let bound = BoundConstructor {
            construct: ctor.construct.clone(),
            params,
        };
        match &best {
            Some((_, held)) if *held >= candidate_score => {}
            _ => best = Some((bound, candidate_score)),
        }
    }
    // ctors is non-empty, so a winner always exists.
    Ok(best.map(|(b, _)| b).unwrap())
}

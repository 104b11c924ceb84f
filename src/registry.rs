//! Target registry and layered lookup.
//!
//! Contracts map to ordered lists of targets. The default entry is the most
//! recently registered; multiple resolution consults the full ordered list.
//! Layers form an immutable parent chain: a child layer shadows (never
//! merges, never mutates) parent entries for the same key.

use std::collections::HashMap;
use std::sync::Arc;

use crate::target::Target;
use crate::types::{TypeDef, TypeGraph, TypeRef};

/// Hierarchical name delimiter. Lookup by `a.b.c` falls back to `a.b`, then
/// `a`, then the unnamed default.
pub const NAME_DELIMITER: char = '.';

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum ContractKey {
    /// Closed contract registered as-is.
    Exact(TypeRef),
    /// Open generic contract, keyed by its definition.
    Open(TypeDef),
}

impl ContractKey {
    fn for_registration(contract: &TypeRef) -> ContractKey {
        if contract.is_closed() {
            ContractKey::Exact(contract.clone())
        } else {
            match contract.def() {
                Some(def) => ContractKey::Open(def.clone()),
                None => ContractKey::Exact(contract.clone()),
            }
        }
    }
}

struct RegEntry {
    target: Arc<Target>,
    seq: u64,
}

/// A single registry level.
#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<(ContractKey, Option<Arc<str>>), Vec<RegEntry>>,
    decorators_exact: HashMap<TypeRef, Vec<Arc<Target>>>,
    decorators_open: HashMap<TypeDef, Vec<Arc<Target>>>,
    next_seq: u64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry::default()
    }

    pub(crate) fn register(
        &mut self,
        contract: TypeRef,
        name: Option<Arc<str>>,
        target: Arc<Target>,
    ) {
        let key = (ContractKey::for_registration(&contract), name);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries
            .entry(key)
            .or_default()
            .push(RegEntry { target, seq });
    }

    pub(crate) fn register_decorator(&mut self, contract: TypeRef, decorator: Arc<Target>) {
        if contract.is_closed() {
            self.decorators_exact
                .entry(contract)
                .or_default()
                .push(decorator);
        } else if let Some(def) = contract.def() {
            self.decorators_open
                .entry(def.clone())
                .or_default()
                .push(decorator);
        }
    }

    fn bucket(&self, contract: &TypeRef, name: &Option<Arc<str>>) -> Option<&Vec<RegEntry>> {
        if let Some(found) = self
            .entries
            .get(&(ContractKey::Exact(contract.clone()), name.clone()))
        {
            return Some(found);
        }
        // Closed generic requests fall back to an open registration for the
        // same definition.
        if !contract.args().is_empty() {
            if let Some(def) = contract.def() {
                return self
                    .entries
                    .get(&(ContractKey::Open(def.clone()), name.clone()));
            }
        }
        None
    }

    fn has_key(&self, contract: &TypeRef, name: &Option<Arc<str>>) -> bool {
        self.bucket(contract, name).is_some()
    }

    /// Every registration compatible with a collection element contract, with
    /// its global registration sequence for cross-key ordering.
    fn compatible_entries(
        &self,
        graph: &TypeGraph,
        element: &TypeRef,
    ) -> Vec<(Arc<Target>, u64)> {
        let mut out = Vec::new();
        for ((key, name), entries) in &self.entries {
            if name.is_some() {
                continue;
            }
            let matches = match key {
                ContractKey::Exact(contract) => {
                    contract == element || graph.is_assignable(contract, element)
                }
                ContractKey::Open(def) => Some(def) == element.def(),
            };
            if !matches {
                continue;
            }
            for entry in entries {
                if entry.target.supports_type(graph, element) {
                    out.push((entry.target.clone(), entry.seq));
                }
            }
        }
        out
    }
}

/// An immutable chain of registry levels.
///
/// The compiler pushes a fresh local level for context-local bindings (for
/// example a decorator's synthetic self-reference); child containers layer a
/// whole registry over their parent's.
pub(crate) struct RegistryLayer {
    local: Registry,
    parent: Option<Arc<RegistryLayer>>,
}

impl RegistryLayer {
    pub(crate) fn root(local: Registry) -> Arc<RegistryLayer> {
        Arc::new(RegistryLayer {
            local,
            parent: None,
        })
    }

    pub(crate) fn over(local: Registry, parent: Arc<RegistryLayer>) -> Arc<RegistryLayer> {
        Arc::new(RegistryLayer {
            local,
            parent: Some(parent),
        })
    }

    /// Name fallback ladder: the full requested name, then progressively
    /// shorter dotted prefixes, then the unnamed default. An exact name match
    /// anywhere in the layer chain beats a prefix match.
    fn name_ladder(name: Option<&str>) -> Vec<Option<Arc<str>>> {
        let mut ladder: Vec<Option<Arc<str>>> = Vec::new();
        if let Some(full) = name {
            let mut current = full;
            loop {
                ladder.push(Some(Arc::from(current)));
                match current.rfind(NAME_DELIMITER) {
                    Some(idx) => current = &current[..idx],
                    None => break,
                }
            }
        }
        ladder.push(None);
        ladder
    }

    fn bucket_shadowed(
        &self,
        contract: &TypeRef,
        name: &Option<Arc<str>>,
    ) -> Option<&Vec<RegEntry>> {
        let mut layer = self;
        loop {
            if let Some(found) = layer.local.bucket(contract, name) {
                return Some(found);
            }
            match &layer.parent {
                Some(parent) => layer = parent,
                None => return None,
            }
        }
    }

    /// All targets for a contract in registration order, honoring shadowing;
    /// the last entry is the contract's default. Lookup walks the name
    /// ladder, so an exact name match anywhere in the layer chain beats a
    /// prefix match.
    pub(crate) fn fetch_all(&self, contract: &TypeRef, name: Option<&str>) -> Vec<Arc<Target>> {
        for candidate in Self::name_ladder(name) {
            if let Some(entries) = self.bucket_shadowed(contract, &candidate) {
                return entries.iter().map(|e| e.target.clone()).collect();
            }
        }
        Vec::new()
    }

    /// True when any layer holds a registration for the contract.
    pub(crate) fn contains(&self, contract: &TypeRef) -> bool {
        let mut layer = self;
        loop {
            if layer.local.has_key(contract, &None) {
                return true;
            }
            match &layer.parent {
                Some(parent) => layer = parent,
                None => return false,
            }
        }
    }

    /// Unnamed registrations compatible with a collection element contract,
    /// in global registration order. Layers closest to the request come
    /// first; a layer never re-reports entries shadowed by a nearer one.
    pub(crate) fn compatible_for_element(
        &self,
        graph: &TypeGraph,
        element: &TypeRef,
    ) -> Vec<Arc<Target>> {
        let mut layers = Vec::new();
        let mut layer = self;
        loop {
            layers.push(layer);
            match &layer.parent {
                Some(parent) => layer = parent,
                None => break,
            }
        }
        // Outermost (oldest) registrations first, preserving per-layer
        // registration order.
        let mut out = Vec::new();
        for layer in layers.iter().rev() {
            let mut found = layer.local.compatible_entries(graph, element);
            found.sort_by_key(|(_, seq)| *seq);
            out.extend(found.into_iter().map(|(t, _)| t));
        }
        out
    }

    /// Decorators applying to a requested contract, in registration order.
    /// An exact closed-type decorator set replaces the generic set for that
    /// precise request only; structurally related supertype requests keep the
    /// generic decorators.
    pub(crate) fn decorators_for(&self, requested: &TypeRef) -> Vec<Arc<Target>> {
        let mut layer = self;
        loop {
            if let Some(exact) = layer.local.decorators_exact.get(requested) {
                return exact.clone();
            }
            if let Some(def) = requested.def() {
                if !requested.args().is_empty() {
                    if let Some(open) = layer.local.decorators_open.get(def) {
                        return open.clone();
                    }
                }
            }
            match &layer.parent {
                Some(parent) => layer = parent,
                None => return Vec::new(),
            }
        }
    }
}

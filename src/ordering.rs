//! Dependency-aware ordering, independent of the container.
//!
//! Sorts an arbitrary set of items so that every item comes after the items
//! it depends on, preserving input order among unconstrained items. Useful
//! for startup/shutdown sequencing of components registered with the
//! container, but has no dependency on it.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use crate::error::{DiError, DiResult};

/// How strictly an edge binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyEdge {
    /// The dependency must be present in the input set.
    Required,
    /// The edge is honored when the dependency is present and ignored
    /// otherwise.
    Optional,
}

/// Sorts `items` topologically: every item appears after everything it
/// depends on. The sort is stable; items not ordered relative to each other
/// keep their input order.
///
/// `key` identifies an item; `dependencies` lists the keys it depends on.
/// A [`DependencyEdge::Required`] edge to an absent key fails with
/// [`DiError::MissingDependency`]; a dependency cycle fails with
/// [`DiError::Circular`] naming the keys still unordered.
pub fn sort_by_dependencies<T, K>(
    items: Vec<T>,
    key: impl Fn(&T) -> K,
    dependencies: impl Fn(&T) -> Vec<(K, DependencyEdge)>,
) -> DiResult<Vec<T>>
where
    K: Eq + Hash + Display,
{
    let n = items.len();
    let mut index_of: HashMap<K, usize> = HashMap::with_capacity(n);
    for (i, item) in items.iter().enumerate() {
        // Later duplicates shadow earlier ones as dependency providers.
        index_of.insert(key(item), i);
    }

    // dependents[d] lists items that must come after item d.
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indegree: Vec<usize> = vec![0; n];
    for (i, item) in items.iter().enumerate() {
        for (dep, edge) in dependencies(item) {
            match index_of.get(&dep) {
                Some(&d) => {
                    if d != i {
                        dependents[d].push(i);
                        indegree[i] += 1;
                    }
                }
                None => {
                    if edge == DependencyEdge::Required {
                        return Err(DiError::MissingDependency(dep.to_string()));
                    }
                }
            }
        }
    }

    // Kahn's algorithm, always taking the lowest ready input index so the
    // result is stable.
    let mut ready: std::collections::BinaryHeap<std::cmp::Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &deg)| deg == 0)
        .map(|(i, _)| std::cmp::Reverse(i))
        .collect();
    let mut order = Vec::with_capacity(n);
    while let Some(std::cmp::Reverse(i)) = ready.pop() {
        order.push(i);
        for &dependent in &dependents[i] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.push(std::cmp::Reverse(dependent));
            }
        }
    }

    if order.len() != n {
        let stuck: Vec<String> = items
            .iter()
            .enumerate()
            .filter(|(i, _)| indegree[*i] > 0)
            .map(|(_, item)| key(item).to_string())
            .collect();
        return Err(DiError::Circular(stuck));
    }

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .map(|i| slots[i].take().unwrap())
        .collect())
}

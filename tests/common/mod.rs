//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use crucible_di::{DiResult, Instance, Invocation};

/// Wraps a typed constructor closure into the type-erased form the graph
/// expects.
pub fn make<T, F>(f: F) -> impl Fn(Invocation) -> DiResult<Instance> + Send + Sync + 'static
where
    T: Send + Sync + 'static,
    F: Fn(Invocation) -> DiResult<T> + Send + Sync + 'static,
{
    move |inv| {
        let value = f(inv)?;
        let erased: Instance = Arc::new(value);
        Ok(erased)
    }
}

/// A constructor for types built without dependencies.
pub fn value<T, F>(f: F) -> impl Fn(Invocation) -> DiResult<Instance> + Send + Sync + 'static
where
    T: Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    make(move |_| Ok(f()))
}

//! Keyed get-or-create cache with exactly-once initialization.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

/// Map of lazily initialized values, one `OnceCell` per key.
///
/// The producing closure runs to completion exactly once per key even when
/// multiple threads race on the same key; every caller observes the value the
/// winning closure produced. The map lock is never held while a closure runs,
/// so initializers may themselves consult the map under different keys.
pub(crate) struct OnceMap<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> OnceMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn new() -> Self {
        OnceMap {
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, initializing it with `init` on
    /// first access. A failing initializer caches nothing; the next caller
    /// retries.
    pub(crate) fn get_or_try_init<E>(
        &self,
        key: &K,
        init: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let cell = {
            let mut map = self.cells.lock().unwrap();
            map.entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        cell.get_or_try_init(init).cloned()
    }

    /// The value for `key`, if already initialized.
    #[cfg(test)]
    pub(crate) fn get(&self, key: &K) -> Option<V> {
        let map = self.cells.lock().unwrap();
        map.get(key).and_then(|cell| cell.get().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn initializes_once_per_key() {
        let map: OnceMap<&'static str, usize> = OnceMap::new();
        let calls = AtomicUsize::new(0);
        let make = || -> Result<usize, ()> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        };
        assert_eq!(map.get_or_try_init(&"a", make).unwrap(), 7);
        assert_eq!(
            map.get_or_try_init(&"a", || -> Result<usize, ()> { panic!("must not run") })
                .unwrap(),
            7
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(map.get(&"b"), None);
    }

    #[test]
    fn failed_initializer_is_retried() {
        let map: OnceMap<u32, u32> = OnceMap::new();
        let first: Result<u32, &'static str> = map.get_or_try_init(&1, || Err("boom"));
        assert!(first.is_err());
        let second: Result<u32, &'static str> = map.get_or_try_init(&1, || Ok(9));
        assert_eq!(second.unwrap(), 9);
    }
}

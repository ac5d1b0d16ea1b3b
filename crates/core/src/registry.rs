//! Process-wide instance registry.
//!
//! Keeps at most one instance per key (one cache per database path, one pager
//! per database path and term). Lookups take the read lock; creation re-checks
//! under the write lock so concurrent callers never build two instances.

use std::collections::HashMap;
use std::convert::Infallible;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

/// Lazily populated map of shared instances.
pub struct Registry<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the instance for `key`, creating it with `init` if absent.
    ///
    /// `init` runs at most once per key while the entry exists; if it fails
    /// nothing is stored and the error is returned.
    pub fn get_or_try_init<E, F>(&self, key: &K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = entries.get(key) {
            return Ok(value.clone());
        }

        let value = init()?;
        entries.insert(key.clone(), value.clone());
        Ok(value)
    }

    /// Return the instance for `key`, creating it with `init` if absent.
    pub fn get_or_init(&self, key: &K, init: impl FnOnce() -> V) -> V {
        match self.get_or_try_init(key, || Ok::<_, Infallible>(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    /// Drop every entry matching `predicate`, returning how many were removed.
    pub fn remove_where(&self, mut predicate: impl FnMut(&K, &V) -> bool) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|key, value| !predicate(key, value));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for Registry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_init_runs_once_per_key() {
        let registry: Registry<String, Arc<u32>> = Registry::new();
        let calls = AtomicU32::new(0);

        let init = || -> Result<Arc<u32>, ()> {
            Ok(Arc::new(calls.fetch_add(1, Ordering::SeqCst)))
        };

        let a = registry.get_or_try_init(&"db".to_string(), init).unwrap();
        let b = registry
            .get_or_try_init(&"db".to_string(), || -> Result<Arc<u32>, ()> {
                panic!("already initialized")
            })
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_failed_init_stores_nothing() {
        let registry: Registry<u32, Arc<u32>> = Registry::new();

        let result = registry.get_or_try_init(&1, || Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(registry.is_empty());

        let value = registry
            .get_or_try_init(&1, || Ok::<_, &str>(Arc::new(7)))
            .unwrap();
        assert_eq!(*value, 7);
    }

    #[test]
    fn test_concurrent_init_builds_one_instance() {
        let registry = Arc::new(Registry::<u32, Arc<u32>>::new());
        let calls = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    registry
                        .get_or_try_init(&42, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, ()>(Arc::new(42))
                        })
                        .unwrap()
                })
            })
            .collect();

        let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    }

    #[test]
    fn test_remove_where() {
        let registry: Registry<(String, String), u32> = Registry::new();
        for (i, term) in ["mew", "pikachu"].iter().enumerate() {
            registry
                .get_or_try_init(&("a.db".to_string(), term.to_string()), || {
                    Ok::<_, ()>(i as u32)
                })
                .unwrap();
        }
        registry
            .get_or_try_init(&("b.db".to_string(), "mew".to_string()), || Ok::<_, ()>(9))
            .unwrap();

        assert_eq!(registry.remove_where(|(db, _), _| db == "a.db"), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.remove_where(|_, value| *value > 100), 0);
        assert_eq!(
            registry.remove(&("b.db".to_string(), "mew".to_string())),
            Some(9)
        );
        registry.clear();
        assert!(registry.is_empty());
    }
}

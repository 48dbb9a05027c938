use std::{
    fmt,
    hash::Hash,
    thread::{self, ThreadId},
};

use dashmap::{DashMap, DashSet};

use crate::{Error, Result};

/// A concurrent, memoized function from `K` to `V`.
///
/// Values are computed on first request for a key and cached for the lifetime of the map.
/// This is the identity-preserving cache behind every "one descriptor per identifier" rule of
/// the crate: the class cache of a [`crate::Module`], the not-found registry and the per-name
/// member caches of every scope.
///
/// # Thread Safety
///
/// The map never holds a shard lock while a computation runs. Two threads missing the same key
/// concurrently both compute, the first insertion wins, and both return the inserted value.
/// Re-entry for the same key on the same thread is detected per key and answered with the
/// fallback (if any).
pub struct MemoizedFn<K, V>
where
    K: Eq + Hash,
{
    cache: DashMap<K, V>,
    in_flight: DashSet<(K, ThreadId)>,
    fallback: Option<V>,
    name: &'static str,
}

impl<K, V> MemoizedFn<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    /// Creates an empty memoized function that fails on recursive evaluation.
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in recursion errors
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        MemoizedFn {
            cache: DashMap::new(),
            in_flight: DashSet::new(),
            fallback: None,
            name,
        }
    }

    /// Creates an empty memoized function whose re-entrant evaluations yield `fallback`.
    #[must_use]
    pub fn recursion_tolerant(name: &'static str, fallback: V) -> Self {
        MemoizedFn {
            cache: DashMap::new(),
            in_flight: DashSet::new(),
            fallback: Some(fallback),
            name,
        }
    }

    /// Returns the value for `key`, computing it with `compute` if it is not cached yet.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to look up
    /// * `compute` - Produces the value for `key`; may query other keys of this map
    ///
    /// # Errors
    ///
    /// Propagates errors of `compute` without caching them, and returns
    /// [`Error::RecursionDetected`] when `key` is re-entered on the same thread and no fallback
    /// exists.
    pub fn get_or_compute<F>(&self, key: &K, compute: F) -> Result<V>
    where
        F: FnOnce(&K) -> Result<V>,
    {
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached.value().clone());
        }

        let marker = (key.clone(), thread::current().id());
        if !self.in_flight.insert(marker.clone()) {
            return match &self.fallback {
                Some(fallback) => Ok(fallback.clone()),
                None => Err(Error::RecursionDetected(format!("{}({:?})", self.name, key))),
            };
        }

        let computed = {
            let _entry = InFlight {
                set: &self.in_flight,
                marker,
            };
            compute(key)
        };

        let value = computed?;
        let stored = self.cache.entry(key.clone()).or_insert(value);
        Ok(stored.value().clone())
    }

    /// Returns the cached value for `key` without computing anything.
    #[must_use]
    pub fn get_cached(&self, key: &K) -> Option<V> {
        self.cache.get(key).map(|entry| entry.value().clone())
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Snapshot of all cached values, in no particular order.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.cache.iter().map(|entry| entry.value().clone()).collect()
    }
}

/// Removes an in-flight marker when the evaluation ends, also while unwinding.
struct InFlight<'a, K: Eq + Hash> {
    set: &'a DashSet<(K, ThreadId)>,
    marker: (K, ThreadId),
}

impl<K: Eq + Hash> Drop for InFlight<'_, K> {
    fn drop(&mut self) {
        self.set.remove(&self.marker);
    }
}

impl<K, V> fmt::Debug for MemoizedFn<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizedFn")
            .field("name", &self.name)
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[test]
    fn test_memoizes_per_key() {
        let calls = AtomicUsize::new(0);
        let squares: MemoizedFn<u32, Arc<u32>> = MemoizedFn::new("squares");

        let first = squares
            .get_or_compute(&4, |k| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(k * k))
            })
            .unwrap();
        let second = squares
            .get_or_compute(&4, |_| panic!("must be cached"))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, 16);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(squares.len(), 1);
    }

    #[test]
    fn test_nested_keys_do_not_deadlock() {
        let fib: MemoizedFn<u64, u64> = MemoizedFn::new("fib");

        fn compute(fib: &MemoizedFn<u64, u64>, n: u64) -> Result<u64> {
            fib.get_or_compute(&n, |&n| {
                if n < 2 {
                    Ok(n)
                } else {
                    Ok(compute(fib, n - 1)? + compute(fib, n - 2)?)
                }
            })
        }

        assert_eq!(compute(&fib, 30).unwrap(), 832_040);
    }

    #[test]
    fn test_same_key_reentry_uses_fallback() {
        let names: MemoizedFn<&'static str, Vec<&'static str>> =
            MemoizedFn::recursion_tolerant("names", Vec::new());

        let result = names
            .get_or_compute(&"a", |key| {
                let nested = names.get_or_compute(key, |_| Ok(vec!["never"]))?;
                assert!(nested.is_empty());
                Ok(vec!["a.b"])
            })
            .unwrap();

        assert_eq!(result, vec!["a.b"]);
        assert_eq!(names.get_cached(&"a"), Some(vec!["a.b"]));
    }

    #[test]
    fn test_same_key_reentry_without_fallback() {
        let strict: MemoizedFn<u8, u8> = MemoizedFn::new("strict");

        let result = strict.get_or_compute(&1, |key| strict.get_or_compute(key, |_| Ok(0)));
        assert!(matches!(result, Err(Error::RecursionDetected(_))));
        assert!(strict.is_empty());
    }

    #[test]
    fn test_errors_are_retried() {
        let flaky: MemoizedFn<u8, u8> = MemoizedFn::new("flaky");

        assert!(flaky
            .get_or_compute(&1, |_| Err(malformed_error!("broken")))
            .is_err());
        assert_eq!(flaky.get_or_compute(&1, |_| Ok(5)).unwrap(), 5);
    }

    #[test]
    fn test_panicking_compute_is_retried() {
        let memo: MemoizedFn<u32, u32> = MemoizedFn::new("panicking");
        let tolerant: MemoizedFn<u32, u32> = MemoizedFn::recursion_tolerant("tolerant", 0);

        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            memo.get_or_compute(&1, |_| panic!("collaborator failed"))
        }));
        assert!(panicked.is_err());
        assert_eq!(memo.get_or_compute(&1, |_| Ok(5)).unwrap(), 5);

        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tolerant.get_or_compute(&1, |_| panic!("collaborator failed"))
        }));
        assert!(panicked.is_err());
        assert_eq!(tolerant.get_or_compute(&1, |_| Ok(7)).unwrap(), 7);
        assert_eq!(tolerant.get_cached(&1), Some(7));
    }

    #[test]
    fn test_concurrent_identity() {
        let cache: Arc<MemoizedFn<String, Arc<String>>> = Arc::new(MemoizedFn::new("identity"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache
                        .get_or_compute(&"key".to_string(), |k| Ok(Arc::new(k.clone())))
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}

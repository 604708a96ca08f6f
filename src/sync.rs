//! A registry that can be shared between threads.
//!
//! The mutex guards the lookup and the store separately and is released
//! while the callable runs, so callables may re-enter the registry. Two
//! threads missing on the same key may both compute it; the first stored
//! value wins and is returned to both.

use crate::registry::{cached_value, insert_first, Slot};
use crate::signature::{signature_name, Fallible, MultiArgFn};
use crate::stats::CacheStats;
use log::{debug, trace, warn};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

type Caches = HashMap<TypeId, Box<dyn Slot + Send>>;

#[derive(Default)]
pub struct SyncCacheRegistry {
    caches: Mutex<Caches>,
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

impl SyncCacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invoke<A, R, F>(&self, callable: F, arg: A) -> R
    where
        F: Fn(A) -> R,
        A: Eq + Hash + Clone + Send + 'static,
        R: Clone + Send + 'static,
    {
        self.memoize::<fn(A) -> R, A, R>(arg, |arg| callable(arg))
    }

    pub fn try_invoke<A, R, E, F>(&self, callable: F, arg: A) -> Result<R, E>
    where
        F: Fn(A) -> Result<R, E>,
        A: Eq + Hash + Clone + Send + 'static,
        R: Clone + Send + 'static,
        E: 'static,
    {
        self.try_memoize::<Fallible<fn(A) -> Result<R, E>>, A, R, E>(arg, |arg| callable(arg))
    }

    pub fn invoke_many<Args, F>(&self, callable: F, args: Args) -> F::Output
    where
        F: MultiArgFn<Args>,
        Args: Eq + Hash + Clone + Send + 'static,
        F::Output: Clone + Send + 'static,
    {
        self.memoize::<F::Signature, Args, F::Output>(args, |args| callable.call_with(args))
    }

    pub fn try_invoke_many<Args, R, E, F>(&self, callable: F, args: Args) -> Result<R, E>
    where
        F: MultiArgFn<Args, Output = Result<R, E>>,
        Args: Eq + Hash + Clone + Send + 'static,
        R: Clone + Send + 'static,
    {
        self.try_memoize::<Fallible<F::Signature>, Args, R, E>(args, |args| {
            callable.call_with(args)
        })
    }

    pub fn len(&self) -> usize {
        self.caches().values().map(|slot| slot.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn instance_count(&self) -> usize {
        self.caches().len()
    }

    pub fn instance_len<S: 'static>(&self) -> usize {
        self.caches()
            .get(&TypeId::of::<S>())
            .map_or(0, |slot| slot.len())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            purity_checks: 0,
        }
    }

    pub fn clear(&self) {
        let mut caches = self.caches();
        debug!("clearing {} cache instances", caches.len());
        caches.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }

    // callables never run under the lock, so a poisoned map is still consistent
    fn caches(&self) -> MutexGuard<'_, Caches> {
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup<S: 'static, K, V>(&self, key: &K) -> Option<V>
    where
        K: Eq + Hash + 'static,
        V: Clone + 'static,
    {
        self.caches()
            .get(&TypeId::of::<S>())
            .and_then(|slot| cached_value(&**slot, key))
    }

    fn store<S: 'static, K, V>(&self, key: K, value: V) -> V
    where
        K: Eq + Hash + Send + 'static,
        V: Clone + Send + 'static,
    {
        let mut caches = self.caches();
        let slot = caches.entry(TypeId::of::<S>()).or_insert_with(|| {
            debug!("new shared cache instance for `{}`", signature_name::<S>());
            let slot: Box<dyn Slot + Send> = Box::new(HashMap::<K, V>::new());
            slot
        });
        insert_first(&mut **slot, key, value, signature_name::<S>())
    }

    fn memoize<S: 'static, K, V>(&self, key: K, compute: impl FnOnce(K) -> V) -> V
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Clone + Send + 'static,
    {
        if let Some(value) = self.lookup::<S, K, V>(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!("cache hit for `{}`", signature_name::<S>());
            return value;
        }
        trace!("cache miss for `{}`", signature_name::<S>());
        let value = compute(key.clone());
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.store::<S, K, V>(key, value)
    }

    fn try_memoize<S: 'static, K, V, E>(
        &self,
        key: K,
        compute: impl FnOnce(K) -> Result<V, E>,
    ) -> Result<V, E>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Clone + Send + 'static,
    {
        if let Some(value) = self.lookup::<S, K, V>(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!("cache hit for `{}`", signature_name::<S>());
            return Ok(value);
        }
        trace!("cache miss for `{}`", signature_name::<S>());
        match compute(key.clone()) {
            Ok(value) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(self.store::<S, K, V>(key, value))
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!("`{}` failed, result not cached", signature_name::<S>());
                Err(err)
            }
        }
    }
}

impl fmt::Debug for SyncCacheRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SyncCacheRegistry")
            .field("instances", &self.instance_count())
            .field("entries", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rayon::prelude::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn parallel_callers_agree() {
        let registry = SyncCacheRegistry::new();
        let computations = AtomicUsize::new(0);
        let square = |n: u64| {
            computations.fetch_add(1, Ordering::Relaxed);
            n * n
        };
        let total: u64 = (0..1000u64)
            .into_par_iter()
            .map(|i| registry.invoke(square, i % 10))
            .sum();
        assert_eq!(total, 100 * (0..10u64).map(|n| n * n).sum::<u64>());
        assert_eq!(registry.len(), 10);
        assert!(computations.load(Ordering::Relaxed) >= 10);
        let stats = registry.stats();
        assert_eq!(stats.hits + stats.misses, 1000);
    }

    #[test]
    fn recursion_does_not_deadlock() {
        fn ways(registry: &SyncCacheRegistry, steps: u32) -> u64 {
            match steps {
                0 | 1 => 1,
                _ => {
                    registry.invoke(|k| ways(registry, k), steps - 1)
                        + registry.invoke(|k| ways(registry, k), steps - 2)
                }
            }
        }
        let registry = SyncCacheRegistry::new();
        assert_eq!(ways(&registry, 50), 20_365_011_074);
    }

    #[test]
    fn nested_store_of_same_key_wins() {
        fn nested(registry: &SyncCacheRegistry, depth: &AtomicUsize, n: u32) -> u32 {
            if depth.fetch_add(1, Ordering::SeqCst) == 0 {
                registry.invoke(|k| nested(registry, depth, k), n);
                2
            } else {
                1
            }
        }
        let registry = SyncCacheRegistry::new();
        let depth = AtomicUsize::new(0);
        let outer = registry.invoke(|k| nested(&registry, &depth, k), 7);
        assert_eq!(outer, 1);
        assert_eq!(registry.instance_len::<fn(u32) -> u32>(), 1);
        assert_eq!(registry.stats().misses, 2);
    }

    #[test]
    fn failures_are_retried() {
        let registry = SyncCacheRegistry::new();
        let attempts = AtomicUsize::new(0);
        let once_broken = |a: u8, b: u8| {
            if attempts.fetch_add(1, Ordering::Relaxed) == 0 {
                Err(())
            } else {
                Ok(a as u16 * b as u16)
            }
        };
        assert_eq!(registry.try_invoke_many(once_broken, (3, 4)), Err(()));
        assert_eq!(registry.try_invoke_many(once_broken, (3, 4)), Ok(12));
        assert_eq!(registry.try_invoke_many(once_broken, (3, 4)), Ok(12));
        assert_eq!(attempts.load(Ordering::Relaxed), 2);
        assert_eq!(registry.stats().failures, 1);
    }

    #[test]
    fn clear_empties_shared_registry() {
        let registry = SyncCacheRegistry::new();
        registry.invoke(|s: &'static str| s.len(), "abc");
        assert_eq!(registry.instance_len::<fn(&'static str) -> usize>(), 1);
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.stats(), CacheStats::default());
    }
}

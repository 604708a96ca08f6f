//! The single-threaded cache registry and its memoizing entry points.
//!
//! A [`CacheRegistry`] owns one cache instance per callable signature. The
//! signature is the function-pointer type of the callable, so two different
//! functions `fn(u32) -> u64` share an instance while `fn(u32) -> u32` gets
//! its own. Keys are the bare argument for unary callables and the argument
//! tuple for callables of arity two or more.
//!
//! Callers must only memoize pure functions: a hit never runs the callable,
//! so side effects are skipped and impure results are replayed as-is.

use crate::memoizer::Memoized;
use crate::purity::{PurityViolation, RegistryConfig};
use crate::signature::{signature_name, Fallible, MultiArgFn};
use crate::stats::CacheStats;
use log::{debug, trace, warn};
use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;

/// A type-erased cache instance.
pub(crate) trait Slot: Any {
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<K: 'static, V: 'static> Slot for HashMap<K, V> {
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) fn cached_value<K, V>(slot: &dyn Slot, key: &K) -> Option<V>
where
    K: Eq + Hash + 'static,
    V: Clone + 'static,
{
    slot.as_any()
        .downcast_ref::<HashMap<K, V>>()
        .and_then(|cache| cache.get(key))
        .cloned()
}

/// Stores `value` unless the key is already present; returns the stored value.
/// A slot holding another map type is left untouched and `value` is handed
/// back uncached.
pub(crate) fn insert_first<K, V>(slot: &mut dyn Slot, key: K, value: V, signature: &str) -> V
where
    K: Eq + Hash + 'static,
    V: Clone + 'static,
{
    match slot.as_any_mut().downcast_mut::<HashMap<K, V>>() {
        Some(cache) => cache.entry(key).or_insert(value).clone(),
        None => {
            warn!("cache instance for `{}` holds another map type, result not cached", signature);
            value
        }
    }
}

/// Owner of every cache instance, keyed by callable signature.
///
/// The registry is not `Sync`. Use
/// [`SyncCacheRegistry`](crate::sync::SyncCacheRegistry) to share caches
/// between threads.
pub struct CacheRegistry {
    caches: RefCell<HashMap<TypeId, Box<dyn Slot>>>,
    stats: Cell<CacheStats>,
    config: RegistryConfig,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        CacheRegistry {
            caches: RefCell::new(HashMap::new()),
            stats: Cell::new(CacheStats::default()),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Returns `callable(arg)`, computing it only on the first call with an
    /// equal `arg` for this signature.
    pub fn invoke<A, R, F>(&self, callable: F, arg: A) -> R
    where
        F: Fn(A) -> R,
        A: Eq + Hash + Clone + 'static,
        R: Clone + 'static,
    {
        self.memoize::<fn(A) -> R, A, R>(arg, |arg| callable(arg))
    }

    /// Like [`invoke`](Self::invoke) for a callable returning `Result`.
    /// Only `Ok` values are cached; an `Err` is handed back and the next call
    /// with the same argument runs the callable again.
    pub fn try_invoke<A, R, E, F>(&self, callable: F, arg: A) -> Result<R, E>
    where
        F: Fn(A) -> Result<R, E>,
        A: Eq + Hash + Clone + 'static,
        R: Clone + 'static,
        E: 'static,
    {
        self.try_memoize::<Fallible<fn(A) -> Result<R, E>>, A, R, E>(arg, |arg| callable(arg))
    }

    /// Returns `callable(a, b, ..)` for `args = (a, b, ..)`, keyed by the
    /// whole argument tuple.
    pub fn invoke_many<Args, F>(&self, callable: F, args: Args) -> F::Output
    where
        F: MultiArgFn<Args>,
        Args: Eq + Hash + Clone + 'static,
        F::Output: Clone + 'static,
    {
        self.invoke_many_by_ref(&callable, args)
    }

    pub(crate) fn invoke_many_by_ref<Args, F>(&self, callable: &F, args: Args) -> F::Output
    where
        F: MultiArgFn<Args>,
        Args: Eq + Hash + Clone + 'static,
        F::Output: Clone + 'static,
    {
        self.memoize::<F::Signature, Args, F::Output>(args, |args| callable.call_with(args))
    }

    /// Fallible counterpart of [`invoke_many`](Self::invoke_many).
    pub fn try_invoke_many<Args, R, E, F>(&self, callable: F, args: Args) -> Result<R, E>
    where
        F: MultiArgFn<Args, Output = Result<R, E>>,
        Args: Eq + Hash + Clone + 'static,
        R: Clone + 'static,
    {
        self.try_memoize::<Fallible<F::Signature>, Args, R, E>(args, |args| {
            callable.call_with(args)
        })
    }

    /// Like [`invoke`](Self::invoke), re-running the callable on hits selected
    /// by the configured [`PurityCheck`](crate::purity::PurityCheck).
    pub fn invoke_checked<A, R, F>(&self, callable: F, arg: A) -> Result<R, PurityViolation>
    where
        F: Fn(A) -> R,
        A: Eq + Hash + Clone + 'static,
        R: Clone + PartialEq + Debug + 'static,
    {
        self.memoize_checked::<fn(A) -> R, A, R>(arg, |arg| callable(arg))
    }

    pub fn invoke_many_checked<Args, F>(
        &self,
        callable: F,
        args: Args,
    ) -> Result<F::Output, PurityViolation>
    where
        F: MultiArgFn<Args>,
        Args: Eq + Hash + Clone + 'static,
        F::Output: Clone + PartialEq + Debug + 'static,
    {
        self.memoize_checked::<F::Signature, Args, F::Output>(args, |args| {
            callable.call_with(args)
        })
    }

    /// Binds a unary callable to this registry.
    pub fn bind<F>(&self, callable: F) -> Memoized<'_, F> {
        Memoized::new(self, callable)
    }

    /// Total number of stored entries across all instances.
    pub fn len(&self) -> usize {
        self.caches.borrow().values().map(|slot| slot.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn instance_count(&self) -> usize {
        self.caches.borrow().len()
    }

    /// Number of entries stored for signature `S`, e.g. `fn(u64) -> u64`.
    /// Instances filled by the `try_*` entry points are named
    /// `Fallible<fn(..) -> Result<R, E>>`.
    pub fn instance_len<S: 'static>(&self) -> usize {
        self.caches
            .borrow()
            .get(&TypeId::of::<S>())
            .map_or(0, |slot| slot.len())
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.get()
    }

    /// Drops every cache instance and resets the counters.
    pub fn clear(&self) {
        let mut caches = self.caches.borrow_mut();
        debug!("clearing {} cache instances", caches.len());
        caches.clear();
        self.stats.set(CacheStats::default());
    }

    fn record<T>(&self, update: impl FnOnce(&mut CacheStats) -> T) -> T {
        let mut stats = self.stats.get();
        let result = update(&mut stats);
        self.stats.set(stats);
        result
    }

    fn lookup<S: 'static, K, V>(&self, key: &K) -> Option<V>
    where
        K: Eq + Hash + 'static,
        V: Clone + 'static,
    {
        // the borrow ends here so the callable may re-enter the registry
        let caches = self.caches.borrow();
        caches
            .get(&TypeId::of::<S>())
            .and_then(|slot| cached_value(&**slot, key))
    }

    fn store<S: 'static, K, V>(&self, key: K, value: V) -> V
    where
        K: Eq + Hash + 'static,
        V: Clone + 'static,
    {
        let mut caches = self.caches.borrow_mut();
        let slot = caches.entry(TypeId::of::<S>()).or_insert_with(|| {
            debug!("new cache instance for `{}`", signature_name::<S>());
            let slot: Box<dyn Slot> = Box::new(HashMap::<K, V>::new());
            slot
        });
        insert_first(&mut **slot, key, value, signature_name::<S>())
    }

    fn compute_and_store<S: 'static, K, V>(&self, key: K, compute: impl FnOnce(K) -> V) -> V
    where
        K: Eq + Hash + Clone + 'static,
        V: Clone + 'static,
    {
        trace!("cache miss for `{}`", signature_name::<S>());
        let value = compute(key.clone());
        self.record(|stats| stats.misses += 1);
        self.store::<S, K, V>(key, value)
    }

    fn memoize<S: 'static, K, V>(&self, key: K, compute: impl FnOnce(K) -> V) -> V
    where
        K: Eq + Hash + Clone + 'static,
        V: Clone + 'static,
    {
        if let Some(value) = self.lookup::<S, K, V>(&key) {
            self.record(|stats| stats.hits += 1);
            trace!("cache hit for `{}`", signature_name::<S>());
            return value;
        }
        self.compute_and_store::<S, K, V>(key, compute)
    }

    fn try_memoize<S: 'static, K, V, E>(
        &self,
        key: K,
        compute: impl FnOnce(K) -> Result<V, E>,
    ) -> Result<V, E>
    where
        K: Eq + Hash + Clone + 'static,
        V: Clone + 'static,
    {
        if let Some(value) = self.lookup::<S, K, V>(&key) {
            self.record(|stats| stats.hits += 1);
            trace!("cache hit for `{}`", signature_name::<S>());
            return Ok(value);
        }
        trace!("cache miss for `{}`", signature_name::<S>());
        match compute(key.clone()) {
            Ok(value) => {
                self.record(|stats| stats.misses += 1);
                Ok(self.store::<S, K, V>(key, value))
            }
            Err(err) => {
                self.record(|stats| stats.failures += 1);
                warn!("`{}` failed, result not cached", signature_name::<S>());
                Err(err)
            }
        }
    }

    fn memoize_checked<S: 'static, K, V>(
        &self,
        key: K,
        compute: impl Fn(K) -> V,
    ) -> Result<V, PurityViolation>
    where
        K: Eq + Hash + Clone + 'static,
        V: Clone + PartialEq + Debug + 'static,
    {
        let Some(cached) = self.lookup::<S, K, V>(&key) else {
            return Ok(self.compute_and_store::<S, K, V>(key, compute));
        };
        let hits = self.record(|stats| {
            stats.hits += 1;
            stats.hits
        });
        if !self.config.purity_check.is_due(hits) {
            return Ok(cached);
        }
        self.record(|stats| stats.purity_checks += 1);
        let recomputed = compute(key);
        if recomputed == cached {
            trace!("purity check passed for `{}`", signature_name::<S>());
            return Ok(cached);
        }
        let violation = PurityViolation {
            signature: signature_name::<S>(),
            cached: format!("{:?}", cached),
            recomputed: format!("{:?}", recomputed),
        };
        warn!("{}", violation);
        Err(violation)
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("instances", &self.instance_count())
            .field("entries", &self.len())
            .field("stats", &self.stats())
            .field("config", &self.config)
            .finish()
    }
}

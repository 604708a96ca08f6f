use crate::registry::CacheRegistry;
use crate::signature::MultiArgFn;
use std::hash::Hash;

/// A callable bound to the registry that caches its results.
///
/// The cache instance still belongs to the registry and is shared with every
/// other callable of the same signature.
pub struct Memoized<'r, F> {
    registry: &'r CacheRegistry,
    compute: F,
}

impl<'r, F> Memoized<'r, F> {
    pub fn new(registry: &'r CacheRegistry, compute: F) -> Self {
        Self { registry, compute }
    }

    pub fn call<A, R>(&self, arg: A) -> R
    where
        F: Fn(A) -> R,
        A: Eq + Hash + Clone + 'static,
        R: Clone + 'static,
    {
        self.registry.invoke(&self.compute, arg)
    }

    pub fn call_many<Args>(&self, args: Args) -> F::Output
    where
        F: MultiArgFn<Args>,
        Args: Eq + Hash + Clone + 'static,
        F::Output: Clone + 'static,
    {
        self.registry.invoke_many_by_ref(&self.compute, args)
    }

    pub fn registry(&self) -> &'r CacheRegistry {
        self.registry
    }
}

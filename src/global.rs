//! A process-wide registry for callers that do not want to carry one around.
//!
//! Every cache instance lives until the process exits unless [`global`] is
//! cleared explicitly.

use crate::signature::MultiArgFn;
use crate::sync::SyncCacheRegistry;
use once_cell::sync::Lazy;
use std::hash::Hash;

static GLOBAL_REGISTRY: Lazy<SyncCacheRegistry> = Lazy::new(SyncCacheRegistry::new);

pub fn global() -> &'static SyncCacheRegistry {
    &GLOBAL_REGISTRY
}

/// Memoizes `callable(arg)` in the process-wide registry.
///
/// ```
/// use callcache::cached_function;
///
/// fn fib(n: u64) -> u64 {
///     if n < 2 {
///         return n;
///     }
///     cached_function(fib, n - 1) + cached_function(fib, n - 2)
/// }
///
/// assert_eq!(fib(80), 23_416_728_348_467_685);
/// ```
pub fn cached_function<A, R, F>(callable: F, arg: A) -> R
where
    F: Fn(A) -> R,
    A: Eq + Hash + Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    global().invoke(callable, arg)
}

/// Memoizes `callable(a, b, ..)` in the process-wide registry.
pub fn cached_function_many<Args, F>(callable: F, args: Args) -> F::Output
where
    F: MultiArgFn<Args>,
    Args: Eq + Hash + Clone + Send + 'static,
    F::Output: Clone + Send + 'static,
{
    global().invoke_many(callable, args)
}

//! Per-argument result caching for any pure function, without touching the
//! function itself.
//!
//! ```
//! use callcache::CacheRegistry;
//! use std::cell::Cell;
//!
//! let registry = CacheRegistry::new();
//! let calls = Cell::new(0);
//! let double = |n: i32| {
//!     calls.set(calls.get() + 1);
//!     n * 2
//! };
//! assert_eq!(registry.invoke(double, 5), 10);
//! assert_eq!(registry.invoke(double, 5), 10);
//! assert_eq!(calls.get(), 1);
//! assert_eq!(registry.invoke_many(|a: i32, b: i32| a + b, (3, 4)), 7);
//! ```

pub mod global;
pub mod memoizer;
pub mod purity;
pub mod registry;
pub mod signature;
pub mod stats;
pub mod sync;

pub use global::{cached_function, cached_function_many, global};
pub use memoizer::Memoized;
pub use purity::{PurityCheck, PurityViolation, RegistryConfig};
pub use registry::CacheRegistry;
pub use signature::{Fallible, MultiArgFn};
pub use stats::CacheStats;
pub use sync::SyncCacheRegistry;

/// Memoizes a call through a registry, picking the unary or the tuple-keyed
/// form by the number of arguments.
///
/// ```
/// use callcache::{memoized, CacheRegistry};
///
/// let registry = CacheRegistry::new();
/// assert_eq!(memoized!(registry, |n: u8| n + 1, 1), 2);
/// assert_eq!(memoized!(registry, |a: u8, b: u8| a * b, 3, 4), 12);
/// ```
#[macro_export]
macro_rules! memoized {
    ($registry:expr, $callable:expr, $arg:expr $(,)?) => {
        $registry.invoke($callable, $arg)
    };
    ($registry:expr, $callable:expr, $($args:expr),+ $(,)?) => {
        $registry.invoke_many($callable, ($($args),+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn macro_dispatches_by_arity() {
        let registry = CacheRegistry::new();
        let unary_calls = Cell::new(0);
        let ternary_calls = Cell::new(0);
        let halve = |n: u32| {
            unary_calls.set(unary_calls.get() + 1);
            n / 2
        };
        let clamp = |n: u32, lo: u32, hi: u32| {
            ternary_calls.set(ternary_calls.get() + 1);
            n.clamp(lo, hi)
        };
        assert_eq!(memoized!(registry, halve, 10), 5);
        assert_eq!(memoized!(registry, halve, 10,), 5);
        assert_eq!(memoized!(registry, clamp, 50, 0, 20), 20);
        assert_eq!(memoized!(registry, clamp, 50, 0, 20), 20);
        assert_eq!(unary_calls.get(), 1);
        assert_eq!(ternary_calls.get(), 1);
        assert_eq!(registry.instance_count(), 2);
    }

    #[test]
    fn macro_works_with_shared_registry() {
        let registry = SyncCacheRegistry::new();
        assert_eq!(memoized!(registry, |a: i8, b: i8| a - b, 1, 2), -1);
        assert_eq!(registry.instance_len::<fn(i8, i8) -> i8>(), 1);
    }
}

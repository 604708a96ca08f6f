use std::fmt;

/// Counters kept by a registry since its creation or last `clear`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Calls answered from a cache instance.
    pub hits: u64,
    /// Calls that ran the callable and stored its result.
    pub misses: u64,
    /// Calls whose callable returned an error, which was not stored.
    pub failures: u64,
    /// Hits that were re-verified by recomputation.
    pub purity_checks: u64,
}

impl CacheStats {
    /// Number of times a callable actually ran.
    pub fn computations(&self) -> u64 {
        self.misses + self.failures + self.purity_checks
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "hits: {}, misses: {}, failures: {}, purity checks: {}",
            self.hits, self.misses, self.failures, self.purity_checks
        )
    }
}

//! Optional detection of impure callables.
//!
//! Caching silently replays stale results when a callable is not a pure
//! function of its arguments. The checked entry points of
//! [`CacheRegistry`](crate::registry::CacheRegistry) can re-run the callable on
//! a fraction of cache hits and compare the fresh result to the stored one.

use std::num::NonZeroU64;
use thiserror::Error;

/// How often a cache hit is re-verified by the checked entry points.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PurityCheck {
    #[default]
    Off,
    /// Recompute on every n-th hit, counted across the whole registry.
    EveryNthHit(NonZeroU64),
}

impl PurityCheck {
    pub fn every(n: u64) -> Self {
        match NonZeroU64::new(n) {
            Some(n) => PurityCheck::EveryNthHit(n),
            None => PurityCheck::Off,
        }
    }

    /// Whether the hit with the given 1-based ordinal must be verified.
    pub(crate) fn is_due(&self, hit_ordinal: u64) -> bool {
        match self {
            PurityCheck::Off => false,
            PurityCheck::EveryNthHit(n) => hit_ordinal % n.get() == 0,
        }
    }
}

/// Registry settings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct RegistryConfig {
    pub purity_check: PurityCheck,
}

/// A recomputation disagreed with the cached result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("callable with signature `{signature}` is not pure: cached {cached}, recomputed {recomputed}")]
pub struct PurityViolation {
    pub signature: &'static str,
    pub cached: String,
    pub recomputed: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_zero_disables_checks() {
        assert_eq!(PurityCheck::every(0), PurityCheck::Off);
        assert!(!PurityCheck::every(0).is_due(1));
    }

    #[test]
    fn every_nth_hit_is_due() {
        let check = PurityCheck::every(3);
        let due: Vec<u64> = (1..=9).filter(|&i| check.is_due(i)).collect();
        assert_eq!(due, vec![3, 6, 9]);
    }

    #[test]
    fn violation_message() {
        let violation = PurityViolation {
            signature: "fn(u8) -> u8",
            cached: "1".to_string(),
            recomputed: "2".to_string(),
        };
        assert_eq!(
            violation.to_string(),
            "callable with signature `fn(u8) -> u8` is not pure: cached 1, recomputed 2"
        );
    }
}

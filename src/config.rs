//! Manager configuration.

use crate::error::BddError;

/// What happens to the operator caches after a garbage collection.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum CachePolicy {
    /// Drop every entry.
    #[default]
    Reset,
    /// Drop only entries that mention a reclaimed node.
    Clean,
}

/// Construction-time parameters of a [`Bdd`](crate::bdd::Bdd) manager.
///
/// ```
/// use bdd_engine::config::{BddConfig, CachePolicy};
///
/// let config = BddConfig::default()
///     .with_node_capacity(1 << 10)
///     .with_cache_bits(12)
///     .with_cache_policy(CachePolicy::Clean);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BddConfig {
    /// Initial number of node slots, terminals included.
    pub node_capacity: usize,
    /// Each operator cache holds `2^cache_bits` entries.
    pub cache_bits: usize,
    /// Largest number of slots added by a single growth step; `0` means no cap.
    pub max_increase: usize,
    /// Fraction of the current size added per growth step; `0.0` means doubling.
    pub increase_factor: f64,
    /// Grow after GC whenever fewer than this percentage of slots is free.
    pub min_free_percent: usize,
    /// Hard ceiling on node slots; `0` means unlimited.
    pub max_nodes: usize,
    /// Node slots per cache entry kept after growth; `0` keeps caches fixed.
    pub cache_ratio: usize,
    pub cache_policy: CachePolicy,
}

impl Default for BddConfig {
    fn default() -> Self {
        Self {
            node_capacity: 1 << 16,
            cache_bits: 14,
            max_increase: 10_000_000,
            increase_factor: 0.0,
            min_free_percent: 20,
            max_nodes: 0,
            cache_ratio: 0,
            cache_policy: CachePolicy::Reset,
        }
    }
}

impl BddConfig {
    pub fn with_node_capacity(mut self, node_capacity: usize) -> Self {
        self.node_capacity = node_capacity;
        self
    }

    pub fn with_cache_bits(mut self, cache_bits: usize) -> Self {
        self.cache_bits = cache_bits;
        self
    }

    pub fn with_max_increase(mut self, max_increase: usize) -> Self {
        self.max_increase = max_increase;
        self
    }

    pub fn with_increase_factor(mut self, increase_factor: f64) -> Self {
        self.increase_factor = increase_factor;
        self
    }

    pub fn with_min_free_percent(mut self, min_free_percent: usize) -> Self {
        self.min_free_percent = min_free_percent;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn with_cache_ratio(mut self, cache_ratio: usize) -> Self {
        self.cache_ratio = cache_ratio;
        self
    }

    pub fn with_cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }

    pub fn validate(&self) -> Result<(), BddError> {
        if self.node_capacity < 4 {
            return Err(BddError::InvalidConfig("node capacity must be at least 4"));
        }
        if self.node_capacity >= u32::MAX as usize {
            return Err(BddError::InvalidConfig("node capacity does not fit node ids"));
        }
        if self.cache_bits > 31 {
            return Err(BddError::InvalidConfig("cache bits must be in range 0..=31"));
        }
        if self.max_nodes != 0 && self.max_nodes < self.node_capacity {
            return Err(BddError::InvalidConfig("node limit is below the initial capacity"));
        }
        check_increase_factor(self.increase_factor)?;
        check_min_free(self.min_free_percent)?;
        Ok(())
    }
}

pub(crate) fn check_increase_factor(factor: f64) -> Result<(), BddError> {
    if factor.is_finite() && factor >= 0.0 {
        Ok(())
    } else {
        Err(BddError::InvalidConfig("increase factor must be finite and non-negative"))
    }
}

pub(crate) fn check_min_free(percent: usize) -> Result<(), BddError> {
    if percent <= 100 {
        Ok(())
    } else {
        Err(BddError::InvalidConfig("minimum free percentage must be in range 0..=100"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(BddConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(BddConfig::default().with_node_capacity(2).validate().is_err());
        assert!(BddConfig::default().with_cache_bits(40).validate().is_err());
        assert!(BddConfig::default().with_increase_factor(-0.5).validate().is_err());
        assert!(BddConfig::default().with_min_free_percent(101).validate().is_err());
        assert!(BddConfig::default()
            .with_node_capacity(1000)
            .with_max_nodes(10)
            .validate()
            .is_err());
    }
}

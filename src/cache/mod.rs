//! Operator caches (computed tables).
//!
//! Every operator family memoizes its results in a fixed-size
//! [`BasicCache`]. Operators sharing a cache add a tag to the key: the
//! Boolean connective for APPLY, the quantifier kind for quantification,
//! the substituted level for COMPOSE, and so on.
//!
//! Entries name nodes by id, so they go stale when a collection frees those
//! nodes or a reorder session rewrites them. After a GC the caches are
//! either reset or cleaned of entries that mention freed nodes, depending
//! on the [`CachePolicy`](crate::config::CachePolicy). After reordering
//! they are always reset.

mod basic;

pub use basic::BasicCache;

use crate::reference::Ref;

/// Tags distinguishing operators that share a cache.
pub(crate) mod tag {
    pub const EXIST: u32 = 0;
    pub const FORALL: u32 = 1;
    pub const UNIQUE: u32 = 2;
    pub const RESTRICT: u32 = 3;
    pub const CONSTRAIN: u32 = 4;
    pub const SIMPLIFY: u32 = 5;
    pub const REPLACE: u32 = 7;
    pub const VEC_COMPOSE: u32 = 8;
    pub const SAT_COUNT: u32 = 9;
    pub const PATH_COUNT: u32 = 10;
    /// `COMPOSE + level` keys a substitution at `level`.
    pub const COMPOSE: u32 = 16;
    /// Quantifier kinds for apply-and-quantify, combined with the connective.
    pub const APP_EXIST: u32 = 0 << 4;
    pub const APP_FORALL: u32 = 1 << 4;
    pub const APP_UNIQUE: u32 = 2 << 4;
}

/// Hit and miss counters summed over all operator caches.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub faults: usize,
}

pub(crate) struct OperatorCaches {
    pub not: BasicCache<Ref, Ref>,
    pub and: BasicCache<(Ref, Ref), Ref>,
    pub or: BasicCache<(Ref, Ref), Ref>,
    pub apply: BasicCache<(Ref, Ref, u32), Ref>,
    pub ite: BasicCache<(Ref, Ref, Ref), Ref>,
    pub quant: BasicCache<(Ref, Ref, u32), Ref>,
    pub app_quant: BasicCache<(Ref, Ref, Ref, u32), Ref>,
    pub replace: BasicCache<(Ref, u32, u32), Ref>,
    pub misc: BasicCache<(Ref, Ref, u32), Ref>,
    pub count: BasicCache<(Ref, u32), f64>,
}

impl OperatorCaches {
    pub fn new(bits: usize) -> Self {
        Self {
            not: BasicCache::new(bits),
            and: BasicCache::new(bits),
            or: BasicCache::new(bits),
            apply: BasicCache::new(bits),
            ite: BasicCache::new(bits),
            quant: BasicCache::new(bits),
            app_quant: BasicCache::new(bits),
            replace: BasicCache::new(bits),
            misc: BasicCache::new(bits),
            count: BasicCache::new(bits),
        }
    }

    pub fn bits(&self) -> usize {
        self.not.capacity().trailing_zeros() as usize
    }

    pub fn reset(&mut self) {
        self.not.clear();
        self.and.clear();
        self.or.clear();
        self.apply.clear();
        self.ite.clear();
        self.quant.clear();
        self.app_quant.clear();
        self.replace.clear();
        self.misc.clear();
        self.count.clear();
    }

    /// Drops entries mentioning any node for which `live` is false.
    pub fn clean(&mut self, live: impl Fn(Ref) -> bool) {
        self.not.retain(|&a, &r| live(a) && live(r));
        self.and.retain(|&(a, b), &r| live(a) && live(b) && live(r));
        self.or.retain(|&(a, b), &r| live(a) && live(b) && live(r));
        self.apply.retain(|&(a, b, _), &r| live(a) && live(b) && live(r));
        self.ite.retain(|&(a, b, c), &r| live(a) && live(b) && live(c) && live(r));
        self.quant.retain(|&(a, q, _), &r| live(a) && live(q) && live(r));
        self.app_quant
            .retain(|&(a, b, q, _), &r| live(a) && live(b) && live(q) && live(r));
        self.replace.retain(|&(a, _, _), &r| live(a) && live(r));
        self.misc.retain(|&(a, b, _), &r| live(a) && live(b) && live(r));
        self.count.retain(|&(a, _), _| live(a));
    }

    pub fn resize(&mut self, bits: usize) {
        self.not.resize(bits);
        self.and.resize(bits);
        self.or.resize(bits);
        self.apply.resize(bits);
        self.ite.resize(bits);
        self.quant.resize(bits);
        self.app_quant.resize(bits);
        self.replace.resize(bits);
        self.misc.resize(bits);
        self.count.resize(bits);
    }

    pub fn stats(&self) -> CacheStats {
        let all = [
            (self.not.hits(), self.not.misses(), self.not.faults()),
            (self.and.hits(), self.and.misses(), self.and.faults()),
            (self.or.hits(), self.or.misses(), self.or.faults()),
            (self.apply.hits(), self.apply.misses(), self.apply.faults()),
            (self.ite.hits(), self.ite.misses(), self.ite.faults()),
            (self.quant.hits(), self.quant.misses(), self.quant.faults()),
            (self.app_quant.hits(), self.app_quant.misses(), self.app_quant.faults()),
            (self.replace.hits(), self.replace.misses(), self.replace.faults()),
            (self.misc.hits(), self.misc.misses(), self.misc.faults()),
            (self.count.hits(), self.count.misses(), self.count.faults()),
        ];
        all.iter().fold(CacheStats::default(), |acc, &(hits, misses, faults)| CacheStats {
            hits: acc.hits + hits,
            misses: acc.misses + misses,
            faults: acc.faults + faults,
        })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_clean_drops_dead_entries() {
        let mut caches = OperatorCaches::new(6);
        caches.and.insert((Ref::new(2), Ref::new(3)), Ref::new(4));
        caches.and.insert((Ref::new(5), Ref::new(6)), Ref::new(7));
        caches.count.insert((Ref::new(5), tag::SAT_COUNT), 2.0);

        caches.clean(|r| r.id() != 5);

        assert_eq!(caches.and.get(&(Ref::new(2), Ref::new(3))), Some(Ref::new(4)));
        assert_eq!(caches.and.get(&(Ref::new(5), Ref::new(6))), None);
        assert_eq!(caches.count.get(&(Ref::new(5), tag::SAT_COUNT)), None);
    }

    #[test]
    fn test_reset_and_resize() {
        let mut caches = OperatorCaches::new(4);
        caches.not.insert(Ref::new(2), Ref::new(3));
        caches.reset();
        assert_eq!(caches.not.get(&Ref::new(2)), None);
        caches.resize(8);
        assert_eq!(caches.bits(), 8);
        assert_eq!(caches.stats().misses, 1);
    }

    #[test]
    fn test_shared_cache_tags_are_distinct() {
        let fixed = [
            tag::EXIST,
            tag::FORALL,
            tag::UNIQUE,
            tag::RESTRICT,
            tag::CONSTRAIN,
            tag::SIMPLIFY,
            tag::REPLACE,
            tag::VEC_COMPOSE,
            tag::SAT_COUNT,
            tag::PATH_COUNT,
        ];
        for (i, a) in fixed.iter().enumerate() {
            assert!(*a < tag::COMPOSE, "tag {} runs into the compose range", a);
            for b in &fixed[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

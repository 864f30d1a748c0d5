//! Mark-sweep garbage collection.
//!
//! The mark phase walks everything reachable from the protection stack of
//! the running operator, its operands, the external root registry, the
//! variable literals, and the substitution tables. The sweep phase rebuilds
//! the unique table from the marked nodes and frees the rest.

use log::debug;

use crate::bdd::Bdd;
use crate::config::CachePolicy;
use crate::reference::Ref;

impl Bdd {
    /// Collect every node not reachable from a root.
    ///
    /// Returns the number of freed nodes.
    ///
    /// # Examples
    ///
    /// ```
    /// use bdd_engine::bdd::Bdd;
    ///
    /// let mut bdd = Bdd::default();
    /// bdd.set_var_num(2).unwrap();
    /// let x = bdd.ith_var(0).unwrap();
    /// let y = bdd.ith_var(1).unwrap();
    /// let f = bdd.apply_and(x, y).unwrap();
    /// let g = bdd.apply_or(x, y).unwrap();
    /// bdd.protect(f).unwrap();
    /// assert_eq!(bdd.gc(), 1); // only `g` goes away
    /// assert!(bdd.release(f));
    /// let _ = g;
    /// ```
    pub fn gc(&mut self) -> usize {
        self.collect()
    }

    pub(crate) fn collect(&mut self) -> usize {
        let before = self.store.free_count();
        debug!(
            "gc: start, {} of {} nodes in use",
            self.store.used_count(),
            self.store.capacity()
        );

        self.store.clear_marks();
        for root in self.root_refs() {
            self.mark_reachable(root);
        }

        self.table.reset(self.store.capacity());
        let ids: Vec<Ref> = self.store.live_ids().collect();
        for id in ids {
            if self.store.is_marked(id) {
                self.table.insert(self.store.nodes(), id.id());
            } else {
                self.store.free(id);
            }
        }
        self.store.clear_marks();

        match self.config.cache_policy {
            CachePolicy::Reset => self.caches.reset(),
            CachePolicy::Clean => {
                let store = &self.store;
                self.caches.clean(|r| store.is_live(r));
            }
        }

        self.counters.gc_runs += 1;
        let freed = self.store.free_count() - before;
        debug!("gc: freed {} nodes, {} free", freed, self.store.free_count());
        freed
    }

    /// Every node the collector must keep, terminals excluded.
    pub(crate) fn root_refs(&self) -> Vec<Ref> {
        let mut roots: Vec<Ref> = Vec::with_capacity(self.refstack.len() + self.roots.len() + 2 * self.literals.len());
        roots.extend(self.refstack.iter().copied());
        roots.extend(self.operands.iter().copied());
        roots.extend(self.roots.iter().map(|(node, _)| node));
        for &(pos, neg) in &self.literals {
            roots.push(pos);
            roots.push(neg);
        }
        roots.extend(self.pairs.nodes());
        roots.retain(|r| !r.is_terminal());
        roots
    }

    /// Mark `root` and its descendants. Stops at already marked nodes.
    fn mark_reachable(&mut self, root: Ref) {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.is_terminal() || !self.store.mark(node) {
                continue;
            }
            stack.push(self.store.low(node));
            stack.push(self.store.high(node));
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::bdd::Bdd;
    use crate::config::{BddConfig, CachePolicy};
    use crate::reference::Ref;

    #[test]
    fn test_gc_keeps_protected() {
        let mut bdd = Bdd::default();
        bdd.set_var_num(3).unwrap();
        let x = bdd.ith_var(0).unwrap();
        let y = bdd.ith_var(1).unwrap();
        let z = bdd.ith_var(2).unwrap();
        let xy = bdd.apply_and(x, y).unwrap();
        let f = bdd.apply_or(xy, z).unwrap();
        bdd.protect(f).unwrap();
        let count = bdd.sat_count(f).unwrap();

        let used = bdd.stats().capacity - bdd.stats().free_nodes;
        let freed = bdd.gc();
        assert!(freed >= 1); // `xy` is unreachable from `f`
        assert_eq!(bdd.stats().capacity - bdd.stats().free_nodes, used - freed);
        assert_eq!(bdd.sat_count(f).unwrap(), count);
        bdd.validate_all().unwrap();
    }

    #[test]
    fn test_gc_frees_unprotected() {
        let mut bdd = Bdd::default();
        bdd.set_var_num(4).unwrap();
        let mut f = bdd.ith_var(0).unwrap();
        for v in 1..4 {
            let x = bdd.ith_var(v).unwrap();
            f = bdd.apply_xor(f, x).unwrap();
        }
        let literals = 2 + 2 * 4;
        assert!(bdd.stats().capacity - bdd.stats().free_nodes > literals);
        bdd.gc();
        assert_eq!(bdd.stats().capacity - bdd.stats().free_nodes, literals);
    }

    #[test]
    fn test_gc_clean_policy() {
        let config = BddConfig::default().with_cache_policy(CachePolicy::Clean);
        let mut bdd = Bdd::with_config(config).unwrap();
        bdd.set_var_num(2).unwrap();
        let x = bdd.ith_var(0).unwrap();
        let y = bdd.ith_var(1).unwrap();
        let f = bdd.apply_and(x, y).unwrap();
        bdd.protect(f).unwrap();
        bdd.gc();
        let hits = bdd.stats().cache.hits;
        assert_eq!(bdd.apply_and(x, y).unwrap(), f);
        assert_eq!(bdd.stats().cache.hits, hits + 1);
    }

    #[test]
    fn test_results_survive_growth_and_gc() {
        for policy in [CachePolicy::Reset, CachePolicy::Clean] {
            let config = BddConfig::default().with_node_capacity(16).with_cache_policy(policy);
            let mut bdd = Bdd::with_config(config).unwrap();
            bdd.set_var_num(5).unwrap();
            let v: Vec<Ref> = (0..5).map(|i| bdd.ith_var(i).unwrap()).collect();
            let f = bdd.apply_and(v[0], v[1]).unwrap();
            bdd.protect(f).unwrap();
            let count = bdd.sat_count(f).unwrap();

            // Unprotected products turn into garbage; the parity chain is kept.
            let mut parity = Ref::ZERO;
            for i in 0..5 {
                for j in i + 1..5 {
                    let t = bdd.apply_and(v[i], v[j]).unwrap();
                    bdd.apply_or(t, parity).unwrap();
                }
                let next = bdd.apply_xor(parity, v[i]).unwrap();
                bdd.protect(next).unwrap();
                bdd.release(parity);
                parity = next;
            }

            let stats = bdd.stats();
            assert!(stats.capacity > 16, "{:?}", policy);
            assert!(stats.growths > 0 && stats.gc_runs > 0, "{:?}", policy);
            assert_eq!(bdd.apply_and(v[0], v[1]).unwrap(), f, "{:?}", policy);
            assert_eq!(bdd.sat_count(f).unwrap(), count);
            assert_eq!(bdd.sat_count(parity).unwrap(), 16.0);
            bdd.validate_all().unwrap();
        }
    }
}

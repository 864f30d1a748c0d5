//! Structural self-checks of the shared graph.

use std::collections::HashMap;

use crate::bdd::Bdd;
use crate::error::BddError;
use crate::reference::Ref;
use crate::table::Probe;

impl Bdd {
    /// Check every node reachable from `r`.
    ///
    /// Each node must be reduced (distinct children), its children must be
    /// live and strictly below it, and the unique table must return it for
    /// its own triple.
    pub fn validate(&self, r: Ref) -> Result<(), BddError> {
        self.check_node(r)?;
        for node in self.descendants(&[r]) {
            self.validate_node(node)?;
        }
        Ok(())
    }

    /// Check every live node, and that no two share a triple.
    pub fn validate_all(&self) -> Result<(), BddError> {
        let mut seen: HashMap<(u32, Ref, Ref), Ref> = HashMap::new();
        for id in self.store.live_ids() {
            self.validate_node(id)?;
            let node = self.store.node(id);
            if let Some(other) = seen.insert((node.level, node.low, node.high), id) {
                return Err(BddError::Corrupted(format!("{} and {} share a triple", other, id)));
            }
        }
        for (var, &level) in self.var2level.iter().enumerate() {
            if self.level2var.get(level as usize) != Some(&(var as u32)) {
                return Err(BddError::Corrupted(format!("x{} is not at level {}", var, level)));
            }
        }
        Ok(())
    }

    fn validate_node(&self, id: Ref) -> Result<(), BddError> {
        let node = self.store.node(id);
        if node.level >= self.var_num {
            return Err(BddError::Corrupted(format!("{} has level {} past the last variable", id, node.level)));
        }
        if node.low == node.high {
            return Err(BddError::Corrupted(format!("{} is redundant", id)));
        }
        for child in [node.low, node.high] {
            if child.index() >= self.store.capacity() || !self.store.is_live(child) {
                return Err(BddError::Corrupted(format!("{} points to dead node {}", id, child)));
            }
            if self.store.level(child) <= node.level {
                return Err(BddError::Corrupted(format!("{} is not above its child {}", id, child)));
            }
        }
        match self.table.find(self.store.nodes(), node) {
            Probe::Found(found) if found == id.id() => Ok(()),
            _ => Err(BddError::Corrupted(format!("{} is missing from the unique table", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::config::BddConfig;
    use crate::reorder::ReorderMethod;

    const VARS: u32 = 4;
    const MINTERMS: u32 = 1 << VARS;

    /// Truth table of `f`: bit `m` is the value under assignment `m`,
    /// where variable `v` takes bit `v` of `m`.
    fn table(bdd: &Bdd, f: Ref) -> u16 {
        let mut t = 0;
        for m in 0..MINTERMS {
            let assignment: Vec<bool> = (0..VARS).map(|v| m >> v & 1 == 1).collect();
            if bdd.eval(f, &assignment).unwrap() {
                t |= 1 << m;
            }
        }
        t
    }

    fn bit(t: u16, m: u32) -> bool {
        t >> m & 1 == 1
    }

    fn tabulate(f: impl Fn(u32) -> bool) -> u16 {
        (0..MINTERMS).filter(|&m| f(m)).fold(0, |t, m| t | 1 << m)
    }

    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: usize) -> usize {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (self.0 >> 33) as usize % bound
        }
    }

    /// Ids are equal exactly when the functions are.
    fn check_canonical(bdd: &Bdd, pool: &[(Ref, u16)]) {
        for (i, &(p, tp)) in pool.iter().enumerate() {
            assert_eq!(table(bdd, p), tp, "{} changed its function", p);
            for &(r, tr) in &pool[i + 1..] {
                assert_eq!(p == r, tp == tr, "{} and {} break canonicity", p, r);
            }
        }
    }

    #[test]
    fn test_random_operations_stay_canonical() {
        let mut bdd = Bdd::with_config(BddConfig::default().with_node_capacity(32)).unwrap();
        bdd.set_var_num(VARS).unwrap();
        let mut rng = Lcg(0x5eed);
        let mut pool: Vec<(Ref, u16)> = vec![(Ref::ZERO, 0), (Ref::ONE, u16::MAX)];
        for v in 0..VARS {
            let x = bdd.ith_var(v).unwrap();
            pool.push((x, tabulate(|m| m >> v & 1 == 1)));
        }
        let methods = [
            ReorderMethod::Sift,
            ReorderMethod::Win2,
            ReorderMethod::Win3Ite,
            ReorderMethod::SiftIte,
            ReorderMethod::Win2Ite,
            ReorderMethod::Win3,
        ];

        for step in 0..400 {
            let (f, tf) = pool[rng.next(pool.len())];
            let (g, tg) = pool[rng.next(pool.len())];
            let (h, th) = pool[rng.next(pool.len())];
            let v = rng.next(VARS as usize) as u32;
            let (r, expected) = match rng.next(8) {
                0 => (bdd.apply_and(f, g).unwrap(), tf & tg),
                1 => (bdd.apply_or(f, g).unwrap(), tf | tg),
                2 => (bdd.apply_xor(f, g).unwrap(), tf ^ tg),
                3 => (bdd.apply_not(f).unwrap(), !tf),
                4 => (bdd.apply_ite(f, g, h).unwrap(), tf & tg | !tf & th),
                5 => {
                    let set = bdd.make_set(&[v]).unwrap();
                    let t = tabulate(|m| bit(tf, m & !(1 << v)) || bit(tf, m | 1 << v));
                    (bdd.exist(f, set).unwrap(), t)
                }
                6 => {
                    let set = bdd.make_set(&[v]).unwrap();
                    let t = tabulate(|m| bit(tf, m & !(1 << v)) && bit(tf, m | 1 << v));
                    (bdd.forall(f, set).unwrap(), t)
                }
                _ => {
                    let t = tabulate(|m| {
                        let fixed = if bit(tg, m) { m | 1 << v } else { m & !(1 << v) };
                        bit(tf, fixed)
                    });
                    (bdd.compose(f, g, v).unwrap(), t)
                }
            };
            assert_eq!(table(&bdd, r), expected, "step {}", step);
            bdd.protect(r).unwrap();
            pool.push((r, expected));

            if pool.len() > 24 {
                let (old, _) = pool.swap_remove(2 + VARS as usize + rng.next(pool.len() - 2 - VARS as usize));
                bdd.release(old);
            }
            bdd.validate_all().unwrap();
            check_canonical(&bdd, &pool);

            if step % 40 == 39 {
                bdd.reorder(methods[step / 40 % methods.len()]).unwrap();
                bdd.validate_all().unwrap();
                check_canonical(&bdd, &pool);
            }
        }
        assert!(bdd.stats().gc_runs > 0);
    }

    #[test]
    fn test_valid_graph() {
        let mut bdd = Bdd::default();
        bdd.set_var_num(3).unwrap();
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(2).unwrap();
        let f = bdd.apply_xor(a, b).unwrap();
        bdd.validate(f).unwrap();
        bdd.validate(Ref::ONE).unwrap();
        bdd.validate_all().unwrap();
        assert_eq!(bdd.validate(Ref::new(1000)), Err(BddError::IllegalNode(Ref::new(1000))));
    }

    #[test]
    fn test_detects_broken_nodes() {
        let mut bdd = Bdd::default();
        bdd.set_var_num(2).unwrap();
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let f = bdd.apply_and(a, b).unwrap();

        // Flip the order: x0 node below an x1 child.
        bdd.store.node_mut(f).level = 1;
        assert!(matches!(bdd.validate(f), Err(BddError::Corrupted(_))));
        bdd.store.node_mut(f).level = 0;
        bdd.validate(f).unwrap();

        // Redundant node.
        let saved = *bdd.store.node(f);
        bdd.store.node_mut(f).low = saved.high;
        assert!(matches!(bdd.validate_all(), Err(BddError::Corrupted(_))));
    }
}

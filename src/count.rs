//! Counting: satisfying assignments, paths, nodes, and variable support.

use std::collections::HashSet;

use log::debug;

use crate::bdd::Bdd;
use crate::cache::tag;
use crate::error::BddError;
use crate::reference::Ref;

impl Bdd {
    /// Number of assignments to all variables that satisfy `r`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bdd_engine::bdd::Bdd;
    ///
    /// let mut bdd = Bdd::default();
    /// bdd.set_var_num(3).unwrap();
    /// let x = bdd.ith_var(0).unwrap();
    /// let y = bdd.ith_var(2).unwrap();
    /// let f = bdd.apply_or(x, y).unwrap();
    /// assert_eq!(bdd.sat_count(f).unwrap(), 6.0);
    /// ```
    pub fn sat_count(&mut self, r: Ref) -> Result<f64, BddError> {
        debug!("sat_count(r = {})", r);
        self.check_node(r)?;
        let scale = 2f64.powi(self.level(r) as i32);
        Ok(scale * self.sat_count_rec(r))
    }

    fn sat_count_rec(&mut self, r: Ref) -> f64 {
        if r.is_terminal() {
            return if r.is_one() { 1.0 } else { 0.0 };
        }
        let key = (r, tag::SAT_COUNT);
        if let Some(count) = self.caches.count.get(&key) {
            return count;
        }

        let level = self.level(r);
        let (low, high) = (self.lo(r), self.hi(r));
        let weight = |child_level: u32| 2f64.powi((child_level - level - 1) as i32);
        let count = weight(self.level(low)) * self.sat_count_rec(low) + weight(self.level(high)) * self.sat_count_rec(high);

        self.caches.count.insert(key, count);
        count
    }

    /// Number of satisfying assignments over the variables of `cube` only.
    ///
    /// Variables outside `cube` are assumed not to occur in `r`. An empty
    /// set or a FALSE function counts zero; otherwise the count is at least 1.
    pub fn sat_count_set(&mut self, r: Ref, cube: Ref) -> Result<f64, BddError> {
        debug!("sat_count_set(r = {}, cube = {})", r, cube);
        self.check_node(cube)?;
        if cube.is_terminal() || r.is_zero() {
            self.check_node(r)?;
            return Ok(0.0);
        }
        let mut unused = self.var_num as i32;
        let mut node = cube;
        while !node.is_terminal() {
            unused -= 1;
            node = self.hi(node);
        }
        let count = self.sat_count(r)? / 2f64.powi(unused);
        Ok(count.max(1.0))
    }

    /// Number of paths from `r` to the TRUE terminal.
    pub fn path_count(&mut self, r: Ref) -> Result<f64, BddError> {
        debug!("path_count(r = {})", r);
        self.check_node(r)?;
        Ok(self.path_count_rec(r))
    }

    fn path_count_rec(&mut self, r: Ref) -> f64 {
        if r.is_terminal() {
            return if r.is_one() { 1.0 } else { 0.0 };
        }
        let key = (r, tag::PATH_COUNT);
        if let Some(count) = self.caches.count.get(&key) {
            return count;
        }
        let (low, high) = (self.lo(r), self.hi(r));
        let count = self.path_count_rec(low) + self.path_count_rec(high);
        self.caches.count.insert(key, count);
        count
    }

    /// Non-terminal nodes reachable from any of `roots`.
    pub fn descendants(&self, roots: &[Ref]) -> HashSet<Ref> {
        let mut visited = HashSet::new();
        let mut stack: Vec<Ref> = roots.to_vec();
        while let Some(node) = stack.pop() {
            if node.is_terminal() || !visited.insert(node) {
                continue;
            }
            stack.push(self.lo(node));
            stack.push(self.hi(node));
        }
        visited
    }

    /// Number of non-terminal nodes in `r`.
    pub fn node_count(&self, r: Ref) -> Result<usize, BddError> {
        self.check_node(r)?;
        Ok(self.descendants(&[r]).len())
    }

    /// Number of distinct non-terminal nodes shared by all of `roots`.
    pub fn node_count_many(&self, roots: &[Ref]) -> Result<usize, BddError> {
        for &r in roots {
            self.check_node(r)?;
        }
        Ok(self.descendants(roots).len())
    }

    /// Number of nodes labelled with each variable, indexed by variable.
    pub fn var_profile(&self, r: Ref) -> Result<Vec<usize>, BddError> {
        self.check_node(r)?;
        let mut profile = vec![0; self.var_num as usize];
        for node in self.descendants(&[r]) {
            let var = self.level2var[self.level(node) as usize];
            profile[var as usize] += 1;
        }
        Ok(profile)
    }

    /// Positive cube of every variable `r` depends on.
    ///
    /// # Examples
    ///
    /// ```
    /// use bdd_engine::bdd::Bdd;
    ///
    /// let mut bdd = Bdd::default();
    /// bdd.set_var_num(4).unwrap();
    /// let x = bdd.ith_var(1).unwrap();
    /// let y = bdd.ith_var(3).unwrap();
    /// let f = bdd.apply_xor(x, y).unwrap();
    /// let support = bdd.support(f).unwrap();
    /// assert_eq!(support, bdd.make_set(&[1, 3]).unwrap());
    /// ```
    pub fn support(&mut self, r: Ref) -> Result<Ref, BddError> {
        debug!("support(r = {})", r);
        self.run(&[r], |bdd| {
            let mut levels: Vec<u32> = bdd.descendants(&[r]).into_iter().map(|n| bdd.level(n)).collect();
            levels.sort_unstable_by(|a, b| b.cmp(a));
            levels.dedup();
            let mut res = Ref::ONE;
            for level in levels {
                res = bdd.mk(level, Ref::ZERO, res)?;
                bdd.refstack.clear();
                bdd.push_ref(res);
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn manager(vars: u32) -> Bdd {
        let mut bdd = Bdd::default();
        bdd.set_var_num(vars).unwrap();
        bdd
    }

    #[test]
    fn test_sat_count_skipped_levels() {
        let mut bdd = manager(5);
        let a = bdd.ith_var(1).unwrap();
        let b = bdd.ith_var(3).unwrap();
        let f = bdd.apply_and(a, b).unwrap();
        assert_eq!(bdd.sat_count(f).unwrap(), 8.0);
        assert_eq!(bdd.sat_count(Ref::ONE).unwrap(), 32.0);
        assert_eq!(bdd.sat_count(Ref::ZERO).unwrap(), 0.0);
        let g = bdd.apply_xor(a, b).unwrap();
        assert_eq!(bdd.sat_count(g).unwrap(), 16.0);
    }

    #[test]
    fn test_sat_count_set() {
        let mut bdd = manager(4);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let f = bdd.apply_or(a, b).unwrap();
        let set = bdd.make_set(&[0, 1]).unwrap();
        assert_eq!(bdd.sat_count_set(f, set).unwrap(), 3.0);
        assert_eq!(bdd.sat_count_set(f, Ref::ONE).unwrap(), 0.0);
        assert_eq!(bdd.sat_count_set(Ref::ZERO, set).unwrap(), 0.0);
    }

    #[test]
    fn test_path_count() {
        let mut bdd = manager(3);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let c = bdd.ith_var(2).unwrap();
        let ab = bdd.apply_xor(a, b).unwrap();
        let f = bdd.apply_or(ab, c).unwrap();
        // Paths: !a b, !a !b c, a !b, a b c.
        assert_eq!(bdd.path_count(f).unwrap(), 4.0);
    }

    #[test]
    fn test_node_counts_and_profile() {
        let mut bdd = manager(3);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let c = bdd.ith_var(2).unwrap();
        let ab = bdd.apply_xor(a, b).unwrap();
        let f = bdd.apply_xor(ab, c).unwrap();
        // Parity over three variables: 1 + 2 + 2 nodes.
        assert_eq!(bdd.node_count(f).unwrap(), 5);
        assert_eq!(bdd.var_profile(f).unwrap(), vec![1, 2, 2]);
        assert_eq!(bdd.node_count_many(&[f, a, c]).unwrap(), 6);
        assert_eq!(bdd.node_count(Ref::ONE).unwrap(), 0);
    }

    #[test]
    fn test_support() {
        let mut bdd = manager(3);
        assert_eq!(bdd.support(Ref::ONE).unwrap(), Ref::ONE);
        let c = bdd.ith_var(2).unwrap();
        assert_eq!(bdd.support(c).unwrap(), c);
    }
}

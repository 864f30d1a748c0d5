//! Cofactoring operators: restriction by a fixed valuation, and the
//! generalized cofactors `constrain` and `simplify` against a care set.

use log::debug;

use crate::apply::BddOp;
use crate::bdd::Bdd;
use crate::bitset::BitSet;
use crate::cache::tag;
use crate::error::{BddError, OpResult};
use crate::reference::Ref;

/// Fixed levels of a valuation cube and the value each one takes.
pub(crate) struct Valuation {
    cube: Ref,
    levels: BitSet,
    positive: BitSet,
    last: Option<u32>,
}

impl Bdd {
    /// Read a cube of literals. A node whose low child is FALSE fixes its
    /// variable to true; any other node fixes it to false.
    pub(crate) fn valuation(&self, cube: Ref) -> Result<Valuation, BddError> {
        self.check_node(cube)?;
        let mut levels = BitSet::new(self.var_num as usize);
        let mut positive = BitSet::new(self.var_num as usize);
        let mut last = None;
        let mut node = cube;
        while !node.is_terminal() {
            let level = self.level(node);
            levels.insert(level as usize);
            if self.lo(node).is_zero() {
                positive.insert(level as usize);
                node = self.hi(node);
            } else {
                node = self.lo(node);
            }
            last = Some(level);
        }
        Ok(Valuation {
            cube,
            levels,
            positive,
            last,
        })
    }

    /// Fix the variables of the literal cube `cube` in `r`. A constant cube
    /// fixes nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use bdd_engine::bdd::Bdd;
    ///
    /// let mut bdd = Bdd::default();
    /// bdd.set_var_num(2).unwrap();
    /// let a = bdd.ith_var(0).unwrap();
    /// let b = bdd.ith_var(1).unwrap();
    /// let f = bdd.apply_or(a, b).unwrap();
    /// let not_a = bdd.nith_var(0).unwrap();
    /// assert_eq!(bdd.restrict(f, not_a).unwrap(), b);
    /// assert!(bdd.restrict(f, a).unwrap().is_one());
    /// ```
    pub fn restrict(&mut self, r: Ref, cube: Ref) -> Result<Ref, BddError> {
        debug!("restrict(r = {}, cube = {})", r, cube);
        if cube.is_terminal() {
            self.check_node(r)?;
            return Ok(r);
        }
        self.run(&[r, cube], |bdd| {
            let valuation = bdd.valuation(cube)?;
            bdd.restrict_rec(r, &valuation)
        })
    }

    fn restrict_rec(&mut self, r: Ref, valuation: &Valuation) -> OpResult<Ref> {
        let level = self.level(r);
        if r.is_terminal() || valuation.last.map_or(true, |last| level > last) {
            return Ok(r);
        }
        let key = (r, valuation.cube, tag::RESTRICT);
        if let Some(res) = self.caches.quant.get(&key) {
            return Ok(res);
        }

        let res = if valuation.levels.contains(level as usize) {
            let next = if valuation.positive.contains(level as usize) {
                self.hi(r)
            } else {
                self.lo(r)
            };
            self.restrict_rec(next, valuation)?
        } else {
            let (r0, r1) = (self.lo(r), self.hi(r));
            let low = self.restrict_rec(r0, valuation)?;
            self.push_ref(low);
            let high = self.restrict_rec(r1, valuation)?;
            self.push_ref(high);
            self.mk_from_stack(level)?
        };

        self.caches.quant.insert(key, res);
        Ok(res)
    }

    /// Generalized cofactor of `f` with respect to the care set `c`.
    ///
    /// Agrees with `f` wherever `c` holds, and the result only depends on
    /// the variables of `f` and `c`.
    pub fn constrain(&mut self, f: Ref, c: Ref) -> Result<Ref, BddError> {
        debug!("constrain(f = {}, c = {})", f, c);
        self.run(&[f, c], |bdd| bdd.constrain_rec(f, c))
    }

    fn constrain_rec(&mut self, f: Ref, c: Ref) -> OpResult<Ref> {
        if c.is_one() || f.is_terminal() {
            return Ok(f);
        }
        if c == f {
            return Ok(Ref::ONE);
        }
        if c.is_zero() {
            return Ok(Ref::ZERO);
        }
        let key = (f, c, tag::CONSTRAIN);
        if let Some(res) = self.caches.misc.get(&key) {
            return Ok(res);
        }

        let (level_f, level_c) = (self.level(f), self.level(c));
        let res = if level_f < level_c {
            let (f0, f1) = (self.lo(f), self.hi(f));
            let low = self.constrain_rec(f0, c)?;
            self.push_ref(low);
            let high = self.constrain_rec(f1, c)?;
            self.push_ref(high);
            self.mk_from_stack(level_f)?
        } else {
            // The care set decides at this level; `f` may or may not.
            let (f0, f1) = self.cofactors(f, level_c);
            let (c0, c1) = (self.lo(c), self.hi(c));
            if c0.is_zero() {
                self.constrain_rec(f1, c1)?
            } else if c1.is_zero() {
                self.constrain_rec(f0, c0)?
            } else {
                let low = self.constrain_rec(f0, c0)?;
                self.push_ref(low);
                let high = self.constrain_rec(f1, c1)?;
                self.push_ref(high);
                self.mk_from_stack(level_c)?
            }
        };

        self.caches.misc.insert(key, res);
        Ok(res)
    }

    /// Coudert-Madre restrict: a small function agreeing with `f` on the
    /// care set `d`.
    pub fn simplify(&mut self, f: Ref, d: Ref) -> Result<Ref, BddError> {
        debug!("simplify(f = {}, d = {})", f, d);
        self.run(&[f, d], |bdd| bdd.simplify_rec(f, d))
    }

    fn simplify_rec(&mut self, f: Ref, d: Ref) -> OpResult<Ref> {
        if d.is_one() || f.is_terminal() {
            return Ok(f);
        }
        if d == f {
            return Ok(Ref::ONE);
        }
        if d.is_zero() {
            return Ok(Ref::ZERO);
        }
        let key = (f, d, tag::SIMPLIFY);
        if let Some(res) = self.caches.misc.get(&key) {
            return Ok(res);
        }

        let (level_f, level_d) = (self.level(f), self.level(d));
        let res = if level_f == level_d {
            let (f0, f1) = (self.lo(f), self.hi(f));
            let (d0, d1) = (self.lo(d), self.hi(d));
            if d0.is_zero() {
                self.simplify_rec(f1, d1)?
            } else if d1.is_zero() {
                self.simplify_rec(f0, d0)?
            } else {
                let low = self.simplify_rec(f0, d0)?;
                self.push_ref(low);
                let high = self.simplify_rec(f1, d1)?;
                self.push_ref(high);
                self.mk_from_stack(level_f)?
            }
        } else if level_f < level_d {
            let (f0, f1) = (self.lo(f), self.hi(f));
            let low = self.simplify_rec(f0, d)?;
            self.push_ref(low);
            let high = self.simplify_rec(f1, d)?;
            self.push_ref(high);
            self.mk_from_stack(level_f)?
        } else {
            // `f` does not depend on the top variable of `d`: quantify it out.
            let (d0, d1) = (self.lo(d), self.hi(d));
            let care = self.apply_rec(BddOp::Or, d0, d1)?;
            self.push_ref(care);
            let res = self.simplify_rec(f, care)?;
            self.pop_refs(1);
            res
        };

        self.caches.misc.insert(key, res);
        Ok(res)
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
    fn test_restrict_mixed_polarity() {
        let mut bdd = manager(3);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let c = bdd.ith_var(2).unwrap();
        let ab = bdd.apply_and(a, b).unwrap();
        let f = bdd.apply_or(ab, c).unwrap();

        // a = 1, c = 0
        let nc = bdd.nith_var(2).unwrap();
        let cube = bdd.apply_and(a, nc).unwrap();
        assert_eq!(bdd.restrict(f, cube).unwrap(), b);

        // b = 0
        let nb = bdd.nith_var(1).unwrap();
        assert_eq!(bdd.restrict(f, nb).unwrap(), c);
        assert_eq!(bdd.restrict(f, Ref::ONE).unwrap(), f);
        assert_eq!(bdd.restrict(f, Ref::ZERO).unwrap(), f);
    }

    #[test]
    fn test_constrain_agrees_on_care_set() {
        let mut bdd = manager(3);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let c = bdd.ith_var(2).unwrap();
        let bc = bdd.apply_xor(b, c).unwrap();
        let f = bdd.apply_or(a, bc).unwrap();
        let care = bdd.apply_or(a, b).unwrap();

        let g = bdd.constrain(f, care).unwrap();
        let lhs = bdd.apply_and(g, care).unwrap();
        let rhs = bdd.apply_and(f, care).unwrap();
        assert_eq!(lhs, rhs);

        assert_eq!(bdd.constrain(f, f).unwrap(), Ref::ONE);
        assert_eq!(bdd.constrain(f, Ref::ZERO).unwrap(), Ref::ZERO);
        assert_eq!(bdd.constrain(f, Ref::ONE).unwrap(), f);
    }

    #[test]
    fn test_constrain_by_literal_is_cofactor() {
        let mut bdd = manager(2);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let f = bdd.apply_xor(a, b).unwrap();
        let nb = bdd.nith_var(1).unwrap();
        assert_eq!(bdd.constrain(f, a).unwrap(), nb);
        assert_eq!(bdd.restrict(f, a).unwrap(), nb);
    }

    #[test]
    fn test_simplify_agrees_on_care_set() {
        let mut bdd = manager(3);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let c = bdd.ith_var(2).unwrap();
        let ab = bdd.apply_and(a, b).unwrap();
        let f = bdd.apply_or(ab, c).unwrap();
        let care = bdd.apply_and(b, c).unwrap();

        let g = bdd.simplify(f, care).unwrap();
        let lhs = bdd.apply_and(g, care).unwrap();
        let rhs = bdd.apply_and(f, care).unwrap();
        assert_eq!(lhs, rhs);
        assert!(bdd.node_count(g).unwrap() <= bdd.node_count(f).unwrap());
    }
}

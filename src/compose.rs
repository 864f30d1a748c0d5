//! Substitution: single-variable composition, simultaneous composition
//! through a pairing, and variable renaming.

use log::debug;

use crate::bdd::Bdd;
use crate::cache::tag;
use crate::error::{BddError, Interrupt, OpResult};
use crate::pairs::{Pairing, PairingId};
use crate::reference::Ref;

impl Bdd {
    /// Substitute `g` for the variable `var` in `f`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bdd_engine::bdd::Bdd;
    ///
    /// let mut bdd = Bdd::default();
    /// bdd.set_var_num(3).unwrap();
    /// let a = bdd.ith_var(0).unwrap();
    /// let b = bdd.ith_var(1).unwrap();
    /// let c = bdd.ith_var(2).unwrap();
    /// let f = bdd.apply_and(a, b).unwrap();
    /// let g = bdd.compose(f, c, 0).unwrap();
    /// assert_eq!(g, bdd.apply_and(c, b).unwrap());
    /// ```
    pub fn compose(&mut self, f: Ref, g: Ref, var: u32) -> Result<Ref, BddError> {
        debug!("compose(f = {}, g = {}, var = {})", f, g, var);
        self.check_var(var)?;
        self.run(&[f, g], |bdd| {
            let level = bdd.var2level[var as usize];
            bdd.compose_rec(f, g, level)
        })
    }

    fn compose_rec(&mut self, f: Ref, g: Ref, level: u32) -> OpResult<Ref> {
        let level_f = self.level(f);
        if level_f > level {
            return Ok(f);
        }
        let key = (f, g, tag::COMPOSE + level);
        if let Some(res) = self.caches.misc.get(&key) {
            return Ok(res);
        }

        let res = if level_f < level {
            let top = level_f.min(self.level(g));
            let (f0, f1) = self.cofactors(f, top);
            let (g0, g1) = self.cofactors(g, top);
            let low = self.compose_rec(f0, g0, level)?;
            self.push_ref(low);
            let high = self.compose_rec(f1, g1, level)?;
            self.push_ref(high);
            self.mk_from_stack(top)?
        } else {
            let (f0, f1) = (self.lo(f), self.hi(f));
            self.ite_rec(g, f1, f0)?
        };

        self.caches.misc.insert(key, res);
        Ok(res)
    }

    /// Substitute every variable of `f` by its function in `pairing`, all
    /// at once.
    pub fn vec_compose(&mut self, f: Ref, pairing: PairingId) -> Result<Ref, BddError> {
        debug!("vec_compose(f = {}, pairing = {:?})", f, pairing);
        self.run(&[f], |bdd| {
            let pairing = bdd.pairs.get(pairing).clone();
            match pairing.last {
                Some(last) => bdd.vec_compose_rec(f, &pairing, last),
                None => Ok(f),
            }
        })
    }

    fn vec_compose_rec(&mut self, f: Ref, pairing: &Pairing, last: u32) -> OpResult<Ref> {
        let level = self.level(f);
        if level > last {
            return Ok(f);
        }
        let key = (f, pairing.stamp, tag::VEC_COMPOSE);
        if let Some(res) = self.caches.replace.get(&key) {
            return Ok(res);
        }

        let (f0, f1) = (self.lo(f), self.hi(f));
        let low = self.vec_compose_rec(f0, pairing, last)?;
        self.push_ref(low);
        let high = self.vec_compose_rec(f1, pairing, last)?;
        self.push_ref(high);
        let res = self.ite_rec(pairing.result[level as usize], high, low)?;
        self.pop_refs(2);

        self.caches.replace.insert(key, res);
        Ok(res)
    }

    /// Rename the variables of `f` as mapped by `pairing`.
    ///
    /// Fails with [`BddError::ReplaceConflict`] when a renamed variable
    /// would land on a level the rest of its subgraph already uses.
    ///
    /// # Examples
    ///
    /// ```
    /// use bdd_engine::bdd::Bdd;
    ///
    /// let mut bdd = Bdd::default();
    /// bdd.set_var_num(3).unwrap();
    /// let a = bdd.ith_var(0).unwrap();
    /// let c = bdd.ith_var(2).unwrap();
    /// let pairing = bdd.new_pairing();
    /// bdd.set_pair(pairing, 0, 2).unwrap();
    /// assert_eq!(bdd.replace(a, pairing).unwrap(), c);
    /// ```
    pub fn replace(&mut self, f: Ref, pairing: PairingId) -> Result<Ref, BddError> {
        debug!("replace(f = {}, pairing = {:?})", f, pairing);
        self.run(&[f], |bdd| {
            let pairing = bdd.pairs.get(pairing).clone();
            match pairing.last {
                Some(last) => bdd.replace_rec(f, &pairing, last),
                None => Ok(f),
            }
        })
    }

    fn replace_rec(&mut self, f: Ref, pairing: &Pairing, last: u32) -> OpResult<Ref> {
        if f.is_terminal() {
            return Ok(f);
        }
        let level = self.level(f);
        if level > last {
            return Ok(f);
        }
        let key = (f, pairing.stamp, tag::REPLACE);
        if let Some(res) = self.caches.replace.get(&key) {
            return Ok(res);
        }

        let (f0, f1) = (self.lo(f), self.hi(f));
        let low = self.replace_rec(f0, pairing, last)?;
        self.push_ref(low);
        let high = self.replace_rec(f1, pairing, last)?;
        self.push_ref(high);
        let target = self.level(pairing.result[level as usize]);
        let res = self.correctify(target, low, high)?;
        self.pop_refs(2);

        self.caches.replace.insert(key, res);
        Ok(res)
    }

    /// Build `ite(x_level, r, l)` where `l` and `r` may lie above `level`.
    fn correctify(&mut self, level: u32, l: Ref, r: Ref) -> OpResult<Ref> {
        let (level_l, level_r) = (self.level(l), self.level(r));
        if level < level_l && level < level_r {
            return self.mk(level, l, r);
        }
        if level == level_l || level == level_r {
            return Err(Interrupt::Fail(BddError::ReplaceConflict));
        }

        let top = level_l.min(level_r);
        let (l0, l1) = self.cofactors(l, top);
        let (r0, r1) = self.cofactors(r, top);
        let low = self.correctify(level, l0, r0)?;
        self.push_ref(low);
        let high = self.correctify(level, l1, r1)?;
        self.push_ref(high);
        self.mk_from_stack(top)
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
    fn test_compose_with_function() {
        let mut bdd = manager(3);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let c = bdd.ith_var(2).unwrap();
        let f = bdd.apply_xor(a, c).unwrap();
        let g = bdd.apply_and(b, c).unwrap();

        // (b & c) xor c == !b & c
        let h = bdd.compose(f, g, 0).unwrap();
        let nb = bdd.nith_var(1).unwrap();
        assert_eq!(h, bdd.apply_and(nb, c).unwrap());

        // Composing a variable `f` does not mention is the identity.
        assert_eq!(bdd.compose(f, g, 1).unwrap(), f);
        assert_eq!(bdd.compose(f, g, 9), Err(BddError::UnknownVariable(9)));
    }

    #[test]
    fn test_replace_swaps_variables() {
        let mut bdd = manager(4);
        let v: Vec<Ref> = (0..4).map(|i| bdd.ith_var(i).unwrap()).collect();
        let nv1 = bdd.nith_var(1).unwrap();
        let f = bdd.apply_and(v[0], nv1).unwrap();

        let pairing = bdd.new_pairing();
        bdd.set_pair(pairing, 0, 2).unwrap();
        bdd.set_pair(pairing, 1, 3).unwrap();
        let g = bdd.replace(f, pairing).unwrap();
        let nv3 = bdd.nith_var(3).unwrap();
        assert_eq!(g, bdd.apply_and(v[2], nv3).unwrap());

        bdd.reset_pairing(pairing);
        assert_eq!(bdd.replace(f, pairing).unwrap(), f);
    }

    #[test]
    fn test_replace_conflict() {
        let mut bdd = manager(2);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let f = bdd.apply_and(a, b).unwrap();
        let pairing = bdd.new_pairing();
        bdd.set_pair(pairing, 0, 1).unwrap();
        assert_eq!(bdd.replace(f, pairing), Err(BddError::ReplaceConflict));
        assert_eq!(bdd.error(), None);
    }

    #[test]
    fn test_vec_compose() {
        let mut bdd = manager(3);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let c = bdd.ith_var(2).unwrap();
        let f = bdd.apply_or(a, b).unwrap();

        // a := b & c, b := !a, simultaneously.
        let bc = bdd.apply_and(b, c).unwrap();
        let na = bdd.nith_var(0).unwrap();
        let pairing = bdd.new_pairing();
        bdd.set_pair_bdd(pairing, 0, bc).unwrap();
        bdd.set_pair_bdd(pairing, 1, na).unwrap();

        let g = bdd.vec_compose(f, pairing).unwrap();
        let expected = bdd.apply_or(bc, na).unwrap();
        assert_eq!(g, expected);
    }
}

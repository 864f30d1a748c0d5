//! Satisfying assignments: witnesses, enumeration, exact counting, and
//! evaluation under a full assignment.

use std::collections::HashMap;

use log::debug;
use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::error::{BddError, OpResult};
use crate::reference::Ref;

impl Bdd {
    /// Value of `f` when every variable `v` is set to `assignment[v]`.
    pub fn eval(&self, f: Ref, assignment: &[bool]) -> Result<bool, BddError> {
        self.check_node(f)?;
        if assignment.len() < self.var_num as usize {
            return Err(BddError::UnknownVariable(assignment.len() as u32));
        }
        let mut node = f;
        while !node.is_terminal() {
            let var = self.level2var[self.level(node) as usize];
            node = if assignment[var as usize] {
                self.hi(node)
            } else {
                self.lo(node)
            };
        }
        Ok(node.is_one())
    }

    /// One satisfying cube of `r`, preferring low branches.
    ///
    /// Returns FALSE if `r` is unsatisfiable.
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
    /// let f = bdd.apply_or(x, y).unwrap();
    /// let cube = bdd.sat_one(f).unwrap();
    /// let nx = bdd.nith_var(0).unwrap();
    /// assert_eq!(cube, bdd.apply_and(nx, y).unwrap());
    /// ```
    pub fn sat_one(&mut self, r: Ref) -> Result<Ref, BddError> {
        debug!("sat_one(r = {})", r);
        if r.is_terminal() {
            return Ok(r);
        }
        self.auto.disable();
        let res = self.run(&[r], |bdd| bdd.sat_one_rec(r));
        self.auto.enable();
        res
    }

    fn sat_one_rec(&mut self, r: Ref) -> OpResult<Ref> {
        if r.is_terminal() {
            return Ok(r);
        }
        let level = self.level(r);
        let (low, high) = (self.lo(r), self.hi(r));
        let node = if low.is_zero() {
            let res = self.sat_one_rec(high)?;
            self.mk(level, Ref::ZERO, res)?
        } else {
            let res = self.sat_one_rec(low)?;
            self.mk(level, res, Ref::ZERO)?
        };
        Ok(self.push_ref(node))
    }

    /// One satisfying cube of `r` that mentions every variable of `cube`.
    ///
    /// Variables of `cube` that `r` does not decide are set to `polarity`.
    pub fn sat_one_set(&mut self, r: Ref, cube: Ref, polarity: bool) -> Result<Ref, BddError> {
        debug!("sat_one_set(r = {}, cube = {}, polarity = {})", r, cube, polarity);
        self.check_node(cube)?;
        if cube.is_zero() {
            return Err(BddError::IllegalVarSet(cube));
        }
        if r.is_zero() {
            return Ok(r);
        }
        self.auto.disable();
        let res = self.run(&[r, cube], |bdd| bdd.sat_one_set_rec(r, cube, polarity));
        self.auto.enable();
        res
    }

    fn sat_one_set_rec(&mut self, r: Ref, set: Ref, polarity: bool) -> OpResult<Ref> {
        if r.is_terminal() && set.is_terminal() {
            return Ok(r);
        }
        let (level_r, level_set) = (self.level(r), self.level(set));
        let node = if level_set < level_r {
            let res = self.sat_one_set_rec(r, self.hi(set), polarity)?;
            if polarity {
                self.mk(level_set, Ref::ZERO, res)?
            } else {
                self.mk(level_set, res, Ref::ZERO)?
            }
        } else {
            let next = if level_set == level_r { self.hi(set) } else { set };
            let (low, high) = (self.lo(r), self.hi(r));
            if low.is_zero() {
                let res = self.sat_one_set_rec(high, next, polarity)?;
                self.mk(level_r, Ref::ZERO, res)?
            } else {
                let res = self.sat_one_set_rec(low, next, polarity)?;
                self.mk(level_r, res, Ref::ZERO)?
            }
        };
        Ok(self.push_ref(node))
    }

    /// One satisfying minterm of `r`: a cube over every variable, taking
    /// low branches where possible and false for undecided variables.
    pub fn full_sat_one(&mut self, r: Ref) -> Result<Ref, BddError> {
        debug!("full_sat_one(r = {})", r);
        if r.is_zero() {
            self.check_node(r)?;
            return Ok(r);
        }
        self.auto.disable();
        let res = self.run(&[r], |bdd| {
            let mut res = bdd.full_sat_one_rec(r)?;
            for level in (0..bdd.level(r)).rev() {
                res = bdd.mk(level, res, Ref::ZERO)?;
                bdd.push_ref(res);
            }
            Ok(res)
        });
        self.auto.enable();
        res
    }

    fn full_sat_one_rec(&mut self, r: Ref) -> OpResult<Ref> {
        if r.is_terminal() {
            return Ok(r);
        }
        let level = self.level(r);
        let (low, high) = (self.lo(r), self.hi(r));
        let (child, take_low) = if low.is_zero() { (high, false) } else { (low, true) };
        let mut res = self.full_sat_one_rec(child)?;
        for skipped in (level + 1..self.level(child)).rev() {
            res = self.mk(skipped, res, Ref::ZERO)?;
            self.push_ref(res);
        }
        let node = if take_low {
            self.mk(level, res, Ref::ZERO)?
        } else {
            self.mk(level, Ref::ZERO, res)?
        };
        Ok(self.push_ref(node))
    }

    /// Exact number of satisfying assignments over all variables.
    pub fn sat_count_exact(&self, r: Ref) -> Result<BigUint, BddError> {
        self.check_node(r)?;
        let mut cache = HashMap::new();
        let count = self.sat_count_exact_rec(r, &mut cache);
        Ok(count << self.level(r))
    }

    fn sat_count_exact_rec(&self, r: Ref, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if r.is_zero() {
            return BigUint::from(0u32);
        } else if r.is_one() {
            return BigUint::from(1u32);
        }
        if let Some(count) = cache.get(&r) {
            return count.clone();
        }

        let level = self.level(r);
        let (low, high) = (self.lo(r), self.hi(r));
        let count_low = self.sat_count_exact_rec(low, cache) << (self.level(low) - level - 1);
        let count_high = self.sat_count_exact_rec(high, cache) << (self.level(high) - level - 1);
        let count = count_low + count_high;

        cache.insert(r, count.clone());
        count
    }

    /// Iterate over the satisfying paths of `r`.
    ///
    /// Each item is indexed by variable: `Some(value)` for a variable on the
    /// path, `None` for a don't-care.
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
    /// let f = bdd.apply_or(x, y).unwrap();
    /// let cubes: Vec<_> = bdd.all_sat(f).unwrap().collect();
    /// assert_eq!(cubes, vec![vec![Some(false), Some(true)], vec![Some(true), None]]);
    /// ```
    pub fn all_sat(&self, r: Ref) -> Result<AllSat<'_>, BddError> {
        self.check_node(r)?;
        Ok(AllSat::new(self, r))
    }
}

/// Depth-first enumeration of the satisfying paths of a function.
pub struct AllSat<'a> {
    bdd: &'a Bdd,
    /// Pending subgraphs: path length to restore and the literal leading to them.
    stack: Vec<(Ref, usize, Option<(u32, bool)>)>,
    /// Assigned `(variable, value)` pairs along the current path.
    path: Vec<(u32, bool)>,
}

impl<'a> AllSat<'a> {
    fn new(bdd: &'a Bdd, root: Ref) -> Self {
        Self {
            bdd,
            stack: vec![(root, 0, None)],
            path: Vec::new(),
        }
    }
}

impl Iterator for AllSat<'_> {
    type Item = Vec<Option<bool>>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, depth, literal)) = self.stack.pop() {
            self.path.truncate(depth);
            self.path.extend(literal);
            if node.is_zero() {
                continue;
            }
            if node.is_one() {
                let mut cube = vec![None; self.bdd.var_num as usize];
                for &(var, value) in &self.path {
                    cube[var as usize] = Some(value);
                }
                return Some(cube);
            }
            let var = self.bdd.level2var[self.bdd.level(node) as usize];
            let depth = self.path.len();
            // Low branch first.
            self.stack.push((self.bdd.hi(node), depth, Some((var, true))));
            self.stack.push((self.bdd.lo(node), depth, Some((var, false))));
        }
        None
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
    fn test_eval() {
        let mut bdd = manager(2);
        let x = bdd.ith_var(0).unwrap();
        let y = bdd.ith_var(1).unwrap();
        let f = bdd.apply_imp(x, y).unwrap();
        assert!(bdd.eval(f, &[false, false]).unwrap());
        assert!(!bdd.eval(f, &[true, false]).unwrap());
        assert!(bdd.eval(f, &[false]).is_err());
    }

    #[test]
    fn test_sat_one_is_implicant() {
        let mut bdd = manager(3);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let c = bdd.ith_var(2).unwrap();
        let ab = bdd.apply_and(a, b).unwrap();
        let f = bdd.apply_xor(ab, c).unwrap();

        let cube = bdd.sat_one(f).unwrap();
        assert!(!cube.is_zero());
        assert_eq!(bdd.apply_imp(cube, f).unwrap(), Ref::ONE);
        assert_eq!(bdd.sat_one(Ref::ZERO).unwrap(), Ref::ZERO);
    }

    #[test]
    fn test_full_sat_one_is_minterm() {
        let mut bdd = manager(4);
        let b = bdd.ith_var(1).unwrap();
        let d = bdd.ith_var(3).unwrap();
        let f = bdd.apply_or(b, d).unwrap();
        let m = bdd.full_sat_one(f).unwrap();
        assert_eq!(bdd.sat_count(m).unwrap(), 1.0);
        assert_eq!(bdd.apply_imp(m, f).unwrap(), Ref::ONE);
        assert_eq!(bdd.node_count(m).unwrap(), 4);
    }

    #[test]
    fn test_sat_one_set_fills_polarity() {
        let mut bdd = manager(3);
        let b = bdd.ith_var(1).unwrap();
        let set = bdd.make_set(&[0, 1, 2]).unwrap();
        let m = bdd.sat_one_set(b, set, true).unwrap();
        assert_eq!(m, set);
        let m = bdd.sat_one_set(b, set, false).unwrap();
        let expected = {
            let na = bdd.nith_var(0).unwrap();
            let nc = bdd.nith_var(2).unwrap();
            let t = bdd.apply_and(na, b).unwrap();
            bdd.apply_and(t, nc).unwrap()
        };
        assert_eq!(m, expected);
    }

    #[test]
    fn test_sat_count_exact_matches_float() {
        let mut bdd = manager(6);
        let mut f = Ref::ZERO;
        for v in (0..6).step_by(2) {
            let x = bdd.ith_var(v).unwrap();
            let y = bdd.ith_var(v + 1).unwrap();
            let xy = bdd.apply_and(x, y).unwrap();
            f = bdd.apply_or(f, xy).unwrap();
        }
        let exact = bdd.sat_count_exact(f).unwrap();
        assert_eq!(exact, BigUint::from(bdd.sat_count(f).unwrap() as u64));
        assert_eq!(exact, BigUint::from(37u32));
        assert_eq!(bdd.sat_count_exact(Ref::ONE).unwrap(), BigUint::from(64u32));
    }

    #[test]
    fn test_all_sat_covers_count() {
        let mut bdd = manager(3);
        let a = bdd.ith_var(0).unwrap();
        let c = bdd.ith_var(2).unwrap();
        let f = bdd.apply_xor(a, c).unwrap();
        let cubes: Vec<Vec<Option<bool>>> = bdd.all_sat(f).unwrap().collect();
        assert_eq!(
            cubes,
            vec![
                vec![Some(false), None, Some(true)],
                vec![Some(true), None, Some(false)],
            ]
        );
        let total: f64 = cubes
            .iter()
            .map(|cube| 2f64.powi(cube.iter().filter(|v| v.is_none()).count() as i32))
            .sum();
        assert_eq!(total, bdd.sat_count(f).unwrap());
        assert_eq!(bdd.all_sat(Ref::ZERO).unwrap().count(), 0);
        assert_eq!(bdd.all_sat(Ref::ONE).unwrap().count(), 1);
    }
}

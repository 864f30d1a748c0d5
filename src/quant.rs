//! Quantification and relational products.
//!
//! A set of variables is passed as a positive cube, see
//! [`make_set`](Bdd::make_set). Existential and universal quantification
//! fold the two cofactors at every quantified level with OR and AND; unique
//! quantification folds with XOR. The `app_*` variants fuse a binary
//! connective with the quantification so the intermediate conjunction (or
//! other combination) is never built in full.

use log::debug;

use crate::apply::BddOp;
use crate::bdd::Bdd;
use crate::bitset::BitSet;
use crate::cache::tag;
use crate::error::{BddError, OpResult};
use crate::reference::Ref;

/// Quantified levels of one call, read off a cube.
pub(crate) struct VarSet {
    cube: Ref,
    levels: BitSet,
    /// Deepest quantified level, `None` for the empty set.
    last: Option<u32>,
}

impl VarSet {
    #[inline]
    fn contains(&self, level: u32) -> bool {
        self.levels.contains(level as usize)
    }

    /// Whether nothing at or below `level` is quantified.
    #[inline]
    fn beyond(&self, level: u32) -> bool {
        self.last.map_or(true, |last| level > last)
    }
}

/// Fold applied at quantified levels, with its cache tags.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Quant {
    Exist,
    Forall,
}

impl Quant {
    fn fold(self) -> BddOp {
        match self {
            Quant::Exist => BddOp::Or,
            Quant::Forall => BddOp::And,
        }
    }

    fn tag(self) -> u32 {
        match self {
            Quant::Exist => tag::EXIST,
            Quant::Forall => tag::FORALL,
        }
    }

    fn app_tag(self) -> u32 {
        match self {
            Quant::Exist => tag::APP_EXIST,
            Quant::Forall => tag::APP_FORALL,
        }
    }
}

impl Bdd {
    /// Read the levels of `cube`, following high children.
    pub(crate) fn var_set(&self, cube: Ref) -> Result<VarSet, BddError> {
        self.check_node(cube)?;
        let mut levels = BitSet::new(self.var_num as usize);
        let mut last = None;
        let mut node = cube;
        while !node.is_terminal() {
            let level = self.level(node);
            levels.insert(level as usize);
            last = Some(level);
            node = self.hi(node);
        }
        Ok(VarSet { cube, levels, last })
    }

    /// Positive cube over `vars`, usable as a variable set.
    ///
    /// # Examples
    ///
    /// ```
    /// use bdd_engine::bdd::Bdd;
    ///
    /// let mut bdd = Bdd::default();
    /// bdd.set_var_num(3).unwrap();
    /// let set = bdd.make_set(&[2, 0]).unwrap();
    /// let x = bdd.ith_var(0).unwrap();
    /// let z = bdd.ith_var(2).unwrap();
    /// assert_eq!(set, bdd.apply_and(x, z).unwrap());
    /// assert_eq!(bdd.make_set(&[]).unwrap(), bdd_engine::reference::Ref::ONE);
    /// ```
    pub fn make_set(&mut self, vars: &[u32]) -> Result<Ref, BddError> {
        debug!("make_set(vars = {:?})", vars);
        for &var in vars {
            self.check_var(var)?;
        }
        self.run(&[], |bdd| {
            let mut levels: Vec<u32> = vars.iter().map(|&v| bdd.var2level[v as usize]).collect();
            levels.sort_unstable_by(|a, b| b.cmp(a));
            levels.dedup();
            let mut res = Ref::ONE;
            for &level in &levels {
                res = bdd.mk(level, Ref::ZERO, res)?;
                bdd.refstack.clear();
                bdd.push_ref(res);
            }
            Ok(res)
        })
    }

    /// Existential quantification of the variables in `cube`.
    ///
    /// A constant cube names no variables and returns `r` unchanged.
    pub fn exist(&mut self, r: Ref, cube: Ref) -> Result<Ref, BddError> {
        debug!("exist(r = {}, cube = {})", r, cube);
        self.quantify(r, cube, Quant::Exist)
    }

    /// Universal quantification of the variables in `cube`.
    pub fn forall(&mut self, r: Ref, cube: Ref) -> Result<Ref, BddError> {
        debug!("forall(r = {}, cube = {})", r, cube);
        self.quantify(r, cube, Quant::Forall)
    }

    fn quantify(&mut self, r: Ref, cube: Ref, quant: Quant) -> Result<Ref, BddError> {
        if cube.is_terminal() {
            self.check_node(r)?;
            return Ok(r);
        }
        self.run(&[r, cube], |bdd| {
            let set = bdd.var_set(cube)?;
            bdd.quant_rec(r, &set, quant)
        })
    }

    pub(crate) fn quant_rec(&mut self, r: Ref, set: &VarSet, quant: Quant) -> OpResult<Ref> {
        if r.is_terminal() || set.beyond(self.level(r)) {
            return Ok(r);
        }
        let key = (r, set.cube, quant.tag());
        if let Some(res) = self.caches.quant.get(&key) {
            return Ok(res);
        }

        let level = self.level(r);
        let (r0, r1) = (self.lo(r), self.hi(r));
        let low = self.quant_rec(r0, set, quant)?;
        self.push_ref(low);
        let high = self.quant_rec(r1, set, quant)?;
        self.push_ref(high);
        let res = if set.contains(level) {
            let res = self.apply_rec(quant.fold(), low, high)?;
            self.pop_refs(2);
            res
        } else {
            self.mk_from_stack(level)?
        };

        self.caches.quant.insert(key, res);
        Ok(res)
    }

    /// Unique (exclusive-or) quantification of the variables in `cube`.
    ///
    /// The result holds where exactly one of the two cofactors on each
    /// quantified variable holds.
    pub fn unique(&mut self, r: Ref, cube: Ref) -> Result<Ref, BddError> {
        debug!("unique(r = {}, cube = {})", r, cube);
        if cube.is_terminal() {
            self.check_node(r)?;
            return Ok(r);
        }
        self.run(&[r, cube], |bdd| {
            bdd.var_set(cube)?;
            bdd.unique_rec(r, cube)
        })
    }

    /// Walks the cube `q` alongside `r`.
    fn unique_rec(&mut self, r: Ref, q: Ref) -> OpResult<Ref> {
        let (level_r, level_q) = (self.level(r), self.level(q));
        if level_r > level_q {
            // `r` skips a quantified variable: both cofactors are equal.
            return Ok(Ref::ZERO);
        }
        if r.is_terminal() || q.is_terminal() {
            return Ok(r);
        }
        let key = (r, q, tag::UNIQUE);
        if let Some(res) = self.caches.quant.get(&key) {
            return Ok(res);
        }

        let (r0, r1) = (self.lo(r), self.hi(r));
        let res = if level_r == level_q {
            let next = self.hi(q);
            let low = self.unique_rec(r0, next)?;
            self.push_ref(low);
            let high = self.unique_rec(r1, next)?;
            self.push_ref(high);
            let res = self.apply_rec(BddOp::Xor, low, high)?;
            self.pop_refs(2);
            res
        } else {
            let low = self.unique_rec(r0, q)?;
            self.push_ref(low);
            let high = self.unique_rec(r1, q)?;
            self.push_ref(high);
            self.mk_from_stack(level_r)?
        };

        self.caches.quant.insert(key, res);
        Ok(res)
    }

    /// `exists cube. (l op r)` without building `l op r` in full.
    pub fn app_ex(&mut self, l: Ref, r: Ref, op: BddOp, cube: Ref) -> Result<Ref, BddError> {
        debug!("app_ex(l = {}, r = {}, op = {}, cube = {})", l, r, op, cube);
        self.app_quantify(l, r, op, cube, Quant::Exist)
    }

    /// `forall cube. (l op r)` without building `l op r` in full.
    pub fn app_all(&mut self, l: Ref, r: Ref, op: BddOp, cube: Ref) -> Result<Ref, BddError> {
        debug!("app_all(l = {}, r = {}, op = {}, cube = {})", l, r, op, cube);
        self.app_quantify(l, r, op, cube, Quant::Forall)
    }

    /// Relational product: `exists cube. (l & r)`.
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
    /// let set = bdd.make_set(&[0]).unwrap();
    /// assert_eq!(bdd.relprod(a, b, set).unwrap(), b);
    /// ```
    pub fn relprod(&mut self, l: Ref, r: Ref, cube: Ref) -> Result<Ref, BddError> {
        debug!("relprod(l = {}, r = {}, cube = {})", l, r, cube);
        self.app_quantify(l, r, BddOp::And, cube, Quant::Exist)
    }

    fn app_quantify(&mut self, l: Ref, r: Ref, op: BddOp, cube: Ref, quant: Quant) -> Result<Ref, BddError> {
        if cube.is_terminal() {
            return self.apply(op, l, r);
        }
        self.run(&[l, r, cube], |bdd| {
            let set = bdd.var_set(cube)?;
            bdd.app_quant_rec(l, r, op, &set, quant)
        })
    }

    fn app_quant_rec(&mut self, l: Ref, r: Ref, op: BddOp, set: &VarSet, quant: Quant) -> OpResult<Ref> {
        if let Some(res) = op.shortcut(l, r) {
            return self.quant_rec(res, set, quant);
        }
        let (level_l, level_r) = (self.level(l), self.level(r));
        if set.beyond(level_l) && set.beyond(level_r) {
            return self.apply_rec(op, l, r);
        }
        let key = (l, r, set.cube, quant.app_tag() | op.code());
        if let Some(res) = self.caches.app_quant.get(&key) {
            return Ok(res);
        }

        let level = level_l.min(level_r);
        let (l0, l1) = self.cofactors(l, level);
        let (r0, r1) = self.cofactors(r, level);
        let low = self.app_quant_rec(l0, r0, op, set, quant)?;
        self.push_ref(low);
        let high = self.app_quant_rec(l1, r1, op, set, quant)?;
        self.push_ref(high);
        let res = if set.contains(level) {
            let res = self.apply_rec(quant.fold(), low, high)?;
            self.pop_refs(2);
            res
        } else {
            self.mk_from_stack(level)?
        };

        self.caches.app_quant.insert(key, res);
        Ok(res)
    }

    /// `unique cube. (l op r)` without building `l op r` in full.
    pub fn app_uni(&mut self, l: Ref, r: Ref, op: BddOp, cube: Ref) -> Result<Ref, BddError> {
        debug!("app_uni(l = {}, r = {}, op = {}, cube = {})", l, r, op, cube);
        if cube.is_terminal() {
            return self.apply(op, l, r);
        }
        self.run(&[l, r, cube], |bdd| {
            bdd.var_set(cube)?;
            bdd.app_uni_rec(l, r, op, cube)
        })
    }

    /// Walks the cube `q` alongside both operands.
    fn app_uni_rec(&mut self, l: Ref, r: Ref, op: BddOp, q: Ref) -> OpResult<Ref> {
        let (level_l, level_r, level_q) = (self.level(l), self.level(r), self.level(q));
        if level_l > level_q && level_r > level_q {
            // Both operands skip a quantified variable.
            return Ok(Ref::ZERO);
        }
        if l.is_terminal() && r.is_terminal() {
            return Ok(Ref::from_bool(op.eval(l.is_one(), r.is_one())));
        }
        if q.is_terminal() {
            return self.apply_rec(op, l, r);
        }
        let key = (l, r, q, tag::APP_UNIQUE | op.code());
        if let Some(res) = self.caches.app_quant.get(&key) {
            return Ok(res);
        }

        let level = level_l.min(level_r);
        let (l0, l1) = self.cofactors(l, level);
        let (r0, r1) = self.cofactors(r, level);
        let res = if level == level_q {
            let next = self.hi(q);
            let low = self.app_uni_rec(l0, r0, op, next)?;
            self.push_ref(low);
            let high = self.app_uni_rec(l1, r1, op, next)?;
            self.push_ref(high);
            let res = self.apply_rec(BddOp::Xor, low, high)?;
            self.pop_refs(2);
            res
        } else {
            let low = self.app_uni_rec(l0, r0, op, q)?;
            self.push_ref(low);
            let high = self.app_uni_rec(l1, r1, op, q)?;
            self.push_ref(high);
            self.mk_from_stack(level)?
        };

        self.caches.app_quant.insert(key, res);
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
    fn test_exist_of_and() {
        let mut bdd = manager(2);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let f = bdd.apply_and(a, b).unwrap();
        let set = bdd.make_set(&[0]).unwrap();
        assert_eq!(bdd.exist(f, set).unwrap(), b);
        assert_eq!(bdd.forall(f, set).unwrap(), Ref::ZERO);
    }

    #[test]
    fn test_forall_of_or() {
        let mut bdd = manager(3);
        let a = bdd.ith_var(0).unwrap();
        let c = bdd.ith_var(2).unwrap();
        let f = bdd.apply_or(a, c).unwrap();
        let set = bdd.make_set(&[0]).unwrap();
        assert_eq!(bdd.forall(f, set).unwrap(), c);
        assert_eq!(bdd.exist(f, set).unwrap(), Ref::ONE);
    }

    #[test]
    fn test_unique() {
        let mut bdd = manager(2);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let set = bdd.make_set(&[0]).unwrap();

        // f = a xor b: the cofactors on `a` are `b` and `!b`, exactly one holds.
        let f = bdd.apply_xor(a, b).unwrap();
        assert_eq!(bdd.unique(f, set).unwrap(), Ref::ONE);

        // f = a & b: the cofactors are `0` and `b`.
        let g = bdd.apply_and(a, b).unwrap();
        assert_eq!(bdd.unique(g, set).unwrap(), b);

        // `b` does not depend on `a`.
        assert_eq!(bdd.unique(b, set).unwrap(), Ref::ZERO);
    }

    #[test]
    fn test_empty_and_illegal_sets() {
        let mut bdd = manager(2);
        let a = bdd.ith_var(0).unwrap();
        assert_eq!(bdd.exist(a, Ref::ONE).unwrap(), a);
        // A constant cube names no variables.
        assert_eq!(bdd.exist(a, Ref::ZERO).unwrap(), a);
        assert_eq!(bdd.forall(a, Ref::ZERO).unwrap(), a);
        assert_eq!(bdd.unique(a, Ref::ZERO).unwrap(), a);
        let b = bdd.ith_var(1).unwrap();
        let ab = bdd.apply_and(a, b).unwrap();
        assert_eq!(bdd.relprod(a, b, Ref::ZERO).unwrap(), ab);
        assert_eq!(bdd.app_uni(a, b, BddOp::And, Ref::ZERO).unwrap(), ab);
        assert_eq!(bdd.exist(Ref::new(1000), Ref::ZERO), Err(BddError::IllegalNode(Ref::new(1000))));
        assert_eq!(bdd.make_set(&[5]), Err(BddError::UnknownVariable(5)));
    }

    #[test]
    fn test_app_variants_match_unfused() {
        let mut bdd = manager(4);
        let v: Vec<Ref> = (0..4).map(|i| bdd.ith_var(i).unwrap()).collect();
        let l = bdd.apply_xor(v[0], v[2]).unwrap();
        let t = bdd.apply_or(v[1], v[3]).unwrap();
        let r = bdd.apply_and(t, v[0]).unwrap();
        let set = bdd.make_set(&[0, 3]).unwrap();
        for &x in &[l, r, set] {
            bdd.protect(x).unwrap();
        }

        for op in BddOp::ALL {
            let joined = bdd.apply(op, l, r).unwrap();
            bdd.protect(joined).unwrap();

            let fused = bdd.app_ex(l, r, op, set).unwrap();
            assert_eq!(fused, bdd.exist(joined, set).unwrap(), "app_ex {}", op);
            let fused = bdd.app_all(l, r, op, set).unwrap();
            assert_eq!(fused, bdd.forall(joined, set).unwrap(), "app_all {}", op);
            let fused = bdd.app_uni(l, r, op, set).unwrap();
            assert_eq!(fused, bdd.unique(joined, set).unwrap(), "app_uni {}", op);

            bdd.release(joined);
        }

        let and = bdd.apply_and(l, r).unwrap();
        let expected = bdd.exist(and, set).unwrap();
        assert_eq!(bdd.relprod(l, r, set).unwrap(), expected);
    }
}

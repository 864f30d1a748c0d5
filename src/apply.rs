//! Boolean connectives: NOT, ITE and the binary APPLY family.
//!
//! Every operator follows the same Shannon-expansion skeleton. Terminal
//! cases are answered directly. Otherwise the operands are split on the
//! topmost level among them (an operand below that level is reused on both
//! branches), the two branches are computed recursively and joined with
//! [`mk`](Bdd::mk). Both branch results sit on the protection stack until
//! the join, so a collection triggered by the join cannot reclaim them.

use std::fmt::{Display, Formatter};

use log::debug;

use crate::bdd::Bdd;
use crate::error::{BddError, OpResult};
use crate::reference::Ref;

/// Binary Boolean connective for [`Bdd::apply`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BddOp {
    And,
    Xor,
    Or,
    Nand,
    Nor,
    /// `l -> r`
    Imp,
    /// `l <-> r`
    Biimp,
    /// `l & !r`
    Diff,
    /// `!l & r`
    Less,
    /// `l <- r`
    Invimp,
}

impl BddOp {
    pub const ALL: [BddOp; 10] = [
        BddOp::And,
        BddOp::Xor,
        BddOp::Or,
        BddOp::Nand,
        BddOp::Nor,
        BddOp::Imp,
        BddOp::Biimp,
        BddOp::Diff,
        BddOp::Less,
        BddOp::Invimp,
    ];

    /// Truth table indexed by `l << 1 | r`.
    const fn table(self) -> [bool; 4] {
        match self {
            BddOp::And => [false, false, false, true],
            BddOp::Xor => [false, true, true, false],
            BddOp::Or => [false, true, true, true],
            BddOp::Nand => [true, true, true, false],
            BddOp::Nor => [true, false, false, false],
            BddOp::Imp => [true, true, false, true],
            BddOp::Biimp => [true, false, false, true],
            BddOp::Diff => [false, false, true, false],
            BddOp::Less => [false, true, false, false],
            BddOp::Invimp => [true, false, true, true],
        }
    }

    /// Value of the connective on constant arguments.
    pub const fn eval(self, l: bool, r: bool) -> bool {
        self.table()[((l as usize) << 1) | r as usize]
    }

    pub(crate) const fn code(self) -> u32 {
        self as u32
    }

    /// Result that needs no recursion, if any.
    pub(crate) fn shortcut(self, l: Ref, r: Ref) -> Option<Ref> {
        if l.is_terminal() && r.is_terminal() {
            return Some(Ref::from_bool(self.eval(l.is_one(), r.is_one())));
        }
        match self {
            BddOp::And => {
                if l == r || r.is_one() {
                    Some(l)
                } else if l.is_zero() || r.is_zero() {
                    Some(Ref::ZERO)
                } else if l.is_one() {
                    Some(r)
                } else {
                    None
                }
            }
            BddOp::Or => {
                if l == r || r.is_zero() {
                    Some(l)
                } else if l.is_one() || r.is_one() {
                    Some(Ref::ONE)
                } else if l.is_zero() {
                    Some(r)
                } else {
                    None
                }
            }
            BddOp::Xor => {
                if l == r {
                    Some(Ref::ZERO)
                } else if l.is_zero() {
                    Some(r)
                } else if r.is_zero() {
                    Some(l)
                } else {
                    None
                }
            }
            BddOp::Nand => (l.is_zero() || r.is_zero()).then_some(Ref::ONE),
            BddOp::Nor => (l.is_one() || r.is_one()).then_some(Ref::ZERO),
            BddOp::Imp => {
                if l.is_zero() || r.is_one() || l == r {
                    Some(Ref::ONE)
                } else if l.is_one() {
                    Some(r)
                } else {
                    None
                }
            }
            BddOp::Biimp => {
                if l == r {
                    Some(Ref::ONE)
                } else if l.is_one() {
                    Some(r)
                } else if r.is_one() {
                    Some(l)
                } else {
                    None
                }
            }
            BddOp::Diff => {
                if l == r || l.is_zero() || r.is_one() {
                    Some(Ref::ZERO)
                } else if r.is_zero() {
                    Some(l)
                } else {
                    None
                }
            }
            BddOp::Less => {
                if l == r || l.is_one() || r.is_zero() {
                    Some(Ref::ZERO)
                } else if l.is_zero() {
                    Some(r)
                } else {
                    None
                }
            }
            BddOp::Invimp => {
                if l == r || l.is_one() || r.is_zero() {
                    Some(Ref::ONE)
                } else if r.is_one() {
                    Some(l)
                } else {
                    None
                }
            }
        }
    }
}

impl Display for BddOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BddOp::And => "and",
            BddOp::Xor => "xor",
            BddOp::Or => "or",
            BddOp::Nand => "nand",
            BddOp::Nor => "nor",
            BddOp::Imp => "imp",
            BddOp::Biimp => "biimp",
            BddOp::Diff => "diff",
            BddOp::Less => "less",
            BddOp::Invimp => "invimp",
        };
        f.write_str(name)
    }
}

impl Bdd {
    /// Cofactors of `node` with respect to `level`.
    ///
    /// A node below `level` does not depend on it and is returned twice.
    #[inline]
    pub(crate) fn cofactors(&self, node: Ref, level: u32) -> (Ref, Ref) {
        if self.level(node) == level {
            (self.lo(node), self.hi(node))
        } else {
            (node, node)
        }
    }

    pub fn apply_not(&mut self, f: Ref) -> Result<Ref, BddError> {
        debug!("apply_not(f = {})", f);
        self.run(&[f], |bdd| bdd.not_rec(f))
    }

    pub(crate) fn not_rec(&mut self, f: Ref) -> OpResult<Ref> {
        if f.is_terminal() {
            return Ok(Ref::from_bool(f.is_zero()));
        }
        if let Some(res) = self.caches.not.get(&f) {
            return Ok(res);
        }
        let level = self.level(f);
        let (f0, f1) = (self.lo(f), self.hi(f));
        let low = self.not_rec(f0)?;
        self.push_ref(low);
        let high = self.not_rec(f1)?;
        self.push_ref(high);
        let res = self.mk_from_stack(level)?;
        self.caches.not.insert(f, res);
        Ok(res)
    }

    /// Apply the binary connective `op` to `l` and `r`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bdd_engine::apply::BddOp;
    /// use bdd_engine::bdd::Bdd;
    ///
    /// let mut bdd = Bdd::default();
    /// bdd.set_var_num(2).unwrap();
    /// let x = bdd.ith_var(0).unwrap();
    /// let y = bdd.ith_var(1).unwrap();
    /// let f = bdd.apply(BddOp::Imp, x, y).unwrap();
    /// let nx = bdd.apply_not(x).unwrap();
    /// assert_eq!(f, bdd.apply_or(nx, y).unwrap());
    /// ```
    pub fn apply(&mut self, op: BddOp, l: Ref, r: Ref) -> Result<Ref, BddError> {
        debug!("apply(op = {}, l = {}, r = {})", op, l, r);
        self.run(&[l, r], |bdd| bdd.apply_rec(op, l, r))
    }

    pub fn apply_and(&mut self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        debug!("apply_and(u = {}, v = {})", u, v);
        self.run(&[u, v], |bdd| bdd.apply_rec(BddOp::And, u, v))
    }

    pub fn apply_or(&mut self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        debug!("apply_or(u = {}, v = {})", u, v);
        self.run(&[u, v], |bdd| bdd.apply_rec(BddOp::Or, u, v))
    }

    pub fn apply_xor(&mut self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        debug!("apply_xor(u = {}, v = {})", u, v);
        self.run(&[u, v], |bdd| bdd.apply_rec(BddOp::Xor, u, v))
    }

    pub fn apply_imp(&mut self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        debug!("apply_imp(u = {}, v = {})", u, v);
        self.run(&[u, v], |bdd| bdd.apply_rec(BddOp::Imp, u, v))
    }

    pub fn apply_biimp(&mut self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        debug!("apply_biimp(u = {}, v = {})", u, v);
        self.run(&[u, v], |bdd| bdd.apply_rec(BddOp::Biimp, u, v))
    }

    /// Conjunction of all `nodes`; TRUE when empty.
    pub fn apply_and_many(&mut self, nodes: &[Ref]) -> Result<Ref, BddError> {
        debug!("apply_and_many({} nodes)", nodes.len());
        self.run(nodes, |bdd| {
            let mut res = Ref::ONE;
            for &node in nodes {
                res = bdd.apply_rec(BddOp::And, res, node)?;
                bdd.refstack.clear();
                bdd.push_ref(res);
            }
            Ok(res)
        })
    }

    /// Disjunction of all `nodes`; FALSE when empty.
    pub fn apply_or_many(&mut self, nodes: &[Ref]) -> Result<Ref, BddError> {
        debug!("apply_or_many({} nodes)", nodes.len());
        self.run(nodes, |bdd| {
            let mut res = Ref::ZERO;
            for &node in nodes {
                res = bdd.apply_rec(BddOp::Or, res, node)?;
                bdd.refstack.clear();
                bdd.push_ref(res);
            }
            Ok(res)
        })
    }

    pub(crate) fn apply_rec(&mut self, op: BddOp, l: Ref, r: Ref) -> OpResult<Ref> {
        if let Some(res) = op.shortcut(l, r) {
            return Ok(res);
        }
        let cached = match op {
            BddOp::And => self.caches.and.get(&(l, r)),
            BddOp::Or => self.caches.or.get(&(l, r)),
            _ => self.caches.apply.get(&(l, r, op.code())),
        };
        if let Some(res) = cached {
            return Ok(res);
        }

        let level = self.level(l).min(self.level(r));
        let (l0, l1) = self.cofactors(l, level);
        let (r0, r1) = self.cofactors(r, level);
        let low = self.apply_rec(op, l0, r0)?;
        self.push_ref(low);
        let high = self.apply_rec(op, l1, r1)?;
        self.push_ref(high);
        let res = self.mk_from_stack(level)?;

        match op {
            BddOp::And => self.caches.and.insert((l, r), res),
            BddOp::Or => self.caches.or.insert((l, r), res),
            _ => self.caches.apply.insert((l, r, op.code()), res),
        }
        Ok(res)
    }

    /// If-then-else: `(f & g) | (!f & h)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bdd_engine::bdd::Bdd;
    ///
    /// let mut bdd = Bdd::default();
    /// bdd.set_var_num(3).unwrap();
    /// let x = bdd.ith_var(0).unwrap();
    /// let y = bdd.ith_var(1).unwrap();
    /// let z = bdd.ith_var(2).unwrap();
    /// let f = bdd.apply_ite(x, y, z).unwrap();
    /// assert_eq!(bdd.low(f).unwrap(), z);
    /// assert_eq!(bdd.high(f).unwrap(), y);
    /// ```
    pub fn apply_ite(&mut self, f: Ref, g: Ref, h: Ref) -> Result<Ref, BddError> {
        debug!("apply_ite(f = {}, g = {}, h = {})", f, g, h);
        self.run(&[f, g, h], |bdd| bdd.ite_rec(f, g, h))
    }

    pub(crate) fn ite_rec(&mut self, f: Ref, g: Ref, h: Ref) -> OpResult<Ref> {
        // ite(1,G,H) => G
        // ite(0,G,H) => H
        // ite(F,G,G) => G
        // ite(F,1,0) => F
        // ite(F,0,1) => ~F
        if f.is_one() {
            return Ok(g);
        }
        if f.is_zero() {
            return Ok(h);
        }
        if g == h {
            return Ok(g);
        }
        if g.is_one() && h.is_zero() {
            return Ok(f);
        }
        if g.is_zero() && h.is_one() {
            return self.not_rec(f);
        }
        if let Some(res) = self.caches.ite.get(&(f, g, h)) {
            return Ok(res);
        }

        let level = self.level(f).min(self.level(g)).min(self.level(h));
        let (f0, f1) = self.cofactors(f, level);
        let (g0, g1) = self.cofactors(g, level);
        let (h0, h1) = self.cofactors(h, level);
        let low = self.ite_rec(f0, g0, h0)?;
        self.push_ref(low);
        let high = self.ite_rec(f1, g1, h1)?;
        self.push_ref(high);
        let res = self.mk_from_stack(level)?;
        self.caches.ite.insert((f, g, h), res);
        Ok(res)
    }
}

//! Dynamic variable reordering.
//!
//! # Theory: Variable Ordering
//!
//! The size of a BDD is highly sensitive to the order in which variables
//! appear. For `f = (x₁ ∧ y₁) ∨ (x₂ ∧ y₂) ∨ ... ∨ (xₙ ∧ yₙ)`:
//!
//! - **Good ordering** (x₁, y₁, x₂, y₂, ..., xₙ, yₙ): O(n) nodes
//! - **Bad ordering** (x₁, x₂, ..., xₙ, y₁, y₂, ..., yₙ): O(2ⁿ) nodes
//!
//! Finding the optimal ordering is NP-complete, so the manager improves the
//! order with heuristics built from one primitive: swapping two adjacent
//! levels.
//!
//! # Adjacent Level Swap
//!
//! A reorder session labels every node with its *variable* instead of its
//! level and splits the unique table into one region per variable. Swapping
//! the levels of `x` (above) and `y` (below) then only touches the nodes
//! of `x` that have a `y` child. Such a node `x ? (y ? f11 : f10) : (y ? f01 : f00)`
//! is rewritten in place as `y ? (x ? f11 : f01) : (x ? f10 : f00)`, so its id,
//! and thereby every reference to it, stays valid. Nodes of `y` that lost
//! their last parent are reclaimed by a local collection of the `y` region.
//!
//! Liveness during a session is tracked with saturating reference counts
//! instead of mark-sweep. An interaction matrix, computed once per session,
//! records which variables share a root; swapping two variables that never
//! interact only relabels the ordering tables.
//!
//! # Heuristics
//!
//! - **Window permutation** ([`ReorderMethod::Win2`], [`ReorderMethod::Win3`]):
//!   slides a window of 2 or 3 adjacent blocks over the order and keeps the
//!   best permutation of each window.
//! - **Sifting** ([`ReorderMethod::Sift`]): moves each block through every
//!   position, largest blocks first, aborting a direction once the graph grows
//!   by more than a fifth over the best size seen, and leaves it at the best
//!   position found.
//! - The `*Ite` variants repeat their base method until the size stops
//!   changing.
//!
//! Variables are moved in blocks: see [`add_var_block`](Bdd::add_var_block).
//! Without configured blocks every variable is its own block.
//!
//! # References
//!
//! - R. Rudell. "Dynamic variable ordering for ordered binary decision diagrams."
//!   ICCAD 1993. DOI: 10.1109/ICCAD.1993.580054
//!
//! - C. Meinel & T. Theobald. "Algorithms and Data Structures in VLSI Design."
//!   Springer, 1998. Chapter 4.

use std::fmt;

use log::{debug, info};

use crate::bdd::Bdd;
use crate::bitset::BitSet;
use crate::blocks::{self, Block};
use crate::error::BddError;
use crate::node::Node;
use crate::reference::Ref;
use crate::storage::next_capacity;
use crate::table::{LevelTable, Probe};

/// Reordering heuristic.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ReorderMethod {
    #[default]
    None,
    Win2,
    Win2Ite,
    Win3,
    Win3Ite,
    Sift,
    SiftIte,
}

impl fmt::Display for ReorderMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReorderMethod::None => "none",
            ReorderMethod::Win2 => "win2",
            ReorderMethod::Win2Ite => "win2ite",
            ReorderMethod::Win3 => "win3",
            ReorderMethod::Win3Ite => "win3ite",
            ReorderMethod::Sift => "sift",
            ReorderMethod::SiftIte => "siftite",
        };
        f.write_str(name)
    }
}

/// Statistics collected during one reorder session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderStats {
    /// Number of adjacent level swaps performed
    pub swaps: usize,
    /// Live nodes once the session has dropped unreachable ones
    pub initial_size: usize,
    /// Live nodes after the session
    pub final_size: usize,
}

impl ReorderStats {
    /// Calculate the size reduction ratio.
    pub fn reduction_ratio(&self) -> f64 {
        if self.initial_size == 0 {
            return 0.0;
        }
        1.0 - (self.final_size as f64 / self.initial_size as f64)
    }

    /// Calculate the percentage reduction.
    pub fn reduction_percent(&self) -> f64 {
        self.reduction_ratio() * 100.0
    }

    /// Whole percent of nodes removed, zero if the graph grew.
    pub fn gain(&self) -> usize {
        if self.initial_size == 0 {
            return 0;
        }
        100 * self.initial_size.saturating_sub(self.final_size) / self.initial_size
    }
}

/// Automatic reordering state.
#[derive(Debug, Clone)]
pub(crate) struct AutoReorder {
    pub method: ReorderMethod,
    /// Sessions left; `None` for unlimited.
    pub times: Option<usize>,
    /// Nesting depth of `disable_reorder`.
    pub disabled: usize,
    /// Live node count at which the next automatic session may start.
    pub next_threshold: usize,
}

impl AutoReorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            method: ReorderMethod::None,
            times: Some(0),
            disabled: 0,
            next_threshold: capacity,
        }
    }

    pub fn disable(&mut self) {
        self.disabled += 1;
    }

    pub fn enable(&mut self) {
        self.disabled = self.disabled.saturating_sub(1);
    }
}

impl Bdd {
    /// Reorder the variables with `method`, keeping every root intact.
    ///
    /// Nodes not reachable from a protected root are reclaimed.
    ///
    /// # Examples
    ///
    /// ```
    /// use bdd_engine::bdd::Bdd;
    /// use bdd_engine::reorder::ReorderMethod;
    ///
    /// let mut bdd = Bdd::default();
    /// bdd.set_var_num(4).unwrap();
    /// let v: Vec<_> = (0..4).map(|i| bdd.ith_var(i).unwrap()).collect();
    /// // x0 & x2 | x1 & x3 under the order x0 x1 x2 x3
    /// let a = bdd.apply_and(v[0], v[2]).unwrap();
    /// let b = bdd.apply_and(v[1], v[3]).unwrap();
    /// let f = bdd.apply_or(a, b).unwrap();
    /// bdd.protect(f).unwrap();
    /// let before = bdd.node_count(f).unwrap();
    ///
    /// bdd.reorder(ReorderMethod::Sift).unwrap();
    /// assert!(bdd.node_count(f).unwrap() <= before);
    /// assert_eq!(bdd.sat_count(f).unwrap(), 7.0);
    /// ```
    pub fn reorder(&mut self, method: ReorderMethod) -> Result<ReorderStats, BddError> {
        debug!("reorder(method = {})", method);
        self.refstack.clear();
        if method == ReorderMethod::None || self.var_num < 2 {
            let size = self.store.used_count();
            return Ok(ReorderStats {
                swaps: 0,
                initial_size: size,
                final_size: size,
            });
        }
        self.session(|session| session.reorder_tree(method))
    }

    /// Whether an automatic session may start now.
    pub(crate) fn reorder_ready(&self) -> bool {
        self.auto.method != ReorderMethod::None
            && self.auto.times != Some(0)
            && self.auto.disabled == 0
            && self.var_num > 1
    }

    /// Run an automatic session if one is armed, then move the threshold.
    ///
    /// Called after a top-level operator was interrupted; `operands` stay
    /// alive through the session.
    pub(crate) fn check_reorder(&mut self, operands: &[Ref]) {
        let mut gain = 0;
        if self.reorder_ready() {
            let method = self.auto.method;
            self.refstack.clear();
            self.operands.clear();
            self.operands.extend_from_slice(operands);
            match self.session(|session| session.reorder_tree(method)) {
                Ok(stats) => gain = stats.gain(),
                Err(error) => debug!("check_reorder: session stopped: {}", error),
            }
            self.operands.clear();
            if let Some(times) = &mut self.auto.times {
                *times = times.saturating_sub(1);
            }
        }

        // Wait until twice as many nodes are in use, longer if little was gained.
        let mut next = 2 * self.store.used_count();
        if gain < 20 {
            next += next * (20 - gain) / 20;
        }
        debug!("check_reorder: gain {}%, next threshold {}", gain, next);
        self.auto.next_threshold = next;
    }

    /// Arm automatic reordering with `method`, at most `times` sessions
    /// (`None` for unlimited). Returns the previous method.
    pub fn set_auto_reorder(&mut self, method: ReorderMethod, times: Option<usize>) -> ReorderMethod {
        self.auto.times = times;
        std::mem::replace(&mut self.auto.method, method)
    }

    /// Suspend automatic reordering. Calls nest.
    pub fn disable_reorder(&mut self) {
        self.auto.disable();
    }

    pub fn enable_reorder(&mut self) {
        self.auto.enable();
    }

    /// Exchange the levels of variables `v1` and `v2`.
    pub fn swap_var(&mut self, v1: u32, v2: u32) -> Result<(), BddError> {
        debug!("swap_var(v1 = {}, v2 = {})", v1, v2);
        if !self.blocks.is_empty() {
            return Err(BddError::BlocksConfigured);
        }
        self.check_var(v1)?;
        self.check_var(v2)?;
        if v1 == v2 {
            return Ok(());
        }
        let (upper, lower) = if self.var2level[v1 as usize] < self.var2level[v2 as usize] {
            (v1, v2)
        } else {
            (v2, v1)
        };
        let top = self.var2level[upper as usize];
        let bottom = self.var2level[lower as usize];

        self.refstack.clear();
        self.session(|session| {
            while session.level(upper) < bottom {
                session.vardown(upper)?;
            }
            while session.level(lower) > top {
                session.varup(lower)?;
            }
            Ok(())
        })
        .map(|_| ())
    }

    /// Impose `order`, listing every variable once from the top level down.
    ///
    /// # Examples
    ///
    /// ```
    /// use bdd_engine::bdd::Bdd;
    /// use bdd_engine::types::Var;
    ///
    /// let mut bdd = Bdd::default();
    /// bdd.set_var_num(3).unwrap();
    /// bdd.set_var_order(&[2, 0, 1]).unwrap();
    /// assert_eq!(bdd.current_order(), vec![Var::new(2), Var::new(0), Var::new(1)]);
    /// assert!(bdd.set_var_order(&[0, 0, 1]).is_err());
    /// ```
    pub fn set_var_order(&mut self, order: &[u32]) -> Result<(), BddError> {
        debug!("set_var_order(order = {:?})", order);
        if !self.blocks.is_empty() {
            return Err(BddError::BlocksConfigured);
        }
        if order.len() != self.var_num as usize {
            return Err(BddError::InvalidOrder);
        }
        let mut seen = BitSet::new(order.len());
        for &var in order {
            if var >= self.var_num || !seen.insert(var as usize) {
                return Err(BddError::InvalidOrder);
            }
        }

        self.refstack.clear();
        self.session(|session| {
            for (level, &var) in order.iter().enumerate() {
                while session.level(var) > level as u32 {
                    session.varup(var)?;
                }
            }
            Ok(())
        })
        .map(|_| ())
    }

    /// Group variables `first..=last` into a block that reorders as a unit.
    ///
    /// The variables must be adjacent in the current order. A fixed block
    /// never permutes its sub-blocks; a block without sub-blocks keeps its
    /// internal order regardless.
    pub fn add_var_block(&mut self, first: u32, last: u32, fixed: bool) -> Result<(), BddError> {
        debug!("add_var_block(first = {}, last = {}, fixed = {})", first, last, fixed);
        self.check_var(first)?;
        self.check_var(last)?;
        if first > last {
            return Err(BddError::IllegalVarBlock { first, last });
        }
        let levels = (first..=last).map(|v| self.var2level[v as usize]);
        let top = levels.clone().min().unwrap_or(0);
        let bottom = levels.max().unwrap_or(0);
        if bottom - top != last - first {
            return Err(BddError::IllegalVarBlock { first, last });
        }
        self.blocks.add(first, last, fixed)
    }

    pub fn clear_var_blocks(&mut self) {
        self.blocks.clear();
    }

    /// Run `body` inside a reorder session and close it, even on error.
    fn session(
        &mut self,
        body: impl FnOnce(&mut ReorderSession<'_>) -> Result<(), BddError>,
    ) -> Result<ReorderStats, BddError> {
        let mut session = ReorderSession::start(self);
        let result = body(&mut session);
        let stats = session.finish();
        info!(
            "reorder: {} -> {} nodes in {} swaps",
            stats.initial_size, stats.final_size, stats.swaps
        );
        match result {
            Ok(()) => Ok(stats),
            Err(error) => {
                if error.is_sticky() {
                    self.error = Some(error.clone());
                }
                Err(error)
            }
        }
    }
}

const MAX_REF: u8 = u8::MAX;

/// Exclusive hold on the manager for the duration of one reorder session.
///
/// While a session is open `Node::level` holds the node's variable, the
/// ordinary unique table is stale, and liveness is tracked by `refs`.
pub(crate) struct ReorderSession<'a> {
    bdd: &'a mut Bdd,
    table: LevelTable,
    /// Saturating reference counts; saturated nodes are never reclaimed.
    refs: Vec<u8>,
    /// Row `v` holds every variable sharing a root with `v`.
    interactions: Vec<BitSet>,
    swaps: usize,
    initial_size: usize,
}

impl<'a> ReorderSession<'a> {
    /// Relabel nodes by variable, drop unreachable nodes, count references,
    /// and lay out the per-variable table.
    fn start(bdd: &'a mut Bdd) -> Self {
        let var_num = bdd.var_num as usize;
        let ids: Vec<Ref> = bdd.store.live_ids().collect();
        for &id in &ids {
            let level = bdd.store.level(id) as usize;
            bdd.store.node_mut(id).level = bdd.level2var[level];
        }

        let roots = bdd.root_refs();
        let mut interactions = vec![BitSet::new(var_num); var_num];
        bdd.store.clear_marks();
        for &root in &roots {
            let mut deps = BitSet::new(var_num);
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                if node.is_terminal() {
                    continue;
                }
                let var = bdd.store.level(node) as usize;
                deps.insert(var);
                if bdd.store.mark(node) {
                    stack.push(bdd.store.low(node));
                    stack.push(bdd.store.high(node));
                } else {
                    // Seen from an earlier root: reuse what that root found below it.
                    deps.union_with(&interactions[var]);
                }
            }
            for var in deps.iter() {
                interactions[var].union_with(&deps);
            }
        }

        let mut refs = vec![0u8; bdd.store.capacity()];
        let mut counts = vec![0usize; var_num];
        for &id in &ids {
            if bdd.store.is_marked(id) {
                let node = *bdd.store.node(id);
                counts[node.level as usize] += 1;
                incref(&mut refs, node.low);
                incref(&mut refs, node.high);
            } else {
                bdd.store.free(id);
            }
        }
        bdd.store.clear_marks();
        refs[Ref::ZERO.index()] = MAX_REF;
        refs[Ref::ONE.index()] = MAX_REF;
        for &root in &roots {
            refs[root.index()] = MAX_REF;
        }

        let mut table = LevelTable::new(&counts);
        let live: Vec<Ref> = bdd.store.live_ids().collect();
        for id in live {
            table.insert(bdd.store.nodes(), id.id());
        }

        let initial_size = bdd.store.used_count();
        debug!(
            "reorder: session start, {} nodes, {} roots",
            initial_size,
            roots.len()
        );
        Self {
            bdd,
            table,
            refs,
            interactions,
            swaps: 0,
            initial_size,
        }
    }

    /// Restore levels, rebuild the unique table, and reset the caches.
    fn finish(self) -> ReorderStats {
        let bdd = self.bdd;
        let ids: Vec<Ref> = bdd.store.live_ids().collect();
        for id in ids {
            let var = bdd.store.level(id) as usize;
            bdd.store.node_mut(id).level = bdd.var2level[var];
        }
        bdd.collect();
        bdd.caches.reset();
        bdd.counters.reorders += 1;
        ReorderStats {
            swaps: self.swaps,
            initial_size: self.initial_size,
            final_size: bdd.store.used_count(),
        }
    }

    /// Live nodes, terminals included.
    pub(crate) fn size(&self) -> usize {
        self.bdd.store.used_count()
    }

    pub(crate) fn level(&self, var: u32) -> u32 {
        self.bdd.var2level[var as usize]
    }

    /// Live nodes labelled with `var`.
    pub(crate) fn var_size(&self, var: u32) -> usize {
        self.table.count(var)
    }

    fn reorder_tree(&mut self, method: ReorderMethod) -> Result<(), BddError> {
        if method == ReorderMethod::None || self.bdd.var_num < 2 {
            return Ok(());
        }
        let bdd = &*self.bdd;
        let mut root = blocks::layout(&bdd.blocks, &bdd.level2var, &bdd.var2level);
        self.reorder_block(&mut root, method)
    }

    /// Permute the children of `block` unless it is fixed, then descend.
    fn reorder_block(&mut self, block: &mut Block, method: ReorderMethod) -> Result<(), BddError> {
        if !block.fixed && block.children.len() > 1 {
            let children = &mut block.children;
            match method {
                ReorderMethod::None => {}
                ReorderMethod::Win2 => self.win2(children)?,
                ReorderMethod::Win2Ite => self.win2_ite(children)?,
                ReorderMethod::Win3 => self.win3(children)?,
                ReorderMethod::Win3Ite => self.win3_ite(children)?,
                ReorderMethod::Sift => self.sift(children)?,
                ReorderMethod::SiftIte => self.sift_ite(children)?,
            }
        }
        for child in &mut block.children {
            self.reorder_block(child, method)?;
        }
        block.refresh();
        Ok(())
    }

    /// Move block `i` below block `i + 1`.
    pub(crate) fn blockdown(&mut self, blocks: &mut [Block], i: usize) -> Result<(), BddError> {
        let steps = blocks[i + 1].vars.len();
        for &var in blocks[i].vars.iter().rev() {
            for _ in 0..steps {
                self.vardown(var)?;
            }
        }
        blocks.swap(i, i + 1);
        Ok(())
    }

    /// Move `var` one level up.
    pub(crate) fn varup(&mut self, var: u32) -> Result<(), BddError> {
        let level = self.level(var);
        if level == 0 {
            return Ok(());
        }
        let above = self.bdd.level2var[level as usize - 1];
        self.vardown(above)
    }

    /// Move `var` one level down, swapping it with the variable below.
    pub(crate) fn vardown(&mut self, var: u32) -> Result<(), BddError> {
        let level = self.level(var);
        if level + 1 >= self.bdd.var_num {
            return Ok(());
        }
        let below = self.bdd.level2var[level as usize + 1];
        if self.interactions[var as usize].contains(below as usize) {
            self.swap_nodes(var, below)?;
        }

        let bdd = &mut *self.bdd;
        bdd.level2var.swap(level as usize, level as usize + 1);
        bdd.var2level[var as usize] = level + 1;
        bdd.var2level[below as usize] = level;
        bdd.pairs.swap_down(level);
        self.swaps += 1;
        Ok(())
    }

    /// Rewrite the nodes of `var0` that depend on `var1`, which sits right
    /// below it, so that `var1` ends up on top.
    fn swap_nodes(&mut self, var0: u32, var1: u32) -> Result<(), BddError> {
        // Each rewritten node builds at most two new ones.
        let needed = 2 * self.table.count(var0);
        self.reserve(needed)?;

        let mut dependent = Vec::new();
        for id in self.table.take(var0) {
            let node = *self.bdd.store.node(Ref::new(id));
            if self.var(node.low) == var1 || self.var(node.high) == var1 {
                dependent.push(Ref::new(id));
            } else {
                self.table.insert(self.bdd.store.nodes(), id);
            }
        }

        for id in dependent {
            let node = *self.bdd.store.node(id);
            let (f00, f01) = self.cofactors(node.low, var1);
            let (f10, f11) = self.cofactors(node.high, var1);
            let low = self.makenode(var0, f00, f10)?;
            let high = self.makenode(var0, f01, f11)?;

            // The grandchildren gained references above, so the old children
            // cannot cascade; they are reclaimed by the local collection.
            self.decref(node.low);
            self.decref(node.high);
            *self.bdd.store.node_mut(id) = Node::new(var1, low, high);
            self.table.insert(self.bdd.store.nodes(), id.id());
        }

        self.local_gc(var1);
        Ok(())
    }

    /// Reclaim the nodes of `var` that lost every reference.
    fn local_gc(&mut self, var: u32) {
        for id in self.table.take(var) {
            let node_id = Ref::new(id);
            if self.refs[node_id.index()] > 0 {
                self.table.insert(self.bdd.store.nodes(), id);
            } else {
                let node = *self.bdd.store.node(node_id);
                self.decref(node.low);
                self.decref(node.high);
                self.bdd.store.free(node_id);
            }
        }
    }

    /// Find or create `(var, low, high)`, taking one reference to the result.
    fn makenode(&mut self, var: u32, low: Ref, high: Ref) -> Result<Ref, BddError> {
        if low == high {
            self.incref(low);
            return Ok(low);
        }
        let key = Node::new(var, low, high);
        if let Probe::Found(id) = self.table.find(self.bdd.store.nodes(), &key) {
            let id = Ref::new(id);
            self.incref(id);
            return Ok(id);
        }
        let id = self.bdd.store.alloc(key).ok_or(BddError::NodeLimit)?;
        self.table.insert(self.bdd.store.nodes(), id.id());
        self.refs[id.index()] = 1;
        self.incref(low);
        self.incref(high);
        self.bdd.counters.produced += 1;
        Ok(id)
    }

    /// Make sure `needed` free slots exist, growing the store if required.
    fn reserve(&mut self, needed: usize) -> Result<(), BddError> {
        while self.bdd.store.free_count() < needed {
            let config = &self.bdd.config;
            let current = self.bdd.store.capacity();
            let capacity = next_capacity(current, config.increase_factor, config.max_increase, config.max_nodes)
                .ok_or(BddError::NodeLimit)?;
            debug!("reorder: grow {} -> {} nodes", current, capacity);
            self.bdd.store.grow(capacity);
            self.refs.resize(capacity, 0);
            self.bdd.counters.growths += 1;
        }
        Ok(())
    }

    #[inline]
    fn var(&self, node: Ref) -> u32 {
        self.bdd.store.level(node)
    }

    fn cofactors(&self, node: Ref, var: u32) -> (Ref, Ref) {
        if self.var(node) == var {
            (self.bdd.store.low(node), self.bdd.store.high(node))
        } else {
            (node, node)
        }
    }

    #[inline]
    fn incref(&mut self, node: Ref) {
        incref(&mut self.refs, node);
    }

    #[inline]
    fn decref(&mut self, node: Ref) {
        let count = &mut self.refs[node.index()];
        if *count != MAX_REF && *count > 0 {
            *count -= 1;
        }
    }

    /// Upper bound on the size a sifting probe may reach.
    pub(crate) fn max_allowed(&self, best: usize) -> usize {
        let bound = best + best / 5;
        let config = &self.bdd.config;
        if config.max_nodes > 0 {
            bound.min(config.max_nodes.saturating_sub(config.max_increase).saturating_sub(2))
        } else {
            bound
        }
    }
}

#[inline]
fn incref(refs: &mut [u8], node: Ref) {
    let count = &mut refs[node.index()];
    if *count != MAX_REF {
        *count += 1;
    }
}

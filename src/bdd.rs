use log::debug;

use crate::blocks::VarTree;
use crate::cache::{CacheStats, OperatorCaches};
use crate::config::{check_increase_factor, check_min_free, BddConfig, CachePolicy};
use crate::error::{BddError, Interrupt, OpResult};
use crate::node::Node;
use crate::pairs::{Pairings, PairingId};
use crate::reference::Ref;
use crate::reorder::AutoReorder;
use crate::roots::Roots;
use crate::storage::{next_capacity, NodeStore};
use crate::table::{Probe, UniqueTable};
use crate::types::{Level, Var, MAX_VAR};

/// The BDD manager.
///
/// Owns the node store, the unique table, the operator caches, and the
/// variable order. Every function is a [`Ref`] into this manager.
///
/// Nodes are reclaimed by mark-sweep collection, which keeps whatever is
/// reachable from [`protect`](Bdd::protect)ed roots, the variable literals,
/// substitution tables, and the operands of the call in progress. A `Ref`
/// that is not protected may be invalidated by any later call that creates
/// nodes.
pub struct Bdd {
    pub(crate) store: NodeStore,
    pub(crate) table: UniqueTable,
    pub(crate) caches: OperatorCaches,
    pub(crate) config: BddConfig,
    pub(crate) var_num: u32,
    pub(crate) var2level: Vec<u32>,
    pub(crate) level2var: Vec<u32>,
    /// Positive and negative literal per variable.
    pub(crate) literals: Vec<(Ref, Ref)>,
    /// Intermediate results of the running operator.
    pub(crate) refstack: Vec<Ref>,
    /// Operands of the running top-level call.
    pub(crate) operands: Vec<Ref>,
    pub(crate) roots: Roots,
    pub(crate) pairs: Pairings,
    pub(crate) blocks: VarTree,
    pub(crate) auto: AutoReorder,
    pub(crate) error: Option<BddError>,
    pub(crate) counters: Counters,
}

#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct Counters {
    pub produced: usize,
    pub gc_runs: usize,
    pub growths: usize,
    pub reorders: usize,
}

/// Snapshot of manager statistics.
#[derive(Debug, Copy, Clone, Default)]
pub struct BddStats {
    pub capacity: usize,
    pub free_nodes: usize,
    pub produced_nodes: usize,
    pub gc_runs: usize,
    pub growths: usize,
    pub reorders: usize,
    pub var_num: u32,
    pub cache: CacheStats,
}

impl Default for Bdd {
    fn default() -> Self {
        Self::build(BddConfig::default())
    }
}

impl Bdd {
    /// Create a manager with the given configuration.
    pub fn with_config(config: BddConfig) -> Result<Self, BddError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: BddConfig) -> Self {
        debug!("Bdd::new(config = {:?})", config);
        let capacity = config.node_capacity;
        Self {
            store: NodeStore::new(capacity, 0),
            table: UniqueTable::new(capacity),
            caches: OperatorCaches::new(config.cache_bits),
            auto: AutoReorder::new(capacity),
            config,
            var_num: 0,
            var2level: Vec::new(),
            level2var: Vec::new(),
            literals: Vec::new(),
            refstack: Vec::new(),
            operands: Vec::new(),
            roots: Roots::default(),
            pairs: Pairings::default(),
            blocks: VarTree::default(),
            error: None,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &BddConfig {
        &self.config
    }

    pub fn stats(&self) -> BddStats {
        BddStats {
            capacity: self.store.capacity(),
            free_nodes: self.store.free_count(),
            produced_nodes: self.counters.produced,
            gc_runs: self.counters.gc_runs,
            growths: self.counters.growths,
            reorders: self.counters.reorders,
            var_num: self.var_num,
            cache: self.caches.stats(),
        }
    }

    /// The sticky capacity error, if one was raised.
    pub fn error(&self) -> Option<&BddError> {
        self.error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    // ---------------------------------------------------------------------
    // Variables

    pub fn var_num(&self) -> u32 {
        self.var_num
    }

    /// Grow the number of variables to `num`.
    ///
    /// New variables are appended below all existing levels.
    pub fn set_var_num(&mut self, num: u32) -> Result<(), BddError> {
        if num < 1 || num > MAX_VAR {
            return Err(BddError::TooManyVariables(num));
        }
        if num < self.var_num {
            return Err(BddError::DecreasingVarCount {
                current: self.var_num,
                requested: num,
            });
        }
        if num == self.var_num {
            return Ok(());
        }
        debug!("set_var_num(num = {}) from {}", num, self.var_num);

        self.auto.disable();
        let result = self.add_literals(num);
        self.auto.enable();
        self.refstack.clear();

        // Keep whatever was added before a failure consistent.
        self.store.set_terminal_level(self.var_num);
        // Counts depend on the terminal level.
        self.caches.count.clear();
        let by_level = self.literals_by_level();
        self.pairs.extend(&by_level);
        result
    }

    fn add_literals(&mut self, num: u32) -> Result<(), BddError> {
        self.refstack.clear();
        for var in self.var_num..num {
            let pos = self.mk(var, Ref::ZERO, Ref::ONE).map_err(into_error)?;
            self.refstack.push(pos);
            let neg = self.mk(var, Ref::ONE, Ref::ZERO).map_err(into_error)?;
            self.refstack.pop();
            self.literals.push((pos, neg));
            self.var2level.push(var);
            self.level2var.push(var);
            self.var_num += 1;
        }
        Ok(())
    }

    /// Add `extra` variables, returning the index of the first new one.
    pub fn ext_var_num(&mut self, extra: u32) -> Result<u32, BddError> {
        let first = self.var_num;
        let num = first.checked_add(extra).ok_or(BddError::TooManyVariables(u32::MAX))?;
        self.set_var_num(num)?;
        Ok(first)
    }

    pub(crate) fn check_var(&self, var: u32) -> Result<(), BddError> {
        if var < self.var_num {
            Ok(())
        } else {
            Err(BddError::UnknownVariable(var))
        }
    }

    /// The function `x_var`.
    pub fn ith_var(&self, var: u32) -> Result<Ref, BddError> {
        self.check_var(var)?;
        Ok(self.literals[var as usize].0)
    }

    /// The function `NOT x_var`.
    pub fn nith_var(&self, var: u32) -> Result<Ref, BddError> {
        self.check_var(var)?;
        Ok(self.literals[var as usize].1)
    }

    pub fn var_to_level(&self, var: u32) -> Result<Level, BddError> {
        self.check_var(var)?;
        Ok(Level::new(self.var2level[var as usize]))
    }

    pub fn level_to_var(&self, level: Level) -> Result<Var, BddError> {
        if level.get() >= self.var_num {
            return Err(BddError::UnknownVariable(level.get()));
        }
        Ok(Var::new(self.level2var[level.index()]))
    }

    /// Variables from the top level to the bottom level.
    pub fn current_order(&self) -> Vec<Var> {
        self.level2var.iter().map(|&v| Var::new(v)).collect()
    }

    // ---------------------------------------------------------------------
    // Node access

    pub(crate) fn check_node(&self, node: Ref) -> Result<(), BddError> {
        if node.index() < self.store.capacity() && self.store.is_live(node) {
            Ok(())
        } else {
            Err(BddError::IllegalNode(node))
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node.is_zero()
    }

    pub fn is_one(&self, node: Ref) -> bool {
        node.is_one()
    }

    pub fn is_terminal(&self, node: Ref) -> bool {
        node.is_terminal()
    }

    #[inline]
    pub(crate) fn level(&self, node: Ref) -> u32 {
        self.store.level(node)
    }

    #[inline]
    pub(crate) fn lo(&self, node: Ref) -> Ref {
        self.store.low(node)
    }

    #[inline]
    pub(crate) fn hi(&self, node: Ref) -> Ref {
        self.store.high(node)
    }

    /// Level of `node`; terminals sit at the level equal to the variable count.
    pub fn level_of(&self, node: Ref) -> Result<Level, BddError> {
        self.check_node(node)?;
        Ok(Level::new(self.level(node)))
    }

    /// Decision variable of a non-terminal `node`.
    pub fn var_of(&self, node: Ref) -> Result<Var, BddError> {
        self.check_node(node)?;
        if node.is_terminal() {
            return Err(BddError::IllegalNode(node));
        }
        Ok(Var::new(self.level2var[self.level(node) as usize]))
    }

    pub fn low(&self, node: Ref) -> Result<Ref, BddError> {
        self.check_node(node)?;
        if node.is_terminal() {
            return Err(BddError::IllegalNode(node));
        }
        Ok(self.lo(node))
    }

    pub fn high(&self, node: Ref) -> Result<Ref, BddError> {
        self.check_node(node)?;
        if node.is_terminal() {
            return Err(BddError::IllegalNode(node));
        }
        Ok(self.hi(node))
    }

    // ---------------------------------------------------------------------
    // Roots

    /// Keep `node` alive across garbage collection and reordering.
    pub fn protect(&mut self, node: Ref) -> Result<Ref, BddError> {
        self.check_node(node)?;
        self.roots.protect(node);
        Ok(node)
    }

    /// Drop one protection of `node`. Returns false if it was not protected.
    pub fn release(&mut self, node: Ref) -> bool {
        self.roots.release(node)
    }

    /// How many times `node` is currently protected. Terminals are never
    /// tracked and report zero.
    pub fn protect_count(&self, node: Ref) -> usize {
        self.roots.count(node)
    }

    // ---------------------------------------------------------------------
    // Node creation

    /// Find or create the node `(level, low, high)`.
    ///
    /// Returns `low` when both children are equal. Children must be live
    /// and lie strictly below `level`.
    pub fn make_node(&mut self, level: Level, low: Ref, high: Ref) -> Result<Ref, BddError> {
        let level = level.get();
        if level >= self.var_num {
            return Err(BddError::UnknownVariable(level));
        }
        for child in [low, high] {
            self.check_node(child)?;
            if self.level(child) <= level {
                return Err(BddError::IllegalNode(child));
            }
        }
        self.auto.disable();
        let result = self.run(&[low, high], |bdd| bdd.mk(level, low, high));
        self.auto.enable();
        result
    }

    /// Hash-consing node constructor used by every operator.
    ///
    /// On exhaustion collects garbage, may signal that a reorder is due, and
    /// grows the store when too little was reclaimed. The children must be
    /// reachable from the protection stack or the operands.
    pub(crate) fn mk(&mut self, level: u32, low: Ref, high: Ref) -> OpResult<Ref> {
        if low == high {
            return Ok(low);
        }
        let key = Node::new(level, low, high);
        let pos = match self.table.find(self.store.nodes(), &key) {
            Probe::Found(id) => return Ok(Ref::new(id)),
            Probe::Vacant(pos) => pos,
        };
        if let Some(error) = &self.error {
            return Err(Interrupt::Fail(error.clone()));
        }

        let id = match self.store.alloc(key) {
            Some(id) => {
                self.table.insert_at(pos, id.id());
                id
            }
            None => {
                self.collect();
                if self.store.used_count() >= self.auto.next_threshold && self.reorder_ready() {
                    debug!("mk: {} nodes in use, reorder is due", self.store.used_count());
                    return Err(Interrupt::Reorder);
                }
                if self.store.free_count() * 100 / self.store.capacity() <= self.config.min_free_percent {
                    self.grow();
                }
                match self.store.alloc(key) {
                    Some(id) => {
                        self.table.insert(self.store.nodes(), id.id());
                        id
                    }
                    None => {
                        debug!("mk: node limit reached at {} nodes", self.store.capacity());
                        self.error = Some(BddError::NodeLimit);
                        return Err(Interrupt::Fail(BddError::NodeLimit));
                    }
                }
            }
        };
        self.counters.produced += 1;
        Ok(id)
    }

    /// Build a node from the two results on top of the protection stack.
    pub(crate) fn mk_from_stack(&mut self, level: u32) -> OpResult<Ref> {
        let n = self.refstack.len();
        let (low, high) = (self.refstack[n - 2], self.refstack[n - 1]);
        let res = self.mk(level, low, high)?;
        self.refstack.truncate(n - 2);
        Ok(res)
    }

    #[inline]
    pub(crate) fn push_ref(&mut self, node: Ref) -> Ref {
        self.refstack.push(node);
        node
    }

    #[inline]
    pub(crate) fn pop_refs(&mut self, n: usize) {
        let len = self.refstack.len();
        self.refstack.truncate(len - n);
    }

    /// Grow the store by one step and rehash. Returns false at the ceiling.
    pub(crate) fn grow(&mut self) -> bool {
        let current = self.store.capacity();
        let Some(capacity) = next_capacity(
            current,
            self.config.increase_factor,
            self.config.max_increase,
            self.config.max_nodes,
        ) else {
            return false;
        };
        debug!("grow: {} -> {} nodes", current, capacity);
        self.store.grow(capacity);
        self.rehash();
        self.counters.growths += 1;

        if self.config.cache_ratio > 0 {
            let entries = (capacity / self.config.cache_ratio).max(1);
            let bits = (usize::BITS - 1 - entries.leading_zeros()) as usize;
            let bits = bits.min(31);
            if bits != self.caches.bits() {
                debug!("grow: cache resized to 2^{} entries", bits);
                self.caches.resize(bits);
            }
        }
        true
    }

    /// Rebuild the unique table from every live node.
    pub(crate) fn rehash(&mut self) {
        self.table.reset(self.store.capacity());
        let ids: Vec<Ref> = self.store.live_ids().collect();
        for id in ids {
            self.table.insert(self.store.nodes(), id.id());
        }
    }

    // ---------------------------------------------------------------------
    // Top-level dispatch

    /// Run a top-level operator call.
    ///
    /// The operands stay protected for the whole call. If the call is
    /// interrupted because a reorder is due, the reorder runs and the call
    /// is restarted from scratch once, with reordering disabled.
    pub(crate) fn run(
        &mut self,
        operands: &[Ref],
        mut op: impl FnMut(&mut Self) -> OpResult<Ref>,
    ) -> Result<Ref, BddError> {
        for &node in operands {
            self.check_node(node)?;
        }
        match self.attempt(operands, &mut op) {
            Ok(res) => Ok(res),
            Err(Interrupt::Fail(error)) => Err(error),
            Err(Interrupt::Reorder) => {
                self.check_reorder(operands);
                self.auto.disable();
                let retry = self.attempt(operands, &mut op);
                self.auto.enable();
                match retry {
                    Ok(res) => Ok(res),
                    Err(Interrupt::Fail(error)) => Err(error),
                    Err(Interrupt::Reorder) => unreachable!("reordering is disabled while retrying"),
                }
            }
        }
    }

    fn attempt(&mut self, operands: &[Ref], op: &mut impl FnMut(&mut Self) -> OpResult<Ref>) -> OpResult<Ref> {
        self.refstack.clear();
        self.operands.clear();
        self.operands.extend_from_slice(operands);
        let result = op(self);
        self.refstack.clear();
        self.operands.clear();
        result
    }

    // ---------------------------------------------------------------------
    // Configuration setters

    /// Set the hard ceiling on node slots (`0` for none). Returns the old one.
    pub fn set_max_nodes(&mut self, max_nodes: usize) -> Result<usize, BddError> {
        if max_nodes != 0 && max_nodes <= self.store.capacity() {
            return Err(BddError::InvalidConfig("node limit must exceed the current capacity"));
        }
        Ok(std::mem::replace(&mut self.config.max_nodes, max_nodes))
    }

    pub fn set_max_increase(&mut self, max_increase: usize) -> usize {
        std::mem::replace(&mut self.config.max_increase, max_increase)
    }

    pub fn set_increase_factor(&mut self, factor: f64) -> Result<f64, BddError> {
        check_increase_factor(factor)?;
        Ok(std::mem::replace(&mut self.config.increase_factor, factor))
    }

    pub fn set_min_free_percent(&mut self, percent: usize) -> Result<usize, BddError> {
        check_min_free(percent)?;
        Ok(std::mem::replace(&mut self.config.min_free_percent, percent))
    }

    pub fn set_cache_ratio(&mut self, ratio: usize) -> usize {
        std::mem::replace(&mut self.config.cache_ratio, ratio)
    }

    pub fn set_cache_policy(&mut self, policy: CachePolicy) -> CachePolicy {
        std::mem::replace(&mut self.config.cache_policy, policy)
    }

    /// Resize every operator cache to `2^bits` entries, dropping their contents.
    pub fn set_cache_bits(&mut self, bits: usize) -> Result<usize, BddError> {
        if bits > 31 {
            return Err(BddError::InvalidConfig("cache bits must be in range 0..=31"));
        }
        let old = self.caches.bits();
        self.caches.resize(bits);
        self.config.cache_bits = bits;
        Ok(old)
    }

    // ---------------------------------------------------------------------
    // Substitution tables

    fn literals_by_level(&self) -> Vec<Ref> {
        self.level2var.iter().map(|&v| self.literals[v as usize].0).collect()
    }

    /// Create an identity substitution table.
    pub fn new_pairing(&mut self) -> PairingId {
        let identity = self.literals_by_level();
        self.pairs.create(identity)
    }

    /// Map variable `old` to variable `new` in `id` (for `replace`).
    pub fn set_pair(&mut self, id: PairingId, old: u32, new: u32) -> Result<(), BddError> {
        self.check_var(old)?;
        self.check_var(new)?;
        let level = self.var2level[old as usize];
        let literal = self.literals[new as usize].0;
        self.pairs.set(id, level, literal);
        Ok(())
    }

    /// Map variable `old` to the function `g` in `id` (for `vec_compose`).
    pub fn set_pair_bdd(&mut self, id: PairingId, old: u32, g: Ref) -> Result<(), BddError> {
        self.check_var(old)?;
        self.check_node(g)?;
        let level = self.var2level[old as usize];
        self.pairs.set(id, level, g);
        Ok(())
    }

    pub fn reset_pairing(&mut self, id: PairingId) {
        let identity = self.literals_by_level();
        self.pairs.reset(id, identity);
    }
}

pub(crate) fn into_error(interrupt: Interrupt) -> BddError {
    match interrupt {
        Interrupt::Fail(error) => error,
        Interrupt::Reorder => unreachable!("reordering is disabled here"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn manager(vars: u32) -> Bdd {
        let mut bdd = Bdd::default();
        bdd.set_var_num(vars).unwrap();
        bdd
    }

    #[test]
    fn test_literals() {
        let bdd = manager(3);
        let x = bdd.ith_var(1).unwrap();
        let nx = bdd.nith_var(1).unwrap();
        assert_eq!(bdd.low(x).unwrap(), Ref::ZERO);
        assert_eq!(bdd.high(x).unwrap(), Ref::ONE);
        assert_eq!(bdd.low(nx).unwrap(), Ref::ONE);
        assert_eq!(bdd.var_of(x).unwrap(), Var::new(1));
        assert_eq!(bdd.level_of(x).unwrap(), Level::new(1));
        assert_eq!(bdd.level_of(Ref::ONE).unwrap(), Level::new(3));
        assert_eq!(bdd.ith_var(3), Err(BddError::UnknownVariable(3)));
    }

    #[test]
    fn test_set_var_num() {
        let mut bdd = manager(2);
        assert_eq!(
            bdd.set_var_num(1),
            Err(BddError::DecreasingVarCount { current: 2, requested: 1 })
        );
        assert!(bdd.set_var_num(MAX_VAR + 1).is_err());
        assert_eq!(bdd.ext_var_num(3).unwrap(), 2);
        assert_eq!(bdd.var_num(), 5);
        assert_eq!(bdd.level_of(Ref::ZERO).unwrap(), Level::new(5));
        assert_eq!(bdd.current_order().len(), 5);
    }

    #[test]
    fn test_make_node_dedup() {
        let mut bdd = manager(2);
        let y = bdd.ith_var(1).unwrap();
        let a = bdd.make_node(Level::new(0), Ref::ZERO, y).unwrap();
        let b = bdd.make_node(Level::new(0), Ref::ZERO, y).unwrap();
        assert_eq!(a, b);
        // Equal children collapse.
        assert_eq!(bdd.make_node(Level::new(0), y, y).unwrap(), y);
        // Children must lie below the node.
        assert_eq!(bdd.make_node(Level::new(1), a, Ref::ONE), Err(BddError::IllegalNode(a)));
    }

    #[test]
    fn test_illegal_node() {
        let bdd = manager(1);
        assert_eq!(bdd.low(Ref::new(1000)), Err(BddError::IllegalNode(Ref::new(1000))));
        assert_eq!(bdd.low(Ref::new(60)), Err(BddError::IllegalNode(Ref::new(60))));
    }

    #[test]
    fn test_setters_validate() {
        let mut bdd = Bdd::with_config(BddConfig::default().with_node_capacity(100)).unwrap();
        assert!(bdd.set_max_nodes(50).is_err());
        assert_eq!(bdd.set_max_nodes(1000).unwrap(), 0);
        assert!(bdd.set_min_free_percent(150).is_err());
        assert_eq!(bdd.set_min_free_percent(30).unwrap(), 20);
        assert!(bdd.set_increase_factor(f64::NAN).is_err());
        assert_eq!(bdd.set_cache_bits(8).unwrap(), 14);
        assert!(Bdd::with_config(BddConfig::default().with_node_capacity(1)).is_err());
    }

    #[test]
    fn test_node_limit_is_sticky() {
        let config = BddConfig::default().with_node_capacity(16).with_max_nodes(16);
        let mut bdd = Bdd::with_config(config).unwrap();
        // Sixteen slots hold the terminals and seven variables' literals.
        assert!(bdd.set_var_num(7).is_ok());
        assert_eq!(bdd.set_var_num(8), Err(BddError::NodeLimit));
        assert_eq!(bdd.error(), Some(&BddError::NodeLimit));
        assert_eq!(bdd.var_num(), 7);
        bdd.clear_error();
        assert_eq!(bdd.error(), None);
    }

    #[test]
    fn test_protect_count() {
        let mut bdd = manager(2);
        let a = bdd.ith_var(0).unwrap();
        let b = bdd.ith_var(1).unwrap();
        let f = bdd.apply_or(a, b).unwrap();
        assert_eq!(bdd.protect_count(f), 0);
        bdd.protect(f).unwrap();
        bdd.protect(f).unwrap();
        assert_eq!(bdd.protect_count(f), 2);
        assert!(bdd.release(f));
        assert_eq!(bdd.protect_count(f), 1);
        assert!(bdd.release(f));
        assert!(!bdd.release(f));
        bdd.protect(Ref::ONE).unwrap();
        assert_eq!(bdd.protect_count(Ref::ONE), 0);
    }
}

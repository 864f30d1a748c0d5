//! The node store: an arena of node records indexed by [`Ref`] ids.

use crate::alloc::FreeSlots;
use crate::bitset::BitSet;
use crate::node::Node;
use crate::reference::Ref;

pub struct NodeStore {
    nodes: Vec<Node>,
    slots: FreeSlots,
    marks: BitSet,
}

impl NodeStore {
    /// Create a store of `capacity` slots with both terminals in place.
    pub fn new(capacity: usize, terminal_level: u32) -> Self {
        let mut store = Self {
            nodes: vec![Node::FREE; capacity],
            slots: FreeSlots::new(capacity),
            marks: BitSet::new(capacity),
        };
        for terminal in [Ref::ZERO, Ref::ONE] {
            store.slots.claim(terminal.id());
            store.nodes[terminal.index()] = Node::new(terminal_level, terminal, terminal);
        }
        store
    }

    #[inline]
    pub fn node(&self, id: Ref) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: Ref) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub fn level(&self, id: Ref) -> u32 {
        self.nodes[id.index()].level
    }

    #[inline]
    pub fn low(&self, id: Ref) -> Ref {
        self.nodes[id.index()].low
    }

    #[inline]
    pub fn high(&self, id: Ref) -> Ref {
        self.nodes[id.index()].high
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn free_count(&self) -> usize {
        self.slots.free_count()
    }

    pub fn used_count(&self) -> usize {
        self.slots.used_count()
    }

    /// Whether `id` names a slot currently holding a node.
    pub fn is_live(&self, id: Ref) -> bool {
        self.slots.is_used(id.id())
    }

    /// Ids of every non-terminal node in the store.
    pub fn live_ids(&self) -> impl Iterator<Item = Ref> + '_ {
        (2..self.nodes.len() as u32)
            .map(Ref::new)
            .filter(|&id| self.slots.is_used(id.id()))
    }

    pub fn set_terminal_level(&mut self, level: u32) {
        self.nodes[0].level = level;
        self.nodes[1].level = level;
    }

    /// Write `node` into a free slot.
    pub fn alloc(&mut self, node: Node) -> Option<Ref> {
        let id = self.slots.alloc()?;
        self.nodes[id as usize] = node;
        Some(Ref::new(id))
    }

    /// Clear slot `id` and return it to the allocator.
    pub fn free(&mut self, id: Ref) {
        debug_assert!(!id.is_terminal());
        self.nodes[id.index()] = Node::FREE;
        self.slots.release(id.id());
    }

    pub fn grow(&mut self, capacity: usize) {
        if capacity > self.nodes.len() {
            self.nodes.resize(capacity, Node::FREE);
            self.slots.grow(capacity);
            self.marks.reserve(capacity);
        }
    }

    /// Set the mark bit of `id`. Returns true if it was not yet marked.
    #[inline]
    pub fn mark(&mut self, id: Ref) -> bool {
        self.marks.insert(id.index())
    }

    #[inline]
    pub fn is_marked(&self, id: Ref) -> bool {
        self.marks.contains(id.index())
    }

    pub fn clear_marks(&mut self) {
        self.marks.clear();
    }
}

/// Capacity after one growth step, or `None` if no growth is possible.
pub fn next_capacity(current: usize, increase_factor: f64, max_increase: usize, max_nodes: usize) -> Option<usize> {
    let mut next = if increase_factor > 0.0 {
        current + (current as f64 * increase_factor) as usize
    } else {
        current * 2
    };
    if max_increase > 0 {
        next = next.min(current + max_increase);
    }
    if max_nodes > 0 {
        next = next.min(max_nodes);
    }
    next = next.min(u32::MAX as usize - 1);
    (next > current).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminals_reserved() {
        let mut store = NodeStore::new(8, 0);
        assert_eq!(store.used_count(), 2);
        assert!(store.is_live(Ref::ZERO));
        assert!(store.is_live(Ref::ONE));
        assert_eq!(store.low(Ref::ONE), Ref::ONE);
        let id = store.alloc(Node::new(0, Ref::ZERO, Ref::ONE)).unwrap();
        assert_eq!(id, Ref::new(2));
        assert_eq!(store.live_ids().collect::<Vec<_>>(), vec![id]);
        store.free(id);
        assert!(!store.is_live(id));
        assert!(store.node(id).is_free());
    }

    #[test]
    fn test_grow() {
        let mut store = NodeStore::new(4, 0);
        store.alloc(Node::new(0, Ref::ZERO, Ref::ONE)).unwrap();
        store.alloc(Node::new(0, Ref::ONE, Ref::ZERO)).unwrap();
        assert!(store.alloc(Node::new(1, Ref::ZERO, Ref::ONE)).is_none());
        store.grow(8);
        assert_eq!(store.free_count(), 4);
        assert!(store.alloc(Node::new(1, Ref::ZERO, Ref::ONE)).is_some());
    }

    #[test]
    fn test_marks() {
        let mut store = NodeStore::new(8, 0);
        assert!(store.mark(Ref::new(3)));
        assert!(!store.mark(Ref::new(3)));
        assert!(store.is_marked(Ref::new(3)));
        store.clear_marks();
        assert!(!store.is_marked(Ref::new(3)));
    }

    #[test]
    fn test_next_capacity() {
        assert_eq!(next_capacity(100, 0.0, 1000, 0), Some(200));
        assert_eq!(next_capacity(100, 0.5, 1000, 0), Some(150));
        assert_eq!(next_capacity(100, 0.0, 30, 0), Some(130));
        assert_eq!(next_capacity(100, 0.0, 0, 0), Some(200));
        assert_eq!(next_capacity(100, 0.0, 1000, 120), Some(120));
        assert_eq!(next_capacity(100, 0.0, 1000, 100), None);
    }
}

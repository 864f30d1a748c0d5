use crate::reference::Ref;
use crate::utils::{hash_secondary, hash_triple};

/// A node record in the node store.
///
/// Outside a reorder session `level` is the node's position in the variable
/// order. While a session is active it holds the node's variable instead, so
/// that swapping two levels only relabels the ordering tables. Free slots
/// carry [`Ref::NONE`] as their low child.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Node {
    pub level: u32,
    pub low: Ref,
    pub high: Ref,
}

impl Node {
    pub const FREE: Node = Node {
        level: 0,
        low: Ref::NONE,
        high: Ref::NONE,
    };

    pub const fn new(level: u32, low: Ref, high: Ref) -> Self {
        Self { level, low, high }
    }

    pub const fn is_free(&self) -> bool {
        self.low.id() == Ref::NONE.id()
    }

    pub fn hash(&self) -> u64 {
        hash_triple(self.level, self.low.id(), self.high.id())
    }

    pub fn probe_step(&self) -> u64 {
        hash_secondary(self.level, self.low.id(), self.high.id())
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::FREE
    }
}

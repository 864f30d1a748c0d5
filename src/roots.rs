//! Registry of externally held nodes.
//!
//! Garbage collection and reorder sessions keep exactly the nodes reachable
//! from this registry (plus the operands of the call in progress). A node
//! may be protected several times; it stays a root until released as many
//! times.

use std::collections::HashMap;

use crate::reference::Ref;

#[derive(Debug, Default, Clone)]
pub struct Roots {
    counts: HashMap<Ref, usize>,
}

impl Roots {
    pub fn protect(&mut self, node: Ref) {
        if !node.is_terminal() {
            *self.counts.entry(node).or_insert(0) += 1;
        }
    }

    /// Drop one protection of `node`. Returns false if it was not protected.
    pub fn release(&mut self, node: Ref) -> bool {
        match self.counts.get_mut(&node) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.counts.remove(&node);
                true
            }
            None => false,
        }
    }

    pub fn count(&self, node: Ref) -> usize {
        self.counts.get(&node).copied().unwrap_or(0)
    }

    /// Distinct protected nodes.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Each protected node together with its protection count.
    pub fn iter(&self) -> impl Iterator<Item = (Ref, usize)> + '_ {
        self.counts.iter().map(|(&node, &count)| (node, count))
    }
}

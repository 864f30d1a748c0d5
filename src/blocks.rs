//! Variable blocks: groups of variables that reordering moves as a unit.
//!
//! Blocks are ranges `first..=last` of variable indices, nested into a tree.
//! A block's variables must be adjacent in the current order when the block
//! is added; reordering keeps them adjacent. The children of a block may be
//! permuted among themselves unless the block is fixed. A block without
//! children is atomic: its internal order never changes.

use crate::error::BddError;

/// A configured variable block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBlock {
    pub first: u32,
    pub last: u32,
    pub fixed: bool,
    pub children: Vec<VarBlock>,
}

impl VarBlock {
    fn new(first: u32, last: u32, fixed: bool) -> Self {
        Self {
            first,
            last,
            fixed,
            children: Vec::new(),
        }
    }

    fn overlaps(&self, first: u32, last: u32) -> bool {
        self.first <= last && first <= self.last
    }
}

/// The forest of configured blocks, siblings sorted by first variable.
#[derive(Debug, Clone, Default)]
pub struct VarTree {
    blocks: Vec<VarBlock>,
}

impl VarTree {
    pub fn blocks(&self) -> &[VarBlock] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Insert the block `first..=last`.
    ///
    /// Adding an existing block is a no-op. A range inside a block becomes
    /// its descendant; a range covering whole blocks becomes their parent.
    /// Partial overlap is rejected.
    pub fn add(&mut self, first: u32, last: u32, fixed: bool) -> Result<(), BddError> {
        if first > last {
            return Err(BddError::IllegalVarBlock { first, last });
        }
        add_range(&mut self.blocks, first, last, fixed)
    }
}

fn add_range(list: &mut Vec<VarBlock>, first: u32, last: u32, fixed: bool) -> Result<(), BddError> {
    if list.iter().any(|b| b.first == first && b.last == last) {
        return Ok(());
    }
    if let Some(parent) = list.iter_mut().find(|b| b.first <= first && last <= b.last) {
        return add_range(&mut parent.children, first, last, fixed);
    }
    if list
        .iter()
        .any(|b| b.overlaps(first, last) && !(first <= b.first && b.last <= last))
    {
        return Err(BddError::IllegalVarBlock { first, last });
    }

    let (covered, mut rest): (Vec<VarBlock>, Vec<VarBlock>) = list.drain(..).partition(|b| b.overlaps(first, last));
    let mut block = VarBlock::new(first, last, fixed);
    block.children = covered;
    rest.push(block);
    rest.sort_by_key(|b| b.first);
    *list = rest;
    Ok(())
}

/// A block laid out against the current order, used during one reorder session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
    /// Member variables from top level to bottom level.
    pub vars: Vec<u32>,
    pub fixed: bool,
    pub children: Vec<Block>,
}

impl Block {
    /// Recompute `vars` from the children after they were permuted.
    pub fn refresh(&mut self) {
        if !self.children.is_empty() {
            self.vars = self.children.iter().flat_map(|c| c.vars.iter().copied()).collect();
        }
    }
}

/// Lay out `tree` against the current order.
///
/// The returned root spans every variable and is free. Variables not covered
/// by a configured sibling become free singleton blocks, so without any
/// configured blocks each variable moves on its own.
pub(crate) fn layout(tree: &VarTree, level2var: &[u32], var2level: &[u32]) -> Block {
    let num = var2level.len() as u32;
    Block {
        vars: level2var[..num as usize].to_vec(),
        fixed: false,
        children: layout_levels(0, num, tree.blocks(), level2var, var2level),
    }
}

fn layout_levels(from: u32, to: u32, configured: &[VarBlock], level2var: &[u32], var2level: &[u32]) -> Vec<Block> {
    let mut spans: Vec<(u32, u32, &VarBlock)> = configured
        .iter()
        .map(|b| {
            let levels = (b.first..=b.last).map(|v| var2level[v as usize]);
            let top = levels.clone().min().unwrap_or(from);
            let bottom = levels.max().unwrap_or(from);
            (top, bottom, b)
        })
        .collect();
    spans.sort_by_key(|&(top, _, _)| top);

    let mut result = Vec::new();
    let mut spans = spans.into_iter().peekable();
    let mut level = from;
    while level < to {
        match spans.peek() {
            Some(&(top, bottom, b)) if top == level => {
                let children = if b.children.is_empty() {
                    Vec::new()
                } else {
                    layout_levels(top, bottom + 1, &b.children, level2var, var2level)
                };
                result.push(Block {
                    vars: level2var[top as usize..=bottom as usize].to_vec(),
                    fixed: b.fixed,
                    children,
                });
                spans.next();
                level = bottom + 1;
            }
            _ => {
                result.push(Block {
                    vars: vec![level2var[level as usize]],
                    fixed: false,
                    children: Vec::new(),
                });
                level += 1;
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_nested_and_covering() {
        let mut tree = VarTree::default();
        tree.add(2, 3, false).unwrap();
        tree.add(0, 0, true).unwrap();
        tree.add(2, 2, false).unwrap(); // inside 2..=3
        tree.add(0, 5, false).unwrap(); // covers both
        tree.add(0, 5, true).unwrap(); // identity, no-op

        let blocks = tree.blocks();
        assert_eq!(blocks.len(), 1);
        let top = &blocks[0];
        assert_eq!((top.first, top.last, top.fixed), (0, 5, false));
        assert_eq!(top.children.len(), 2);
        assert_eq!(top.children[0].first, 0);
        assert_eq!(top.children[1].children[0], VarBlock::new(2, 2, false));
    }

    #[test]
    fn test_partial_overlap_rejected() {
        let mut tree = VarTree::default();
        tree.add(1, 3, false).unwrap();
        assert_eq!(tree.add(2, 5, false), Err(BddError::IllegalVarBlock { first: 2, last: 5 }));
        assert!(tree.add(3, 1, false).is_err());
    }

    #[test]
    fn test_layout_fills_gaps() {
        let mut tree = VarTree::default();
        tree.add(1, 2, true).unwrap();
        // Identity order over four variables.
        let order = [0, 1, 2, 3];
        let root = layout(&tree, &order, &order);
        assert_eq!(root.vars, vec![0, 1, 2, 3]);
        let shapes: Vec<(Vec<u32>, bool)> = root.children.iter().map(|b| (b.vars.clone(), b.fixed)).collect();
        assert_eq!(
            shapes,
            vec![(vec![0], false), (vec![1, 2], true), (vec![3], false)]
        );
    }

    #[test]
    fn test_layout_follows_current_order() {
        let tree = VarTree::default();
        let level2var = [2, 0, 1];
        let var2level = [1, 2, 0];
        let mut root = layout(&tree, &level2var, &var2level);
        assert_eq!(root.children[0].vars, vec![2]);
        root.children.swap(0, 2);
        root.refresh();
        assert_eq!(root.vars, vec![1, 0, 2]);
    }
}

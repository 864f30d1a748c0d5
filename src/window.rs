//! Window permutation over adjacent blocks.
//!
//! A window of two blocks tries both orders. A window of three blocks walks
//! all six permutations with five adjacent block swaps and settles on the
//! smallest one seen.

use log::debug;

use crate::blocks::Block;
use crate::error::BddError;
use crate::reorder::ReorderSession;

/// Positions (relative to the window start) swapped in turn to visit every
/// permutation of three blocks: `abc acb cab cba bca bac`.
const WIN3_STEPS: [usize; 5] = [1, 0, 1, 0, 1];

impl ReorderSession<'_> {
    /// One pass of pairwise window permutation.
    pub(crate) fn win2(&mut self, blocks: &mut [Block]) -> Result<(), BddError> {
        for i in 0..blocks.len().saturating_sub(1) {
            let best = self.size();
            self.blockdown(blocks, i)?;
            if self.size() > best {
                self.blockdown(blocks, i)?;
            }
        }
        debug!("win2: {} nodes", self.size());
        Ok(())
    }

    /// Repeat [`win2`](Self::win2) until a pass leaves the size unchanged.
    pub(crate) fn win2_ite(&mut self, blocks: &mut [Block]) -> Result<(), BddError> {
        loop {
            let before = self.size();
            self.win2(blocks)?;
            if self.size() == before {
                return Ok(());
            }
        }
    }

    /// One pass of three-block window permutation.
    pub(crate) fn win3(&mut self, blocks: &mut [Block]) -> Result<(), BddError> {
        if blocks.len() < 3 {
            return self.win2(blocks);
        }
        for i in 0..blocks.len() - 2 {
            self.win3_at(blocks, i)?;
        }
        debug!("win3: {} nodes", self.size());
        Ok(())
    }

    /// Repeat [`win3`](Self::win3) until a pass leaves the size unchanged.
    pub(crate) fn win3_ite(&mut self, blocks: &mut [Block]) -> Result<(), BddError> {
        loop {
            let before = self.size();
            self.win3(blocks)?;
            if self.size() == before {
                return Ok(());
            }
        }
    }

    /// Try every permutation of `blocks[i..i + 3]` and keep the smallest.
    fn win3_at(&mut self, blocks: &mut [Block], i: usize) -> Result<(), BddError> {
        let mut best = self.size();
        // Number of steps taken when the best size was seen.
        let mut best_step = 0;
        for (step, &offset) in WIN3_STEPS.iter().enumerate() {
            self.blockdown(blocks, i + offset)?;
            let size = self.size();
            if size < best {
                best = size;
                best_step = step + 1;
            }
        }
        // Adjacent swaps are their own inverse: replay the tail backwards.
        for &offset in WIN3_STEPS[best_step..].iter().rev() {
            self.blockdown(blocks, i + offset)?;
        }
        Ok(())
    }
}

//! Rudell's sifting over blocks.
//!
//! Each block is moved through every position among its siblings and left
//! at the one where the graph was smallest. Blocks holding the most nodes go
//! first. A block heads first towards the nearer end of the order; a
//! direction is abandoned as soon as the graph outgrows the best size seen
//! by more than a fifth.

use log::debug;

use crate::blocks::Block;
use crate::error::BddError;
use crate::reorder::ReorderSession;

impl ReorderSession<'_> {
    /// Sift every block of `blocks` once.
    pub(crate) fn sift(&mut self, blocks: &mut [Block]) -> Result<(), BddError> {
        // Blocks are tracked by their first variable: positions change as we go.
        let mut order: Vec<(usize, u32)> = blocks
            .iter()
            .map(|b| (b.vars.iter().map(|&v| self.var_size(v)).sum(), b.vars[0]))
            .collect();
        order.sort_by(|a, b| b.0.cmp(&a.0));

        for (nodes, key) in order {
            debug!("sift: block of x{} ({} nodes)", key, nodes);
            self.sift_block(blocks, key)?;
        }
        debug!("sift: {} nodes", self.size());
        Ok(())
    }

    /// Repeat [`sift`](Self::sift) until a pass leaves the size unchanged.
    pub(crate) fn sift_ite(&mut self, blocks: &mut [Block]) -> Result<(), BddError> {
        loop {
            let before = self.size();
            self.sift(blocks)?;
            if self.size() == before {
                return Ok(());
            }
        }
    }

    fn sift_block(&mut self, blocks: &mut [Block], key: u32) -> Result<(), BddError> {
        let Some(mut pos) = blocks.iter().position(|b| b.vars[0] == key) else {
            return Ok(());
        };
        let len = blocks.len();
        let mut best = self.size();
        let mut best_pos = pos;
        let mut max_allowed = self.max_allowed(best);

        let up_first = pos <= len / 2;
        for up in [up_first, !up_first] {
            loop {
                if up {
                    if pos == 0 {
                        break;
                    }
                    self.blockdown(blocks, pos - 1)?;
                    pos -= 1;
                } else {
                    if pos + 1 >= len {
                        break;
                    }
                    self.blockdown(blocks, pos)?;
                    pos += 1;
                }

                let size = self.size();
                if size < best {
                    best = size;
                    best_pos = pos;
                    max_allowed = self.max_allowed(best);
                }
                if size > max_allowed {
                    break;
                }
            }
        }

        while pos > best_pos {
            self.blockdown(blocks, pos - 1)?;
            pos -= 1;
        }
        while pos < best_pos {
            self.blockdown(blocks, pos)?;
            pos += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::bdd::Bdd;
    use crate::config::BddConfig;
    use crate::error::BddError;
    use crate::reference::Ref;
    use crate::reorder::ReorderMethod;

    /// `x0 & x3 | x1 & x4 | x2 & x5` under the identity order.
    fn separated_pairs(bdd: &mut Bdd) -> Ref {
        bdd.set_var_num(6).unwrap();
        let v: Vec<Ref> = (0..6).map(|i| bdd.ith_var(i).unwrap()).collect();
        let mut f = Ref::ZERO;
        for i in 0..3 {
            let t = bdd.apply_and(v[i], v[i + 3]).unwrap();
            f = bdd.apply_or(f, t).unwrap();
        }
        bdd.protect(f).unwrap()
    }

    #[test]
    fn test_sift_shrinks_separated_pairs() {
        let mut bdd = Bdd::default();
        let f = separated_pairs(&mut bdd);
        let stats = bdd.reorder(ReorderMethod::Sift).unwrap();
        assert!(stats.final_size < stats.initial_size);
        assert!(bdd.node_count(f).unwrap() < 14);
        assert_eq!(bdd.sat_count(f).unwrap(), 37.0);
        bdd.validate_all().unwrap();
    }

    #[test]
    fn test_sift_ite_reaches_fixpoint() {
        let mut bdd = Bdd::default();
        let f = separated_pairs(&mut bdd);
        bdd.reorder(ReorderMethod::SiftIte).unwrap();
        let order = bdd.current_order();
        // Another pass finds nothing to improve.
        let stats = bdd.reorder(ReorderMethod::Sift).unwrap();
        assert_eq!(stats.final_size, stats.initial_size);
        assert_eq!(bdd.current_order(), order);
        assert_eq!(bdd.sat_count(f).unwrap(), 37.0);
    }

    #[test]
    fn test_sift_under_node_limit() {
        let config = BddConfig::default().with_node_capacity(64).with_max_nodes(64);
        let mut bdd = Bdd::with_config(config).unwrap();
        let f = separated_pairs(&mut bdd);
        // Either the session fits, or it stops with the sticky limit and the
        // graph stays intact.
        match bdd.reorder(ReorderMethod::Sift) {
            Ok(_) => assert!(bdd.error().is_none()),
            Err(error) => {
                assert_eq!(error, BddError::NodeLimit);
                assert_eq!(bdd.error(), Some(&BddError::NodeLimit));
                bdd.clear_error();
            }
        }
        assert_eq!(bdd.sat_count(f).unwrap(), 37.0);
        bdd.validate_all().unwrap();
    }
}

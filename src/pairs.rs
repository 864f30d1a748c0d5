//! Substitution pair tables used by `replace` and `vec_compose`.
//!
//! A table maps each level to the function substituted for the variable at
//! that level; unmapped levels hold the variable's own literal. Tables are
//! indexed by level, so every adjacent level swap performed by reordering
//! swaps the corresponding entries. Each modification draws a fresh stamp,
//! which keys cache entries and keeps stale results from being reused.

use crate::reference::Ref;

/// Handle to a substitution table owned by a [`Bdd`](crate::bdd::Bdd).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PairingId(usize);

#[derive(Debug, Clone)]
pub(crate) struct Pairing {
    /// Substitute per level.
    pub result: Vec<Ref>,
    /// Deepest level with a non-identity entry.
    pub last: Option<u32>,
    pub stamp: u32,
}

#[derive(Debug, Default)]
pub(crate) struct Pairings {
    tables: Vec<Pairing>,
    next_stamp: u32,
}

impl Pairings {
    fn stamp(&mut self) -> u32 {
        self.next_stamp = self.next_stamp.wrapping_add(1);
        self.next_stamp
    }

    /// Create an identity table; `identity[level]` is the literal at `level`.
    pub fn create(&mut self, identity: Vec<Ref>) -> PairingId {
        let stamp = self.stamp();
        self.tables.push(Pairing {
            result: identity,
            last: None,
            stamp,
        });
        PairingId(self.tables.len() - 1)
    }

    pub fn get(&self, id: PairingId) -> &Pairing {
        &self.tables[id.0]
    }

    pub fn set(&mut self, id: PairingId, level: u32, node: Ref) {
        let stamp = self.stamp();
        let table = &mut self.tables[id.0];
        table.result[level as usize] = node;
        table.last = Some(table.last.map_or(level, |last| last.max(level)));
        table.stamp = stamp;
    }

    pub fn reset(&mut self, id: PairingId, identity: Vec<Ref>) {
        let stamp = self.stamp();
        let table = &mut self.tables[id.0];
        table.result = identity;
        table.last = None;
        table.stamp = stamp;
    }

    /// Append identity entries for newly created levels.
    pub fn extend(&mut self, literals: &[Ref]) {
        for table in &mut self.tables {
            let from = table.result.len();
            table.result.extend_from_slice(&literals[from..]);
        }
    }

    /// Follow an adjacent swap of `level` and `level + 1`.
    pub fn swap_down(&mut self, level: u32) {
        for table in &mut self.tables {
            table.result.swap(level as usize, level as usize + 1);
            if table.last == Some(level) {
                table.last = Some(level + 1);
            }
        }
    }

    /// Every substitute currently stored; these must survive collection.
    pub fn nodes(&self) -> impl Iterator<Item = Ref> + '_ {
        self.tables.iter().flat_map(|table| table.result.iter().copied())
    }
}

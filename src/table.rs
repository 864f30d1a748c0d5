//! Hash-consing tables mapping `(level, low, high)` to node ids.
//!
//! [`UniqueTable`] is the ordinary table used between reorder sessions.
//! [`LevelTable`] partitions the same kind of table into one region per
//! variable for the duration of a reorder session.
//!
//! Both use open addressing over power-of-two slot arrays. The probe step
//! comes from an independent odd hash, so a probe sequence visits every slot
//! of its array before repeating. Slot value `0` means empty: the FALSE
//! terminal is never inserted.

use crate::node::Node;

const EMPTY: u32 = 0;

/// Outcome of probing for a key.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Probe {
    Found(u32),
    Vacant(usize),
}

/// Probes `slots[start..start + size]` for `key`.
fn probe(slots: &[u32], start: usize, size: usize, nodes: &[Node], key: &Node) -> Probe {
    debug_assert!(size.is_power_of_two());
    let mask = size - 1;
    let step = key.probe_step() as usize;
    let mut pos = key.hash() as usize & mask;
    for _ in 0..size {
        let id = slots[start + pos];
        if id == EMPTY {
            return Probe::Vacant(start + pos);
        }
        if nodes[id as usize] == *key {
            return Probe::Found(id);
        }
        pos = pos.wrapping_add(step) & mask;
    }
    panic!("unique table probing exhausted ({} slots, no vacancy)", size)
}

/// Number of slots for a table holding up to `count` entries at half load.
fn slots_for(count: usize) -> usize {
    (count.max(4) * 2).next_power_of_two()
}

pub struct UniqueTable {
    slots: Vec<u32>,
    len: usize,
}

impl UniqueTable {
    /// Create a table able to index `capacity` nodes.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![EMPTY; slots_for(capacity)],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn find(&self, nodes: &[Node], key: &Node) -> Probe {
        probe(&self.slots, 0, self.slots.len(), nodes, key)
    }

    /// Store `id` at a vacancy returned by [`find`](Self::find).
    pub fn insert_at(&mut self, pos: usize, id: u32) {
        debug_assert_eq!(self.slots[pos], EMPTY);
        self.slots[pos] = id;
        self.len += 1;
    }

    /// Index node `id`, which must not already be present.
    pub fn insert(&mut self, nodes: &[Node], id: u32) {
        match self.find(nodes, &nodes[id as usize]) {
            Probe::Vacant(pos) => self.insert_at(pos, id),
            Probe::Found(other) => panic!("duplicate node: {} and {} share a triple", other, id),
        }
    }

    /// Drop every entry, resizing for `capacity` nodes.
    pub fn reset(&mut self, capacity: usize) {
        let size = slots_for(capacity);
        if size != self.slots.len() {
            self.slots = vec![EMPTY; size];
        } else {
            self.slots.fill(EMPTY);
        }
        self.len = 0;
    }
}

/// Hash region of one variable inside a [`LevelTable`].
#[derive(Debug, Copy, Clone, Default)]
struct Region {
    start: usize,
    size: usize,
    count: usize,
}

/// Unique table split into per-variable regions.
///
/// `Node::level` holds the variable while this table is in use.
pub struct LevelTable {
    slots: Vec<u32>,
    regions: Vec<Region>,
}

impl LevelTable {
    /// Lay out regions sized for `counts[var]` nodes each.
    pub fn new(counts: &[usize]) -> Self {
        let mut table = Self {
            slots: Vec::new(),
            regions: Vec::new(),
        };
        table.layout(counts);
        table
    }

    fn layout(&mut self, counts: &[usize]) {
        let mut start = 0;
        self.regions = counts
            .iter()
            .map(|&count| {
                let size = slots_for(count);
                let region = Region { start, size, count: 0 };
                start += size;
                region
            })
            .collect();
        self.slots = vec![EMPTY; start];
    }

    /// Number of nodes indexed for `var`.
    pub fn count(&self, var: u32) -> usize {
        self.regions[var as usize].count
    }

    pub fn find(&self, nodes: &[Node], key: &Node) -> Probe {
        let region = self.regions[key.level as usize];
        probe(&self.slots, region.start, region.size, nodes, key)
    }

    /// Store `id` at a vacancy in its variable's region.
    ///
    /// The vacancy may be invalidated by a relayout, so the caller passes
    /// the node itself and the position is recomputed when needed.
    pub fn insert(&mut self, nodes: &[Node], id: u32) {
        let var = nodes[id as usize].level as usize;
        let region = self.regions[var];
        if (region.count + 1) * 2 > region.size {
            self.relayout(nodes, var);
        }
        match self.find(nodes, &nodes[id as usize]) {
            Probe::Vacant(pos) => {
                self.slots[pos] = id;
                self.regions[var].count += 1;
            }
            Probe::Found(other) => panic!("duplicate node: {} and {} share a triple", other, id),
        }
    }

    /// Empty the region of `var`, returning the ids it held.
    pub fn take(&mut self, var: u32) -> Vec<u32> {
        let region = &mut self.regions[var as usize];
        let cells = &mut self.slots[region.start..region.start + region.size];
        let ids: Vec<u32> = cells.iter().copied().filter(|&id| id != EMPTY).collect();
        cells.fill(EMPTY);
        region.count = 0;
        ids
    }

    /// Rebuild every region, doubling the room of `grow`.
    fn relayout(&mut self, nodes: &[Node], grow: usize) {
        let mut members: Vec<Vec<u32>> = Vec::with_capacity(self.regions.len());
        for var in 0..self.regions.len() {
            members.push(self.take(var as u32));
        }
        let mut counts: Vec<usize> = members.iter().map(Vec::len).collect();
        counts[grow] = (counts[grow] + 1) * 2;
        self.layout(&counts);
        for ids in members {
            for id in ids {
                self.insert(nodes, id);
            }
        }
    }
}

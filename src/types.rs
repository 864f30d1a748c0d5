//! Type-safe wrappers for BDD variables and levels.
//!
//! Variables are stable identities (0-indexed, in creation order), while
//! levels are positions in the current variable order. Reordering changes
//! the mapping between the two, never the variables themselves.

use std::fmt;

/// Hard ceiling on the number of variables a manager can hold.
pub const MAX_VAR: u32 = (1 << 21) - 1;

/// A variable identifier (0-indexed).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    pub const fn new(id: u32) -> Self {
        Var(id)
    }

    /// Returns the raw variable ID as a `u32`.
    pub const fn id(self) -> u32 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl From<u32> for Var {
    fn from(id: u32) -> Self {
        Var(id)
    }
}

impl From<Var> for u32 {
    fn from(var: Var) -> Self {
        var.0
    }
}

/// A level in the variable ordering (0-indexed).
///
/// Level 0 is the topmost level (closest to root). Terminals sit at the
/// level equal to the number of variables.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Level(u32);

impl Level {
    pub const fn new(index: u32) -> Self {
        Level(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the next level down (index + 1).
    pub const fn next(self) -> Self {
        Level(self.0 + 1)
    }

    /// Returns the previous level up (index - 1), or None if at level 0.
    pub fn prev(self) -> Option<Self> {
        if self.0 > 0 {
            Some(Level(self.0 - 1))
        } else {
            None
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl From<u32> for Level {
    fn from(index: u32) -> Self {
        Level(index)
    }
}

impl From<Level> for u32 {
    fn from(level: Level) -> Self {
        level.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_display() {
        assert_eq!(format!("{}", Var::new(3)), "x3");
        assert_eq!(u32::from(Var::new(7)), 7);
    }

    #[test]
    fn test_level_navigation() {
        let level = Level::new(0);
        assert_eq!(level.prev(), None);
        assert_eq!(level.next(), Level::new(1));
        assert_eq!(level.next().prev(), Some(level));
        assert_eq!(format!("{}", Level::new(2)), "L2");
    }
}

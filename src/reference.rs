use std::fmt::{Display, Formatter};

use crate::utils::MyHash;

/// Index of a node in the node store.
///
/// Ids `0` and `1` are the terminals FALSE and TRUE. A reference is only
/// meaningful for the manager that produced it, and only while the node is
/// live: keep it reachable from a protected root across garbage collection.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(u32);

impl Ref {
    pub const ZERO: Ref = Ref(0);
    pub const ONE: Ref = Ref(1);

    /// Placeholder child stored in free slots.
    pub(crate) const NONE: Ref = Ref(u32::MAX);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn from_bool(value: bool) -> Self {
        if value {
            Self::ONE
        } else {
            Self::ZERO
        }
    }

    /// Return the raw node id.
    pub const fn id(self) -> u32 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_one(self) -> bool {
        self.0 == 1
    }

    pub const fn is_terminal(self) -> bool {
        self.0 < 2
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            0 => write!(f, "0"),
            1 => write!(f, "1"),
            id => write!(f, "@{}", id),
        }
    }
}

impl MyHash for Ref {
    fn hash(&self) -> u64 {
        self.0 as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminals() {
        assert!(Ref::ZERO.is_zero());
        assert!(Ref::ONE.is_one());
        assert!(Ref::ZERO.is_terminal());
        assert!(!Ref::new(2).is_terminal());
        assert_eq!(Ref::from_bool(true), Ref::ONE);
        assert_eq!(Ref::from_bool(false), Ref::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Ref::ZERO), "0");
        assert_eq!(format!("{}", Ref::ONE), "1");
        assert_eq!(format!("{}", Ref::new(42)), "@42");
    }
}

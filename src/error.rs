//! Error types

use std::fmt;

use crate::reference::Ref;

/// Errors reported by manager operations.
///
/// Configuration errors leave the manager untouched. [`BddError::NodeLimit`]
/// is sticky: once raised, node creation keeps failing until
/// [`Bdd::clear_error`](crate::bdd::Bdd::clear_error) is called.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BddError {
    /// Variable index is not below the current variable count.
    UnknownVariable(u32),
    /// Node id does not denote a live node.
    IllegalNode(Ref),
    /// Operand expected to be a variable cube is not one.
    IllegalVarSet(Ref),
    /// Attempt to shrink the variable count.
    DecreasingVarCount { current: u32, requested: u32 },
    /// Requested variable count exceeds [`MAX_VAR`](crate::types::MAX_VAR).
    TooManyVariables(u32),
    /// A configuration value is out of its allowed range.
    InvalidConfig(&'static str),
    /// A variable block partially overlaps an existing block.
    IllegalVarBlock { first: u32, last: u32 },
    /// A replacement would place a variable above one already present below it.
    ReplaceConflict,
    /// A requested variable order is not a permutation of all variables.
    InvalidOrder,
    /// Explicit order changes are refused while variable blocks are configured.
    BlocksConfigured,
    /// The node store cannot grow any further.
    NodeLimit,
    /// An invariant of the shared graph is broken.
    Corrupted(String),
}

impl fmt::Display for BddError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BddError::UnknownVariable(var) => write!(f, "unknown variable x{}", var),
            BddError::IllegalNode(node) => write!(f, "illegal node reference {}", node),
            BddError::IllegalVarSet(node) => write!(f, "node {} is not a variable set", node),
            BddError::DecreasingVarCount { current, requested } => {
                write!(f, "cannot decrease variable count from {} to {}", current, requested)
            }
            BddError::TooManyVariables(num) => write!(f, "variable count {} exceeds the supported maximum", num),
            BddError::InvalidConfig(what) => write!(f, "invalid configuration: {}", what),
            BddError::IllegalVarBlock { first, last } => {
                write!(f, "variable block x{}..=x{} partially overlaps another block", first, last)
            }
            BddError::ReplaceConflict => f.write_str("replacement would break the variable order"),
            BddError::InvalidOrder => f.write_str("variable order is not a permutation of all variables"),
            BddError::BlocksConfigured => f.write_str("variable blocks are configured"),
            BddError::NodeLimit => f.write_str("node limit reached"),
            BddError::Corrupted(details) => write!(f, "corrupted node graph: {}", details),
        }
    }
}

impl std::error::Error for BddError {}

impl BddError {
    /// Capacity errors stick until cleared; everything else is reported once.
    pub fn is_sticky(&self) -> bool {
        matches!(self, BddError::NodeLimit)
    }
}

/// Early exit from a recursive operator.
///
/// `Reorder` unwinds the whole top-level call so it can be restarted after a
/// reorder session; it never reaches callers of the public API.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) enum Interrupt {
    Reorder,
    Fail(BddError),
}

impl From<BddError> for Interrupt {
    fn from(error: BddError) -> Self {
        Interrupt::Fail(error)
    }
}

pub(crate) type OpResult<T> = Result<T, Interrupt>;

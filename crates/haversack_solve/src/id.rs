use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arena::ArenaId;

/// The id of an interned string.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

impl ArenaId for StringId {
    fn from_usize(x: usize) -> Self {
        Self(x as u32)
    }

    fn to_usize(self) -> usize {
        self.0 as usize
    }
}

/// The id of an interned dependency expression.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReldepId(u32);

impl ArenaId for ReldepId {
    fn from_usize(x: usize) -> Self {
        Self(x as u32)
    }

    fn to_usize(self) -> usize {
        self.0 as usize
    }
}

/// The id of a repository registered in the pool.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoId(u32);

impl ArenaId for RepoId {
    fn from_usize(x: usize) -> Self {
        Self(x as u32)
    }

    fn to_usize(self) -> usize {
        self.0 as usize
    }
}

/// The id of a solvable. Ids are dense and stable for the lifetime of the
/// owning pool; id 1 is the reserved system solvable, and solvable ids
/// never take the value 0 ("none").
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SolvableId(u32);

impl SolvableId {
    pub(crate) const SYSTEM: SolvableId = SolvableId(1);

    /// The raw integer value of the id.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// True for the reserved system solvable.
    pub fn is_system(self) -> bool {
        self == Self::SYSTEM
    }
}

impl ArenaId for SolvableId {
    fn from_usize(x: usize) -> Self {
        Self(x as u32)
    }

    fn to_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SolvableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SolvableId({})", self.0)
    }
}

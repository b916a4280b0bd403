//! Collaborator contracts for describing what an instruction does to memory.

use crate::memory::MemoryLocation;
use crate::routine::ids::InstId;
use serde::{Deserialize, Serialize};

/// Assurance of a memory access.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum AccessInfo {
    #[default]
    No,
    May,
    Must,
}

impl AccessInfo {
    pub fn is_any(self) -> bool {
        self != AccessInfo::No
    }

    /// Never more certain than `May`.
    pub fn at_most_may(self) -> Self {
        match self {
            AccessInfo::Must => AccessInfo::May,
            other => other,
        }
    }
}

/// One location touched by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAccess {
    pub location: MemoryLocation,
    pub operand: u32,
    pub read: AccessInfo,
    pub write: AccessInfo,
}

impl MemoryAccess {
    /// The address was evaluated but nothing was read or written through it.
    pub fn is_address_only(&self) -> bool {
        !self.read.is_any() && !self.write.is_any()
    }
}

/// Access to memory that couldn't be pinned to any location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UnknownAccess {
    pub read: AccessInfo,
    pub write: AccessInfo,
}

impl UnknownAccess {
    pub fn conservative() -> Self {
        Self {
            read: AccessInfo::May,
            write: AccessInfo::May,
        }
    }
}

/// Everything one instruction does to memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionEffects {
    pub accesses: Vec<MemoryAccess>,
    pub unknown: Option<UnknownAccess>,
}

/// Supplied by the IR layer. Called exactly once per instruction per footprint build.
///
/// Returning `None` means the effect couldn't be resolved at all; the instruction is then
/// treated as an unknown access that may read and may write.
pub trait AccessEnumerator: Sync {
    fn memory_effects(&self, inst: InstId) -> Option<InstructionEffects>;
}

/// Supplied by the escape/address-taken analysis.
pub trait EscapeOracle: Sync {
    /// True if the location may be reached from outside the analysed control flow.
    fn may_escape(&self, location: &MemoryLocation) -> bool;
}

/// Escape oracle for routines where nothing escapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEscapes;

impl EscapeOracle for NoEscapes {
    fn may_escape(&self, _location: &MemoryLocation) -> bool {
        false
    }
}

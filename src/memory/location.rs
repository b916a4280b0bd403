//! Abstract memory locations and the alias collaborator that compares them.
//!
//! A location is a byte range hanging off a base pointer. The engine never decides aliasing
//! on its own: every "could these overlap" question goes through an [`AliasOracle`].

use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fmt;

/// Identity of a base pointer (an `alloca`, a global, a pointer argument).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PointerId(pub u32);

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LocationSize {
    Precise(u64),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MemoryLocation {
    pub base: PointerId,
    pub offset: i64,
    pub size: LocationSize,

    /// Type-based discriminator. Two tagged locations with different tags never alias.
    pub alias_tag: Option<u32>,
}

impl MemoryLocation {
    pub fn new(base: PointerId, offset: i64, size: u64) -> Self {
        Self {
            base,
            offset,
            size: LocationSize::Precise(size),
            alias_tag: None,
        }
    }

    pub fn unknown_size(base: PointerId, offset: i64) -> Self {
        Self {
            base,
            offset,
            size: LocationSize::Unknown,
            alias_tag: None,
        }
    }

    pub fn with_alias_tag(mut self, tag: u32) -> Self {
        self.alias_tag = Some(tag);
        self
    }

    /// Half-open byte range `[offset, end)`. `None` for an end that isn't known, or that
    /// doesn't fit in an `i64`; both reach past every other offset.
    pub fn end(&self) -> Option<i64> {
        match self.size {
            LocationSize::Precise(size) => i64::try_from(size)
                .ok()
                .and_then(|size| self.offset.checked_add(size)),
            LocationSize::Unknown => None,
        }
    }

    /// True if `self` covers every byte of `other` (same base, wider or equal range).
    pub fn covers(&self, other: &MemoryLocation) -> bool {
        if self.base != other.base || self.offset > other.offset {
            return false;
        }

        match (self.end(), other.end()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(self_end), Some(other_end)) => self_end >= other_end,
        }
    }
}

impl fmt::Display for MemoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size {
            LocationSize::Precise(size) => write!(f, "<{}, {}, {}>", self.base, self.offset, size),
            LocationSize::Unknown => write!(f, "<{}, {}, ?>", self.base, self.offset),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasResult {
    NoAlias,
    MayAlias,
    PartialAlias,
    MustAlias,
}

impl AliasResult {
    /// Everything short of a proof of disjointness counts as overlapping.
    pub fn may_overlap(self) -> bool {
        !matches!(self, AliasResult::NoAlias)
    }
}

/// Alias-analysis collaborator. Implementations must be safe to query from several
/// routines' analyses at once.
pub trait AliasOracle: Sync {
    fn alias(&self, lhs: &MemoryLocation, rhs: &MemoryLocation) -> AliasResult;
}

/// Decides aliasing from base identity and byte ranges.
///
/// Locations on the same base overlap when their ranges intersect. Locations on different
/// bases are disjoint unless the pair was registered with [`RangeAliasOracle::add_may_alias`]
/// or one of the bases is marked opaque.
#[derive(Debug, Clone, Default)]
pub struct RangeAliasOracle {
    may_alias_pairs: FxHashSet<(PointerId, PointerId)>,
    opaque_bases: FxHashSet<PointerId>,
}

impl RangeAliasOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_may_alias(&mut self, lhs: PointerId, rhs: PointerId) {
        self.may_alias_pairs.insert((lhs.min(rhs), lhs.max(rhs)));
    }

    /// An opaque base may point anywhere.
    pub fn add_opaque_base(&mut self, base: PointerId) {
        self.opaque_bases.insert(base);
    }
}

impl AliasOracle for RangeAliasOracle {
    fn alias(&self, lhs: &MemoryLocation, rhs: &MemoryLocation) -> AliasResult {
        if let (Some(lhs_tag), Some(rhs_tag)) = (lhs.alias_tag, rhs.alias_tag) {
            if lhs_tag != rhs_tag {
                return AliasResult::NoAlias;
            }
        }

        if lhs.base != rhs.base {
            let key = (lhs.base.min(rhs.base), lhs.base.max(rhs.base));
            if self.may_alias_pairs.contains(&key)
                || self.opaque_bases.contains(&lhs.base)
                || self.opaque_bases.contains(&rhs.base)
            {
                return AliasResult::MayAlias;
            }
            return AliasResult::NoAlias;
        }

        if lhs.offset == rhs.offset && lhs.size == rhs.size {
            return AliasResult::MustAlias;
        }

        let disjoint = match (lhs.end(), rhs.end()) {
            (Some(lhs_end), _) if lhs_end <= rhs.offset => true,
            (_, Some(rhs_end)) if rhs_end <= lhs.offset => true,
            _ => false,
        };

        if disjoint {
            AliasResult::NoAlias
        } else {
            AliasResult::PartialAlias
        }
    }
}

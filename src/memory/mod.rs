pub mod alias_tracker;
pub mod location;
pub mod location_set;

pub use alias_tracker::{AliasSet, AliasSetTracker};
pub use location::{AliasOracle, AliasResult, LocationSize, MemoryLocation, PointerId, RangeAliasOracle};
pub use location_set::{LocationLattice, LocationSet};

#[cfg(test)]
mod tests;

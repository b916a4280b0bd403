pub mod access;
pub mod ids;
pub mod region_tree;

pub use access::{
    AccessEnumerator, AccessInfo, EscapeOracle, InstructionEffects, MemoryAccess, NoEscapes,
    UnknownAccess,
};
pub use ids::{InstId, NodeId, RegionId};
pub use region_tree::{DataFlowNode, NodeKind, Region, RegionKind, RegionTree, RegionTreeBuilder};

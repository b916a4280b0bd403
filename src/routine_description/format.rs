//! On-disk shape of a routine description.
//!
//! ```toml
//! [[routine]]
//! name = "scale"
//!
//! [[routine.variable]]
//! name = "x"
//! size = 4
//!
//! [[routine.loop]]
//! name = "body"
//! executes_at_least_once = true
//! live_out = ["x"]
//!
//! [[routine.block]]
//! name = "step"
//! region = "body"
//! instructions = [{ op = "store", target = "x" }]
//!
//! [routine.expect.body]
//! defs = ["x"]
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;

/// Name used in `successors` for the exit of the enclosing region.
pub const EXIT_NODE_NAME: &str = "exit";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptionFile {
    #[serde(default)]
    pub routine: Vec<RoutineDescription>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutineDescription {
    pub name: String,

    /// First node of the routine body. Defaults to the first node declared in it.
    #[serde(default)]
    pub entry: Option<String>,

    #[serde(default)]
    pub variable: Vec<VariableDescription>,

    #[serde(default)]
    pub alias: Vec<AliasDescription>,

    #[serde(default, rename = "loop")]
    pub loops: Vec<LoopDescription>,

    #[serde(default)]
    pub block: Vec<BlockDescription>,

    /// Expected results, keyed by region name (the routine name for its body).
    #[serde(default)]
    pub expect: BTreeMap<String, RegionExpectation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableDescription {
    pub name: String,

    /// Size in bytes. Omitted for storage of unknown extent.
    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub escapes: bool,

    /// Points anywhere. Accesses through it may alias every other variable.
    #[serde(default)]
    pub opaque: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasDescription {
    pub pair: [String; 2],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoopDescription {
    pub name: String,

    /// Enclosing loop. Omitted for loops directly in the routine body.
    #[serde(default)]
    pub parent: Option<String>,

    #[serde(default)]
    pub executes_at_least_once: bool,

    /// Loop header. Defaults to the first node declared in the loop.
    #[serde(default)]
    pub entry: Option<String>,

    /// Nodes of the parent region reached after the loop.
    #[serde(default)]
    pub successors: Vec<String>,

    /// Variables read after the loop finishes.
    #[serde(default)]
    pub live_out: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockDescription {
    pub name: String,

    /// Owning loop. Omitted for blocks in the routine body.
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub successors: Vec<String>,

    #[serde(default)]
    pub instructions: Vec<InstructionDescription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Load,
    Store,
    Update,
    MayLoad,
    MayStore,
    Address,
    Call,
    Opaque,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstructionDescription {
    pub op: OpKind,

    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub offset: i64,

    /// Defaults to the rest of the target variable.
    #[serde(default)]
    pub size: Option<u64>,

    /// Pointer arguments of a call that may be read through.
    #[serde(default)]
    pub reads: Vec<String>,

    /// Pointer arguments of a call that may be written through.
    #[serde(default)]
    pub writes: Vec<String>,

    /// The callee may touch any memory.
    #[serde(default)]
    pub opaque: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionExpectation {
    pub defs: Option<Vec<String>>,
    pub may_defs: Option<Vec<String>>,
    pub uses: Option<Vec<String>>,
    pub must_reach_out: Option<Vec<String>>,
    pub may_reach_out: Option<Vec<String>>,
    pub private: Option<Vec<String>>,
    pub shared: Option<Vec<String>>,
}

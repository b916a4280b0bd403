//! Hierarchical must/may-defined-memory analysis for loop privatization.
//!
//! A routine is handed over as a tree of single-entry/single-exit regions. Each region is
//! solved on its own, then collapsed into one node of its parent's graph, so nested loops
//! are analysed once rather than once per enclosing loop.

pub mod analysis;
pub mod analysis_messages;
pub mod memory;
pub mod routine;
pub mod routine_description;
pub mod settings;

pub mod case_runner;
pub mod cli;

pub use analysis::defined_memory::{
    DefUseSet, DefinedMemoryInfo, DefinitionInfo, RoutineInput, analyze_defined_memory,
    analyze_routines,
};
pub use analysis::privatization::{PrivatizationKind, classify_loop};
pub use analysis_messages::analysis_errors::{AnalysisError, AnalysisMessages, ErrorType};
pub use settings::AnalysisConfig;

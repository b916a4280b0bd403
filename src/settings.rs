use crate::analysis_messages::analysis_errors::AnalysisError;
use crate::return_config_error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "privatize.toml";
pub const DESCRIPTION_FILE_EXTENSION: &str = "toml";

// Rough guess to avoid regrowing the solver maps.
// Loops in real routines rarely have more than a handful of blocks.
pub const NODES_PER_REGION_GUESS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Treat every loop as running at least once, so collapse keeps its must-definitions.
    pub assume_loops_execute: bool,

    /// Never upgrade a write to Must when the written location may have escaped.
    pub downgrade_escaped_writes: bool,

    /// Solve independent routines on the rayon thread pool.
    pub parallel_routines: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            assume_loops_execute: false,
            downgrade_escaped_writes: true,
            parallel_routines: true,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, AnalysisError> {
        match toml::from_str::<AnalysisConfig>(source) {
            Ok(config) => Ok(config),
            Err(e) => return_config_error!(format!("Couldn't parse analysis config: {}", e.message())),
        }
    }

    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                return Err(AnalysisError::file_error(
                    path,
                    format!("Couldn't read config file: {e}"),
                ));
            }
        };

        Self::from_toml_str(&source).map_err(|e| e.with_file_path(path.to_path_buf()))
    }

    /// Loads `path` if given, otherwise `privatize.toml` from `dir` when it exists, otherwise
    /// the defaults.
    pub fn load_or_default(path: Option<&Path>, dir: &Path) -> Result<Self, AnalysisError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let default_path = dir.join(CONFIG_FILE_NAME);
        if default_path.is_file() {
            return Self::load(&default_path);
        }

        Ok(Self::default())
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;

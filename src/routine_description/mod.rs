//! # Routine Descriptions
//!
//! A small TOML format for writing routines by hand: variables, loops, blocks of memory
//! operations, and optionally the results the analysis should reach. Descriptions drive the
//! CLI and the case tests in `tests/cases`.
//!
//! Pipeline: parse → lower to a region tree → analyse every routine → classify every loop → report.

pub mod format;
pub mod lowering;
pub mod names;
pub mod report;

pub use format::DescriptionFile;
pub use lowering::{DescribedRoutine, lower_routine};
pub use names::LocationNames;
pub use report::{RoutineReport, build_report, print_report};

use crate::analysis::defined_memory::{RoutineInput, analyze_routines};
use crate::analysis::privatization::classify_loop;
use crate::analysis_messages::analysis_errors::{
    AnalysisError, AnalysisMessages, ErrorLocation, ErrorMetaDataKey,
};
use crate::settings::AnalysisConfig;
use crate::timer_log;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

pub fn parse_description(source: &str) -> Result<DescriptionFile, AnalysisError> {
    toml::from_str::<DescriptionFile>(source).map_err(|e| {
        AnalysisError::description_error(e.to_string(), ErrorLocation::default())
    })
}

/// Reports of every routine in a description, plus anything worth warning about.
#[derive(Debug, Clone, Default)]
pub struct AnalysedDescription {
    pub reports: Vec<RoutineReport>,
    pub warnings: Vec<String>,
}

impl AnalysedDescription {
    pub fn passed(&self) -> bool {
        self.reports.iter().all(RoutineReport::passed)
    }
}

pub fn analyze_description_file(
    path: &Path,
    config: &AnalysisConfig,
) -> Result<AnalysedDescription, AnalysisMessages> {
    let source = fs::read_to_string(path).map_err(|e| {
        let mut error = AnalysisError::file_error(path, e.to_string());
        error.new_metadata_entry(
            ErrorMetaDataKey::PrimarySuggestion,
            "Check the path points to a readable .toml description",
        );
        AnalysisMessages::from_error(error)
    })?;

    analyze_description(&source, config).map_err(|mut messages| {
        for error in &mut messages.errors {
            error.location.file = Some(path.to_path_buf());
        }
        messages
    })
}

/// Analyses every routine of a description. Routines that fail to lower or analyse are
/// reported as errors; the rest still produce reports.
pub fn analyze_description(
    source: &str,
    config: &AnalysisConfig,
) -> Result<AnalysedDescription, AnalysisMessages> {
    let time = Instant::now();
    let description = parse_description(source).map_err(AnalysisMessages::from_error)?;
    let mut messages = AnalysisMessages::new();

    if description.routine.is_empty() {
        messages
            .warnings
            .push(String::from("Description contains no [[routine]] tables"));
    }

    // ----------------------------------
    //              Lower
    // ----------------------------------
    let mut routines = Vec::with_capacity(description.routine.len());
    for routine in &description.routine {
        match lower_routine(routine, ErrorLocation::new(routine.name.clone())) {
            Ok(lowered) => routines.push(lowered),
            Err(e) => messages.errors.push(e),
        }
    }

    // ----------------------------------
    //             Analyse
    // ----------------------------------
    let inputs = routines
        .iter()
        .map(|routine| RoutineInput {
            tree: &routine.tree,
            accesses: &routine.effects,
            aliases: &routine.aliases,
            escapes: &routine.escapes,
        })
        .collect::<Vec<_>>();

    let results = analyze_routines(&inputs, config);

    // ----------------------------------
    //         Classify and report
    // ----------------------------------
    let mut reports = Vec::with_capacity(routines.len());
    for (routine, result) in routines.iter().zip(results) {
        let report = result.and_then(|info| {
            let mut candidates = FxHashMap::default();
            for region in routine.tree.regions().iter().filter(|region| region.is_loop()) {
                let live_out = routine.live_out.get(&region.id).cloned().unwrap_or_default();
                let found =
                    classify_loop(&routine.tree, &info, region.id, &live_out, &routine.aliases)?;
                candidates.insert(region.id, found);
            }

            build_report(routine, &info, &candidates)
        });

        match report {
            Ok(report) => reports.push(report),
            Err(e) => messages.errors.push(e),
        }
    }

    timer_log!(time, "Description analysed in: ");

    if messages.has_errors() {
        return Err(messages);
    }

    Ok(AnalysedDescription {
        reports,
        warnings: messages.warnings,
    })
}

#[cfg(test)]
mod tests;

//! Runs every routine description under a cases directory.
//!
//! `success/*.toml` must analyse cleanly and meet all of their expectations.
//! `failure/*.toml` must be rejected with an error.

use crate::analysis_messages::analysis_errors::{AnalysisError, error_type_to_str};
use crate::analysis_messages::display_messages::print_formatted_error;
use crate::routine_description::{analyze_description_file, print_report};
use crate::settings::{AnalysisConfig, DESCRIPTION_FILE_EXTENSION};
use saying::say;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const CASES_PATH: &str = "tests/cases";
const SEPARATOR_LINE_LENGTH: usize = 37;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseSummary {
    pub total: usize,
    pub passed: usize,

    /// File names of the cases that didn't behave as expected
    pub failed: Vec<String>,
}

impl CaseSummary {
    pub fn all_passed(&self) -> bool {
        self.failed.is_empty()
    }
}

pub fn run_all_test_cases(cases_dir: &Path, config: &AnalysisConfig, verbose: bool) -> Result<CaseSummary, AnalysisError> {
    let timer = Instant::now();
    let mut summary = CaseSummary::default();

    // ----------------------------------
    //      Cases that should succeed
    // ----------------------------------
    let success = case_files(&cases_dir.join("success"))?;
    if !success.is_empty() {
        say!(Cyan "Cases that should succeed:");
        println!("{}", "-".repeat(SEPARATOR_LINE_LENGTH));
    }

    for path in success {
        let file_name = file_name(&path);
        println!("  {}", file_name);
        summary.total += 1;

        match analyze_description_file(&path, config) {
            Ok(analysed) if analysed.passed() => {
                say!(Green "✓ PASS");
                summary.passed += 1;
                if verbose {
                    for report in &analysed.reports {
                        print_report(report);
                    }
                }
            }
            Ok(analysed) => {
                say!(Red "✗ FAIL");
                for report in analysed.reports.iter().filter(|report| !report.passed()) {
                    print_report(report);
                }
                summary.failed.push(file_name);
            }
            Err(messages) => {
                say!(Red "✗ FAIL");
                for error in messages.errors {
                    print_formatted_error(error);
                }
                summary.failed.push(file_name);
            }
        }
    }

    // ----------------------------------
    //       Cases that should fail
    // ----------------------------------
    let failure = case_files(&cases_dir.join("failure"))?;
    if !failure.is_empty() {
        say!(Cyan "\nCases that should fail:");
        println!("{}", "-".repeat(SEPARATOR_LINE_LENGTH));
    }

    for path in failure {
        let file_name = file_name(&path);
        println!("  {}", file_name);
        summary.total += 1;

        match analyze_description_file(&path, config) {
            Err(messages) => {
                say!(Green "✓ PASS");
                if let Some(first) = messages.errors.first() {
                    let kind = error_type_to_str(&first.error_type);
                    say!(Bright Black "  ", kind);
                }
                summary.passed += 1;
            }
            Ok(_) => {
                say!(Red "✗ FAIL (analysis succeeded)");
                summary.failed.push(file_name);
            }
        }
    }

    let elapsed = format!("{:?}", timer.elapsed());
    let passed = summary.passed.to_string();
    let total = summary.total.to_string();
    println!("{}", "-".repeat(SEPARATOR_LINE_LENGTH));
    say!(Bold "Passed ", passed, " of ", total, Bright Black " in ", elapsed);

    Ok(summary)
}

/// Sorted description files of `dir`. A missing directory has no cases.
fn case_files(dir: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| AnalysisError::file_error(dir, e.to_string()))?;
    let mut files = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == DESCRIPTION_FILE_EXTENSION))
        .collect::<Vec<_>>();

    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

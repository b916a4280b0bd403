//! Serializable analysis results for a described routine, and checks against its
//! `[routine.expect.<region>]` tables.

use crate::analysis::defined_memory::{DefUseSet, DefinedMemoryInfo};
use crate::analysis::privatization::{PrivatizationCandidate, PrivatizationKind};
use crate::analysis_messages::analysis_errors::AnalysisError;
use crate::memory::LocationLattice;
use crate::routine::{Region, RegionId};
use crate::routine_description::format::RegionExpectation;
use crate::routine_description::lowering::DescribedRoutine;
use crate::routine_description::names::LocationNames;
use rustc_hash::FxHashMap;
use saying::say;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RoutineReport {
    pub routine: String,
    pub regions: Vec<RegionReport>,

    /// Differences from the description's expectations. Empty when everything matched.
    pub mismatches: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionReport {
    pub name: String,
    pub is_loop: bool,
    pub defs: Vec<String>,
    pub may_defs: Vec<String>,
    pub uses: Vec<String>,

    /// `None` when every location must-reaches (nothing on the path was analysed).
    pub must_reach_out: Option<Vec<String>>,
    pub may_reach_out: Option<Vec<String>>,
    pub address_taken: Vec<String>,
    pub unknown_instructions: usize,
    pub solver_transfers: usize,
    pub privatization: Vec<CandidateReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub location: String,
    pub kind: PrivatizationKind,
    pub first_private: bool,
}

impl RoutineReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

pub fn build_report(
    routine: &DescribedRoutine,
    info: &DefinedMemoryInfo,
    candidates: &FxHashMap<RegionId, Vec<PrivatizationCandidate>>,
) -> Result<RoutineReport, AnalysisError> {
    let names = &routine.names;
    let mut regions = Vec::with_capacity(routine.tree.regions().len());

    for region in routine.tree.regions() {
        let footprint = info.region_footprint(region.id)?;
        let value = info.region_definitions(region.id)?;

        let mut address_taken = footprint
            .address_accesses()
            .iter()
            .map(|base| match names.name_of(*base) {
                Some(name) => name.to_owned(),
                None => base.to_string(),
            })
            .collect::<Vec<_>>();
        address_taken.sort();

        let privatization = candidates
            .get(&region.id)
            .map(|found| {
                found
                    .iter()
                    .map(|candidate| CandidateReport {
                        location: names.name(&candidate.location),
                        kind: candidate.traits.kind,
                        first_private: candidate.traits.first_private,
                    })
                    .collect()
            })
            .unwrap_or_default();

        regions.push(RegionReport {
            name: region.name.clone(),
            is_loop: region.is_loop(),
            defs: names.names(footprint.defs()),
            may_defs: names.names(footprint.may_defs()),
            uses: names.names(footprint.uses()),
            must_reach_out: names.lattice_names(&value.output.must_reach),
            may_reach_out: names.lattice_names(&value.output.may_reach),
            address_taken,
            unknown_instructions: footprint.unknown_insts().len(),
            solver_transfers: info.region_stats(region.id).map_or(0, |stats| stats.transfers),
            privatization,
        });
    }

    let mut report = RoutineReport {
        routine: routine.name.clone(),
        regions,
        mismatches: Vec::new(),
    };
    report.mismatches = check_expectations(routine, info, &report)?;

    Ok(report)
}

fn check_expectations(
    routine: &DescribedRoutine,
    info: &DefinedMemoryInfo,
    report: &RoutineReport,
) -> Result<Vec<String>, AnalysisError> {
    let mut mismatches = Vec::new();

    for (region_name, expected) in &routine.expectations {
        let Some(region) = routine.tree.region_by_name(region_name) else {
            mismatches.push(format!("expected results for unknown region '{}'", region_name));
            continue;
        };

        let Some(found) = report.regions.iter().find(|found| found.name == *region_name) else {
            mismatches.push(format!("region '{}' was never reported", region_name));
            continue;
        };

        let footprint = info.region_footprint(region.id)?;
        let value = info.region_definitions(region.id)?;
        let checker = ExpectationChecker {
            names: &routine.names,
            region,
            mismatches: &mut mismatches,
        };
        checker.check(expected, footprint, &value.output.must_reach, &value.output.may_reach, found);
    }

    Ok(mismatches)
}

struct ExpectationChecker<'a> {
    names: &'a LocationNames,
    region: &'a Region,
    mismatches: &'a mut Vec<String>,
}

impl ExpectationChecker<'_> {
    fn check(
        mut self,
        expected: &RegionExpectation,
        footprint: &DefUseSet,
        must_reach: &LocationLattice,
        may_reach: &LocationLattice,
        found: &RegionReport,
    ) {
        if let Some(defs) = &expected.defs {
            self.compare("defs", defs, Some(self.names.names(footprint.defs())));
        }
        if let Some(may_defs) = &expected.may_defs {
            self.compare("may_defs", may_defs, Some(self.names.names(footprint.may_defs())));
        }
        if let Some(uses) = &expected.uses {
            self.compare("uses", uses, Some(self.names.names(footprint.uses())));
        }
        if let Some(must) = &expected.must_reach_out {
            self.compare("must_reach_out", must, self.names.lattice_names(must_reach));
        }
        if let Some(may) = &expected.may_reach_out {
            self.compare("may_reach_out", may, self.names.lattice_names(may_reach));
        }

        let private = expected.private.as_ref();
        let shared = expected.shared.as_ref();
        if (private.is_some() || shared.is_some()) && !self.region.is_loop() {
            self.mismatches.push(format!(
                "'{}' is the routine body, only loops are privatized",
                self.region.name
            ));
            return;
        }

        let candidates_where = |keep: fn(PrivatizationKind) -> bool| {
            let mut locations = found
                .privatization
                .iter()
                .filter(|candidate| keep(candidate.kind))
                .map(|candidate| candidate.location.clone())
                .collect::<Vec<_>>();
            locations.sort();
            locations
        };

        if let Some(private) = private {
            let actual = candidates_where(PrivatizationKind::is_private);
            self.compare("private", private, Some(actual));
        }
        if let Some(shared) = shared {
            let actual = candidates_where(|kind| kind == PrivatizationKind::Shared);
            self.compare("shared", shared, Some(actual));
        }
    }

    /// `actual` of `None` matches only `["*"]`.
    fn compare(&mut self, field: &str, expected: &[String], actual: Option<Vec<String>>) {
        let mut normalised = Vec::with_capacity(expected.len());
        for text in expected {
            if text == "*" {
                normalised.push(text.clone());
                continue;
            }

            match self.names.parse(text) {
                Some(location) => normalised.push(self.names.name(&location)),
                None => {
                    self.mismatches.push(format!(
                        "{}.{}: '{}' doesn't name a declared variable",
                        self.region.name, field, text
                    ));
                    return;
                }
            }
        }
        normalised.sort();
        normalised.dedup();

        let actual = actual.unwrap_or_else(|| vec![String::from("*")]);
        if normalised != actual {
            self.mismatches.push(format!(
                "{}.{}: expected [{}], found [{}]",
                self.region.name,
                field,
                normalised.join(", "),
                actual.join(", ")
            ));
        }
    }
}

pub fn print_report(report: &RoutineReport) {
    let routine = &report.routine;
    say!(Green Bold "\nRoutine ", routine);

    for region in &report.regions {
        let kind = if region.is_loop { "loop" } else { "body" };
        let header = format!("{} ({}, {} transfers)", region.name, kind, region.solver_transfers);
        say!(Cyan header);

        let defs = region.defs.join(", ");
        let may_defs = region.may_defs.join(", ");
        let uses = region.uses.join(", ");
        let must_out = lattice_text(&region.must_reach_out);
        let may_out = lattice_text(&region.may_reach_out);
        say!("  defs:     ", defs);
        say!("  may defs: ", may_defs);
        say!("  uses:     ", uses);
        say!("  must out: ", must_out);
        say!("  may out:  ", may_out);

        if !region.address_taken.is_empty() {
            let taken = region.address_taken.join(", ");
            say!(Yellow "  address taken: ", taken);
        }
        if region.unknown_instructions > 0 {
            let count = region.unknown_instructions.to_string();
            say!(Yellow "  unknown instructions: ", count);
        }

        for candidate in &region.privatization {
            let location = &candidate.location;
            let kind = candidate.kind.as_str();
            let first = if candidate.first_private { " (first private)" } else { "" };
            say!("  ", location, " → ", Bold kind, first);
        }
    }

    for mismatch in &report.mismatches {
        say!(Red "✗ ", mismatch);
    }
}

fn lattice_text(lattice: &Option<Vec<String>>) -> String {
    match lattice {
        Some(names) => names.join(", "),
        None => String::from("*"),
    }
}

//! Command-line entrypoints.
//!
//! Parses commands and dispatches them to the description analyser and the case runner.

use crate::analysis_messages::analysis_errors::AnalysisMessages;
use crate::analysis_messages::display_messages::{print_analysis_messages, print_formatted_error};
use crate::case_runner::{CASES_PATH, run_all_test_cases};
use crate::routine_description::{AnalysedDescription, analyze_description_file, print_report};
use crate::settings::AnalysisConfig;
use saying::say;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Default, PartialEq, Eq)]
struct AnalyzeOptions {
    config: Option<PathBuf>,
    json: bool,
    sequential: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    // Analyses every routine in a description file
    Analyze {
        path: PathBuf,
        options: AnalyzeOptions,
    },

    // Runs every description under a cases directory
    Tests {
        dir: PathBuf,
        verbose: bool,
    },

    Help,
}

pub fn start_cli() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help(false);
        return ExitCode::SUCCESS;
    }

    let command = match get_command(&args[1..]) {
        Ok(command) => command,
        Err(e) => {
            say!(Red e);
            print_help(true);
            return ExitCode::FAILURE;
        }
    };

    match command {
        Command::Help => {
            print_help(false);
            ExitCode::SUCCESS
        }

        Command::Analyze { path, options } => analyze(&path, &options),

        Command::Tests { dir, verbose } => {
            let config = match AnalysisConfig::load_or_default(None, &dir) {
                Ok(config) => config,
                Err(e) => {
                    print_formatted_error(e);
                    return ExitCode::FAILURE;
                }
            };

            match run_all_test_cases(&dir, &config, verbose) {
                Ok(summary) if summary.all_passed() => ExitCode::SUCCESS,
                Ok(summary) => {
                    let failed = summary.failed.join(", ");
                    say!(Red "Failed cases: ", failed);
                    ExitCode::FAILURE
                }
                Err(e) => {
                    print_formatted_error(e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn analyze(path: &Path, options: &AnalyzeOptions) -> ExitCode {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut config = match AnalysisConfig::load_or_default(options.config.as_deref(), dir) {
        Ok(config) => config,
        Err(e) => {
            print_formatted_error(e);
            return ExitCode::FAILURE;
        }
    };

    if options.sequential {
        config.parallel_routines = false;
    }

    let analysed = match analyze_description_file(path, &config) {
        Ok(analysed) => analysed,
        Err(messages) => {
            print_analysis_messages(messages);
            return ExitCode::FAILURE;
        }
    };

    if options.json {
        match serde_json::to_string_pretty(&analysed.reports) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                say!(Red "Couldn't serialize the report: ", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_analysed(&analysed);
    }

    if analysed.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_analysed(analysed: &AnalysedDescription) {
    for report in &analysed.reports {
        print_report(report);
    }

    print_analysis_messages(AnalysisMessages {
        errors: Vec::new(),
        warnings: analysed.warnings.clone(),
    });
}

fn get_command(args: &[String]) -> Result<Command, String> {
    let command = args.first().map(String::as_str);

    match command {
        Some("help") | Some("--help") | Some("-h") => Ok(Command::Help),

        Some("analyze") => parse_analyze_command(args),

        Some("tests") => {
            let mut dir = PathBuf::from(CASES_PATH);
            let mut verbose = false;

            for arg in &args[1..] {
                match arg.as_str() {
                    "--verbose" => verbose = true,
                    _ if arg.starts_with("--") => {
                        return Err(format!("Unknown tests flag: '{arg}'. The only tests flag is --verbose."));
                    }
                    _ => dir = PathBuf::from(arg),
                }
            }

            Ok(Command::Tests { dir, verbose })
        }

        Some(other) => Err(format!("Invalid command: '{other}'")),

        None => Err(String::from("Missing command")),
    }
}

fn parse_analyze_command(args: &[String]) -> Result<Command, String> {
    let mut path: Option<PathBuf> = None;
    let mut options = AnalyzeOptions::default();
    let mut index = 1usize;

    while let Some(arg) = args.get(index) {
        match arg.as_str() {
            "--config" => {
                let Some(config) = args.get(index + 1) else {
                    return Err(String::from("Missing value for --config"));
                };
                if config.starts_with("--") {
                    return Err(String::from("Missing value for --config"));
                }
                options.config = Some(PathBuf::from(config));
                index += 2;
            }
            "--json" => {
                options.json = true;
                index += 1;
            }
            "--sequential" => {
                options.sequential = true;
                index += 1;
            }
            _ if arg.starts_with("--") => {
                return Err(format!(
                    "Unknown analyze flag: '{arg}'. Supported flags are --config, --json, --sequential."
                ));
            }
            _ => {
                if path.is_some() {
                    return Err(String::from("Analyze accepts exactly one description file."));
                }
                path = Some(PathBuf::from(arg));
                index += 1;
            }
        }
    }

    match path {
        Some(path) => Ok(Command::Analyze { path, options }),
        None => Err(String::from("Analyze needs a description file: analyze <file.toml>")),
    }
}

fn print_help(commands_only: bool) {
    if !commands_only {
        say!(Bright Black "------------------------------------");
        say!(Green Bold "privatize - defined memory analysis for loop privatization");
        say!("Usage: ", Bold "<command>", Italic " <args>");
    }
    say!(Green Bold "\nCommands:");
    say!("  analyze <file>    - Analyses every routine in a description file");
    say!("  tests [dir]       - Runs the description cases (default: tests/cases)");
    say!("  help              - Shows this message");

    say!(Green Bold "\nAnalyze flags:");
    say!("  --config <file>   (default: privatize.toml next to the description)");
    say!("  --json            Prints reports as JSON");
    say!("  --sequential      Analyses routines one at a time");

    say!(Green Bold "\nTests flags:");
    say!("  --verbose         Prints the report of every passing case");
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;

use std::process::ExitCode;

fn main() -> ExitCode {
    privatize::cli::start_cli()
}

//! blueprint - project layouts as plain text

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = blueprint_cli::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

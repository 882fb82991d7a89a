//! nixbuild-runner: build a Nix project from a git repository and push the
//! results to a binary cache.
//!
//! This is the main entry point. It parses arguments, runs the build
//! pipeline, and maps the outcome onto the process exit code.

mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod git;
mod logging;
pub mod pipeline;
pub mod process;
pub mod sync;

#[cfg(test)]
mod test_support;

use cli::Cli;
use command::DhallRenderer;
use config::JsonSchemaValidator;
use pipeline::Orchestrator;
use process::ProcessRunner;
use std::io::Write;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::parse_args() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(cli::usage_exit_code(&err) as u8);
        }
    };
    logging::init(cli.verbose);

    let validator = match JsonSchemaValidator::new() {
        Ok(validator) => validator,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::from(exit_codes::FAILURE as u8);
        }
    };
    let orchestrator = Orchestrator::new(&validator, &DhallRenderer, &ProcessRunner);

    let stdout = std::io::stdout();
    let mut relay = |line: &str| {
        let mut out = stdout.lock();
        let _ = writeln!(out, "{}", line);
    };

    let result = orchestrator.run(&cli.flags, &mut relay);
    if let Err(err) = &result {
        eprintln!("Error: {}", err);
    }

    ExitCode::from(pipeline::exit_code(&result) as u8)
}

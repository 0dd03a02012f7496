use clap::Parser;
use std::process::ExitCode;
use stowaway::cli::{Cli, run_cli};
use stowaway::logging::init_logging;
use stowaway::output::OutputFormatter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run_cli(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

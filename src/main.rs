use std::process::ExitCode;

use clap::Parser;
use team_forecasts::commands::base_commands::{CliArgs, Commands};
use team_forecasts::commands::completions_cmd::completions_command;
use team_forecasts::commands::simulate_cmd::simulate_command;
use team_forecasts::logging::init_logging;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    if let Err(e) = init_logging(args.verbose) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match args.command {
        Commands::Simulate(simulate) => match simulate_command(&simulate) {
            Ok(report) => {
                println!("{report}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to simulate project: {e}");
                ExitCode::FAILURE
            }
        },
        Commands::Completions { shell } => {
            completions_command(shell, &mut std::io::stdout());
            ExitCode::SUCCESS
        }
    }
}

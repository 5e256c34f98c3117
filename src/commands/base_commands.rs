use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(author, version, about)]
pub struct CliArgs {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Simulate project completion with a skill-aware Monte Carlo model of the team
    Simulate(SimulateArgs),
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Project file (YAML or JSON) with globalParams, tasks and personnel
    #[arg(short, long)]
    pub input: PathBuf,
    /// Output file; written as JSON when it ends in .json, YAML otherwise
    #[arg(short, long)]
    pub output: PathBuf,
    /// Number of iterations, overrides numOfMonteCarloIterations
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,
    /// Base seed; iteration i runs with seed + i
    #[arg(long)]
    pub seed: Option<u64>,
    /// Worker threads, 0 uses every core
    #[arg(short, long, default_value_t = 0)]
    pub workers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulate_leaves_overrides_unset_by_default() {
        let args = CliArgs::parse_from([
            "team_forecasts",
            "simulate",
            "-i",
            "input.yaml",
            "-o",
            "output.yaml",
        ]);

        assert_eq!(args.verbose, 0);
        let Commands::Simulate(simulate) = args.command else {
            panic!("expected simulate command");
        };
        assert_eq!(simulate.input, PathBuf::from("input.yaml"));
        assert_eq!(simulate.iterations, None);
        assert_eq!(simulate.seed, None);
        assert_eq!(simulate.workers, 0);
    }

    #[test]
    fn simulate_accepts_overrides_and_verbosity() {
        let args = CliArgs::parse_from([
            "team_forecasts",
            "simulate",
            "-i",
            "input.yaml",
            "-o",
            "output.json",
            "-n",
            "500",
            "--seed",
            "42",
            "--workers",
            "3",
            "-vv",
        ]);

        assert_eq!(args.verbose, 2);
        let Commands::Simulate(simulate) = args.command else {
            panic!("expected simulate command");
        };
        assert_eq!(simulate.iterations, Some(500));
        assert_eq!(simulate.seed, Some(42));
        assert_eq!(simulate.workers, 3);
    }
}

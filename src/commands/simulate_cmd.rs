use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::commands::base_commands::SimulateArgs;
use crate::commands::report_format::format_simulation_report;
use crate::services::monte_carlo::{MonteCarloConfig, SimulationError, run_monte_carlo};
use crate::services::project_input::{ProjectInputError, load_project_input};
use crate::services::simulation_types::SimulationOutput;
use crate::services::templates::SimulationTemplates;
use crate::services::worker_pool::WorkerPool;

#[derive(Error, Debug)]
pub enum SimulateCommandError {
    #[error(transparent)]
    Input(#[from] ProjectInputError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("failed to serialize simulation output as yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to serialize simulation output as json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write simulation output {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Loads the project, runs the Monte Carlo simulation and writes the
/// output file. Returns the text report for stdout.
pub fn simulate_command(args: &SimulateArgs) -> Result<String, SimulateCommandError> {
    let mut project = load_project_input(&args.input)?;
    if let Some(iterations) = args.iterations {
        project.params.num_of_monte_carlo_iterations = iterations;
    }
    let base_seed = args.seed.unwrap_or_else(rand::random);

    let templates = SimulationTemplates::new(project.tasks, project.personnel, project.params)
        .map_err(SimulationError::from)?;
    let config = MonteCarloConfig {
        iterations: templates.params.num_of_monte_carlo_iterations,
        base_seed,
        pool: WorkerPool::with_workers(args.workers),
    };
    let output = run_monte_carlo(&templates, &config)?;

    write_output(&args.output, &output)?;
    info!(path = %args.output.display(), "simulation output written");

    let report = format_simulation_report(
        &output,
        &templates.params,
        &args.input.display().to_string(),
    );
    Ok(format!(
        "{report}\n\nSimulation result written to {}",
        args.output.display()
    ))
}

fn write_output(path: &Path, output: &SimulationOutput) -> Result<(), SimulateCommandError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let contents = if is_json {
        serde_json::to_string_pretty(output)?
    } else {
        serde_yaml::to_string(output)?
    };

    std::fs::write(path, contents).map_err(|source| SimulateCommandError::Write {
        path: path.to_path_buf(),
        source,
    })
}

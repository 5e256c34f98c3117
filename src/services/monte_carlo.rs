use rayon::ThreadPoolBuildError;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::services::percentiles::{calculate_percentiles, closest_index};
use crate::services::simulation_types::{IterationResult, PercentileDetail, SimulationOutput};
use crate::services::templates::{SimulationTemplates, TemplateError};
use crate::services::week_simulation::{IterationError, run_iteration};
use crate::services::worker_pool::{WorkerPool, batch_ranges};

/// Batches handed to each worker thread, so slow seeds even out.
const BATCHES_PER_WORKER: usize = 4;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(transparent)]
    Templates(#[from] TemplateError),
    #[error(transparent)]
    Iteration(#[from] IterationError),
    #[error("at least one iteration is required, got {0}")]
    InvalidIterations(usize),
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] ThreadPoolBuildError),
    #[error("replay of seed {seed} diverged from its recorded iteration")]
    ReplayDiverged { seed: u64 },
}

#[derive(Debug, Clone, Copy)]
pub struct MonteCarloConfig {
    pub iterations: usize,
    pub base_seed: u64,
    pub pool: WorkerPool,
}

/// Iterations `start..end` of a run; iteration `i` uses seed
/// `base_seed + i` (wrapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedRange {
    pub base_seed: u64,
    pub start: usize,
    pub end: usize,
}

impl SeedRange {
    pub fn seeds(self) -> impl Iterator<Item = u64> {
        (self.start..self.end).map(move |idx| iteration_seed(self.base_seed, idx))
    }
}

pub fn iteration_seed(base_seed: u64, idx: usize) -> u64 {
    base_seed.wrapping_add(idx as u64)
}

/// Runs every seed of `range` in order, without weekly detail.
pub fn run_seed_range(
    templates: &SimulationTemplates,
    range: SeedRange,
) -> Result<Vec<IterationResult>, IterationError> {
    range
        .seeds()
        .map(|seed| run_iteration(templates, seed, false))
        .collect()
}

/// Runs `seed` again with weekly recording enabled.
pub fn replay_iteration(
    templates: &SimulationTemplates,
    seed: u64,
) -> Result<IterationResult, IterationError> {
    run_iteration(templates, seed, true)
}

pub fn run_monte_carlo(
    templates: &SimulationTemplates,
    config: &MonteCarloConfig,
) -> Result<SimulationOutput, SimulationError> {
    if config.iterations == 0 {
        return Err(SimulationError::InvalidIterations(config.iterations));
    }
    info!(
        iterations = config.iterations,
        base_seed = config.base_seed,
        workers = config.pool.effective_workers(),
        "starting monte carlo run"
    );

    let ranges = batch_ranges(
        config.iterations,
        config.pool.effective_workers() * BATCHES_PER_WORKER,
    );
    let batches: Result<Vec<Vec<IterationResult>>, IterationError> = config.pool.install(|| {
        ranges
            .into_par_iter()
            .map(|(start, end)| {
                run_seed_range(
                    templates,
                    SeedRange {
                        base_seed: config.base_seed,
                        start,
                        end,
                    },
                )
            })
            .collect()
    })?;
    let list_of_simulations: Vec<IterationResult> = match batches {
        Ok(batches) => batches.into_iter().flatten().collect(),
        Err(error) => {
            warn!(%error, "iteration failed, aborting run");
            return Err(error.into());
        }
    };

    let completion_weeks: Vec<f64> = list_of_simulations
        .iter()
        .map(|result| f64::from(result.completion_week))
        .collect();
    let completion_week_percentiles = calculate_percentiles(&completion_weeks);
    info!(
        p50 = completion_week_percentiles.p50,
        p90 = completion_week_percentiles.p90,
        p99 = completion_week_percentiles.p99,
        "completion week percentiles"
    );

    let task_ids = templates.task_ids();
    let mut percentile_details = Vec::with_capacity(5);
    for (label, target) in completion_week_percentiles.entries() {
        let Some(idx) = closest_index(completion_weeks.iter().copied(), target) else {
            continue;
        };
        percentile_details.push(percentile_detail(
            templates,
            &task_ids,
            label,
            &list_of_simulations[idx],
        )?);
    }

    Ok(SimulationOutput {
        base_seed: config.base_seed,
        task_ids,
        list_of_simulations,
        completion_week_percentiles,
        percentile_details,
    })
}

fn percentile_detail(
    templates: &SimulationTemplates,
    task_ids: &[String],
    label: &str,
    recorded: &IterationResult,
) -> Result<PercentileDetail, SimulationError> {
    debug!(percentile = label, seed = recorded.seed, "replaying iteration");
    let replay = replay_iteration(templates, recorded.seed)?;
    if replay.completion_week != recorded.completion_week
        || replay.task_completion_dates != recorded.task_completion_dates
    {
        return Err(SimulationError::ReplayDiverged {
            seed: recorded.seed,
        });
    }

    let task_completion_dates = replay
        .completion_dates_by_id(task_ids)
        .into_iter()
        .map(|(id, week)| (id.to_string(), week))
        .collect();
    Ok(PercentileDetail {
        percentile: label.to_string(),
        completion_week: replay.completion_week,
        seed: replay.seed,
        worked_weeks: replay.worked_weeks.unwrap_or_default(),
        task_completion_dates,
        tasks: templates.tasks().to_vec(),
        personnel: templates.personnel.clone(),
        global_params: templates.params.clone(),
    })
}

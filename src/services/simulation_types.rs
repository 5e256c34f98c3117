use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::global_params::GlobalParams;
use crate::domain::person::Person;
use crate::domain::task::Task;
use crate::services::personnel_lifecycle::UnavailabilityStatus;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub task_id: String,
    pub person_id: String,
    pub work_done: f64,
    pub work_done_on_original: f64,
    pub work_done_on_rework: f64,
    pub task_remaining_duration: f64,
    pub task_remaining_rework: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Unavailability {
    pub person_id: String,
    pub status: UnavailabilityStatus,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeekRecord {
    pub week_number: u32,
    pub assignments: Vec<Assignment>,
    pub unavailabilities: Vec<Unavailability>,
}

/// Summary of one Monte Carlo iteration.
///
/// `taskCompletionDates` is serialized as a plain list of completion weeks,
/// not as an id map: entry `i` belongs to `taskIds[i]` of the enclosing
/// [`SimulationOutput`]. Use [`IterationResult::completion_dates_by_id`] for
/// the keyed form.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IterationResult {
    pub completion_week: u32,
    pub task_completion_dates: Vec<u32>,
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worked_weeks: Option<Vec<WeekRecord>>,
}

impl IterationResult {
    pub fn completion_dates_by_id<'a>(&self, task_ids: &'a [String]) -> BTreeMap<&'a str, u32> {
        task_ids
            .iter()
            .map(String::as_str)
            .zip(self.task_completion_dates.iter().copied())
            .collect()
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct CompletionWeekPercentiles {
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl CompletionWeekPercentiles {
    /// Label and value pairs in ascending percentile order.
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("p50", self.p50),
            ("p75", self.p75),
            ("p90", self.p90),
            ("p95", self.p95),
            ("p99", self.p99),
        ]
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PercentileDetail {
    pub percentile: String,
    pub completion_week: u32,
    pub seed: u64,
    pub worked_weeks: Vec<WeekRecord>,
    pub task_completion_dates: BTreeMap<String, u32>,
    pub tasks: Vec<Task>,
    pub personnel: Vec<Person>,
    pub global_params: GlobalParams,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutput {
    pub base_seed: u64,
    pub task_ids: Vec<String>,
    pub list_of_simulations: Vec<IterationResult>,
    pub completion_week_percentiles: CompletionWeekPercentiles,
    pub percentile_details: Vec<PercentileDetail>,
}

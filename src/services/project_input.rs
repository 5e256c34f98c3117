use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::global_params::{GlobalParams, LevelTable};
use crate::domain::person::{Level, Person, Skill, VacationRange};
use crate::domain::task::{Task, TaskType, is_on_fibonacci_scale};

pub const MIN_MONTE_CARLO_ITERATIONS: usize = 10;
pub const MIN_TIME_TO_HIRE: u32 = 2;
pub const MIN_RAMP_UP: u32 = 1;

#[derive(Error, Debug)]
pub enum ProjectInputError {
    #[error("failed to read project file {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },
    #[error("failed to parse project file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid date format in {path}: {value} (expected YYYY-MM-DD)")]
    InvalidDate { path: PathBuf, value: String },
    #[error("invalid vacation of {person} in {path}: {from} is after {to}")]
    InvalidDateRange {
        path: PathBuf,
        person: String,
        from: NaiveDate,
        to: NaiveDate,
    },
    #[error("task {task} in {path}: fibonacci estimate {value} is not on the estimation scale")]
    InvalidFibonacciEstimate {
        path: PathBuf,
        task: String,
        value: u32,
    },
    #[error("task {task} in {path}: invalid estimate {value}")]
    InvalidEstimate {
        path: PathBuf,
        task: String,
        value: f64,
    },
    #[error("task {task} in {path}: no estimate given")]
    MissingEstimate { path: PathBuf, task: String },
    #[error("person {person} in {path} is onboarded but not hired")]
    OnboardedWithoutHire { path: PathBuf, person: String },
    #[error("{name} for {level:?} in {path} must be at least {min} weeks, got {value}")]
    InvalidWeeks {
        path: PathBuf,
        name: &'static str,
        level: Level,
        value: u32,
        min: u32,
    },
    #[error("numOfMonteCarloIterations in {path} must be at least {min}, got {value}")]
    InvalidIterationCount {
        path: PathBuf,
        value: usize,
        min: usize,
    },
}

/// Tasks, personnel and parameters of one project, dates parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectInput {
    pub params: GlobalParams,
    pub tasks: Vec<Task>,
    pub personnel: Vec<Person>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord {
    global_params: GlobalParamsRecord,
    #[serde(default)]
    tasks: Vec<TaskRecord>,
    #[serde(default)]
    personnel: Vec<PersonRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlobalParamsRecord {
    velocity: LevelTable<f64>,
    rework_rate: LevelTable<f64>,
    #[serde(default)]
    sick_rate: f64,
    #[serde(default)]
    turn_over_rate: f64,
    time_to_hire: LevelTable<u32>,
    ramp_up: LevelTable<u32>,
    start_date: String,
    #[serde(default)]
    split_rate: f64,
    num_of_monte_carlo_iterations: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "type")]
    task_type: TaskType,
    fibonacci_estimate: Option<u32>,
    most_probable_estimate_in_range: Option<f64>,
    #[serde(default)]
    parents: Vec<String>,
    #[serde(default)]
    depends_on_tasks: Vec<String>,
    #[serde(default)]
    required_skills: Vec<Skill>,
    only_startable_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    level: Level,
    #[serde(default)]
    skills: Vec<Skill>,
    #[serde(default = "default_true")]
    hired: bool,
    #[serde(default = "default_true")]
    onboarded: bool,
    start_date: Option<String>,
    #[serde(default)]
    vacations_at: Vec<VacationRecord>,
}

#[derive(Debug, Deserialize)]
struct VacationRecord {
    from: String,
    to: String,
}

fn default_true() -> bool {
    true
}

/// Loads a project from a YAML file. JSON files load as well since the YAML
/// parser accepts them.
pub fn load_project_input<P: AsRef<Path>>(path: P) -> Result<ProjectInput, ProjectInputError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ProjectInputError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_project_input(&contents, path)
}

pub fn parse_project_input(
    input: &str,
    origin_path: &Path,
) -> Result<ProjectInput, ProjectInputError> {
    let record: ProjectRecord =
        serde_yaml::from_str(input).map_err(|source| ProjectInputError::Parse {
            path: origin_path.to_path_buf(),
            source,
        })?;

    let params = params_from_record(record.global_params, origin_path)?;
    let tasks = record
        .tasks
        .into_iter()
        .map(|task| task_from_record(task, origin_path))
        .collect::<Result<Vec<_>, _>>()?;
    let personnel = record
        .personnel
        .into_iter()
        .map(|person| person_from_record(person, origin_path))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProjectInput {
        params,
        tasks,
        personnel,
    })
}

fn params_from_record(
    value: GlobalParamsRecord,
    origin_path: &Path,
) -> Result<GlobalParams, ProjectInputError> {
    check_weeks(&value.time_to_hire, "timeToHire", MIN_TIME_TO_HIRE, origin_path)?;
    check_weeks(&value.ramp_up, "rampUp", MIN_RAMP_UP, origin_path)?;
    if value.num_of_monte_carlo_iterations < MIN_MONTE_CARLO_ITERATIONS {
        return Err(ProjectInputError::InvalidIterationCount {
            path: origin_path.to_path_buf(),
            value: value.num_of_monte_carlo_iterations,
            min: MIN_MONTE_CARLO_ITERATIONS,
        });
    }

    Ok(GlobalParams {
        velocity: value.velocity,
        rework_rate: value.rework_rate,
        sick_rate: value.sick_rate,
        turn_over_rate: value.turn_over_rate,
        time_to_hire: value.time_to_hire,
        ramp_up: value.ramp_up,
        start_date: parse_date(&value.start_date, origin_path)?,
        split_rate: value.split_rate,
        num_of_monte_carlo_iterations: value.num_of_monte_carlo_iterations,
    })
}

fn check_weeks(
    table: &LevelTable<u32>,
    name: &'static str,
    min: u32,
    origin_path: &Path,
) -> Result<(), ProjectInputError> {
    let levels = [
        Level::Intern,
        Level::Junior,
        Level::Mid,
        Level::Senior,
        Level::Specialist,
    ];
    for level in levels {
        let value = table.get(level);
        if value < min {
            return Err(ProjectInputError::InvalidWeeks {
                path: origin_path.to_path_buf(),
                name,
                level,
                value,
                min,
            });
        }
    }
    Ok(())
}

fn task_from_record(value: TaskRecord, origin_path: &Path) -> Result<Task, ProjectInputError> {
    if let Some(fibonacci) = value.fibonacci_estimate {
        if !is_on_fibonacci_scale(fibonacci) {
            return Err(ProjectInputError::InvalidFibonacciEstimate {
                path: origin_path.to_path_buf(),
                task: value.id,
                value: fibonacci,
            });
        }
    }

    // Containers may omit their own estimate; leaves fall back to the
    // fibonacci estimate.
    let estimate = match (value.most_probable_estimate_in_range, value.fibonacci_estimate) {
        (Some(estimate), _) => estimate,
        (None, Some(fibonacci)) => f64::from(fibonacci),
        (None, None) if value.task_type.is_container() => 0.0,
        (None, None) => {
            return Err(ProjectInputError::MissingEstimate {
                path: origin_path.to_path_buf(),
                task: value.id,
            });
        }
    };
    if !estimate.is_finite() || estimate < 0.0 {
        return Err(ProjectInputError::InvalidEstimate {
            path: origin_path.to_path_buf(),
            task: value.id,
            value: estimate,
        });
    }

    let title = value.title.unwrap_or_else(|| value.id.clone());
    let mut task = Task::new(&value.id, &title, value.task_type, estimate);
    task.fibonacci_estimate = value.fibonacci_estimate;
    task.parents = value.parents;
    task.depends_on_tasks = value.depends_on_tasks;
    task.required_skills = value.required_skills;
    task.only_startable_at = value
        .only_startable_at
        .as_deref()
        .map(|date| parse_date(date, origin_path))
        .transpose()?;
    Ok(task)
}

fn person_from_record(value: PersonRecord, origin_path: &Path) -> Result<Person, ProjectInputError> {
    if value.onboarded && !value.hired {
        return Err(ProjectInputError::OnboardedWithoutHire {
            path: origin_path.to_path_buf(),
            person: value.id,
        });
    }

    let vacations_at = value
        .vacations_at
        .iter()
        .map(|vacation| {
            let from = parse_date(&vacation.from, origin_path)?;
            let to = parse_date(&vacation.to, origin_path)?;
            if from > to {
                return Err(ProjectInputError::InvalidDateRange {
                    path: origin_path.to_path_buf(),
                    person: value.id.clone(),
                    from,
                    to,
                });
            }
            Ok(VacationRange { from, to })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let name = value.name.clone().unwrap_or_else(|| value.id.clone());
    let mut person = Person::new(&value.id, &name, value.level);
    person.skills = value.skills;
    person.hired = value.hired;
    person.onboarded = value.onboarded;
    person.start_date = value
        .start_date
        .as_deref()
        .map(|date| parse_date(date, origin_path))
        .transpose()?;
    person.vacations_at = vacations_at;
    Ok(person)
}

fn parse_date(value: &str, origin_path: &Path) -> Result<NaiveDate, ProjectInputError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ProjectInputError::InvalidDate {
        path: origin_path.to_path_buf(),
        value: value.to_string(),
    })
}

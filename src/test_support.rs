use chrono::NaiveDate;

use crate::domain::global_params::{GlobalParams, LevelTable};
use crate::domain::person::{Level, Person, Skill};
use crate::domain::task::{Task, TaskType};

pub fn on_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Parameters without any randomness: velocity 1 and no rework, sickness,
/// turnover or scope growth.
pub fn build_params(start_date: NaiveDate) -> GlobalParams {
    GlobalParams {
        velocity: LevelTable::uniform(1.0),
        rework_rate: LevelTable::uniform(0.0),
        sick_rate: 0.0,
        turn_over_rate: 0.0,
        time_to_hire: LevelTable::uniform(2),
        ramp_up: LevelTable::uniform(1),
        start_date,
        split_rate: 0.0,
        num_of_monte_carlo_iterations: 10,
    }
}

pub fn leaf(id: &str, estimate: f64, deps: &[&str]) -> Task {
    let mut task = Task::new(id, &format!("Task {id}"), TaskType::TechTask, estimate);
    task.depends_on_tasks = deps.iter().map(|dep| (*dep).to_string()).collect();
    task
}

pub fn skilled_leaf(id: &str, estimate: f64, skills: &[(&str, Level)]) -> Task {
    let mut task = leaf(id, estimate, &[]);
    task.required_skills = skills
        .iter()
        .map(|(name, level)| Skill::new(name, *level))
        .collect();
    task
}

pub fn container(id: &str, task_type: TaskType, parents: &[&str], estimate: f64) -> Task {
    let mut task = Task::new(id, &format!("Container {id}"), task_type, estimate);
    task.parents = parents.iter().map(|parent| (*parent).to_string()).collect();
    task
}

/// Hired and onboarded person holding every skill in `skills` at their own
/// level.
pub fn person(id: &str, level: Level, skills: &[&str]) -> Person {
    let mut person = Person::new(id, &format!("Person {id}"), level);
    person.skills = skills.iter().map(|name| Skill::new(name, level)).collect();
    person
}

pub fn chain(length: usize, estimate: f64) -> Vec<Task> {
    (1..=length)
        .map(|idx| {
            let id = format!("T{idx}");
            if idx == 1 {
                leaf(&id, estimate, &[])
            } else {
                leaf(&id, estimate, &[&format!("T{}", idx - 1)])
            }
        })
        .collect()
}

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::person::Skill;

/// Remaining quantities below this are treated as fully drained.
pub const WORK_EPSILON: f64 = 1e-9;

pub const FIBONACCI_SCALE: [u32; 11] = [0, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89];

pub fn is_on_fibonacci_scale(value: u32) -> bool {
    FIBONACCI_SCALE.contains(&value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Project,
    Milestone,
    Epic,
    UserStory,
    Spike,
    TechTask,
    TechDebt,
    Improvement,
    Bug,
}

impl TaskType {
    pub fn is_container(self) -> bool {
        matches!(self, TaskType::Project | TaskType::Milestone | TaskType::Epic)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub fibonacci_estimate: Option<u32>,
    pub most_probable_estimate_in_range: f64,
    pub parents: Vec<String>,
    pub depends_on_tasks: Vec<String>,
    pub required_skills: Vec<Skill>,
    pub only_startable_at: Option<NaiveDate>,
    /// Lineage of a change request: not startable before this task is done.
    pub follows_task: Option<String>,

    // Filled in once by the task graph and never recomputed.
    pub children: Option<Vec<String>>,
    pub all_descendant_tasks: Option<BTreeSet<String>>,
    pub tasks_being_blocked: Option<Vec<String>>,
    pub all_tasks_being_blocked: Option<BTreeSet<String>>,
    pub total_num_of_blocks: Option<usize>,
    pub total_realistic_estimate: Option<f64>,
}

impl Task {
    pub fn new(id: &str, title: &str, task_type: TaskType, estimate: f64) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            task_type,
            fibonacci_estimate: None,
            most_probable_estimate_in_range: estimate,
            parents: Vec::new(),
            depends_on_tasks: Vec::new(),
            required_skills: Vec::new(),
            only_startable_at: None,
            follows_task: None,
            children: None,
            all_descendant_tasks: None,
            tasks_being_blocked: None,
            all_tasks_being_blocked: None,
            total_num_of_blocks: None,
            total_realistic_estimate: None,
        }
    }

    pub fn is_container(&self) -> bool {
        self.task_type.is_container()
    }

    pub fn clear_derived(&mut self) {
        self.children = None;
        self.all_descendant_tasks = None;
        self.tasks_being_blocked = None;
        self.all_tasks_being_blocked = None;
        self.total_num_of_blocks = None;
        self.total_realistic_estimate = None;
    }

    /// Lowest level a person must hold to take this task; `None` when the
    /// task accepts anyone.
    pub fn required_level(&self) -> Option<crate::domain::person::Level> {
        self.required_skills.iter().map(|skill| skill.min_level).max()
    }
}

/// Work applied by a single call to [`TaskState::account_work`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccountedWork {
    pub on_original: f64,
    pub on_rework: f64,
}

impl AccountedWork {
    pub fn total(&self) -> f64 {
        self.on_original + self.on_rework
    }
}

/// Per-iteration mutable state of one task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskState {
    pub remaining_duration: f64,
    pub remaining_rework_duration: f64,
    /// Crew index of the last person who worked on the task.
    pub last_assignee: Option<usize>,
}

impl TaskState {
    pub fn for_task(task: &Task) -> Self {
        let remaining_duration = if task.is_container() {
            0.0
        } else {
            task.most_probable_estimate_in_range.max(0.0)
        };
        Self {
            remaining_duration,
            remaining_rework_duration: 0.0,
            last_assignee: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.remaining_duration <= 0.0 && self.remaining_rework_duration <= 0.0
    }

    /// Effort needed to drain both remaining quantities when every unit of
    /// original work generates `rework_rate` units of rework.
    pub fn remaining_need(&self, rework_rate: f64) -> f64 {
        self.remaining_duration * (1.0 + rework_rate) + self.remaining_rework_duration
    }

    /// Applies `amount` effort units: original work first, which creates
    /// rework debt, then the leftover drains rework without creating more.
    pub fn account_work(&mut self, amount: f64, rework_rate: f64) -> AccountedWork {
        if amount <= 0.0 {
            return AccountedWork::default();
        }

        let accounted = if amount <= self.remaining_duration {
            self.remaining_duration -= amount;
            self.remaining_rework_duration += amount * rework_rate;
            AccountedWork {
                on_original: amount,
                on_rework: 0.0,
            }
        } else {
            let consumed = self.remaining_duration.max(0.0);
            let leftover = amount - consumed;
            let rework_debt = self.remaining_rework_duration + consumed * rework_rate;
            let on_rework = leftover.min(rework_debt.max(0.0));
            self.remaining_duration = 0.0;
            self.remaining_rework_duration = (rework_debt - leftover).max(0.0);
            AccountedWork {
                on_original: consumed,
                on_rework,
            }
        };

        if self.remaining_duration < WORK_EPSILON {
            self.remaining_duration = 0.0;
        }
        if self.remaining_rework_duration < WORK_EPSILON {
            self.remaining_rework_duration = 0.0;
        }
        accounted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(remaining: f64, rework: f64) -> TaskState {
        TaskState {
            remaining_duration: remaining,
            remaining_rework_duration: rework,
            last_assignee: None,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn is_done_requires_both_quantities_drained() {
        let test_cases = vec![
            (0.0, 0.0, true),
            (-1.0, 0.0, true),
            (0.0, -0.5, true),
            (0.1, 0.0, false),
            (0.0, 0.1, false),
            (2.0, 1.0, false),
        ];

        for (remaining, rework, expected) in test_cases {
            assert_eq!(
                state(remaining, rework).is_done(),
                expected,
                "remaining={remaining}, rework={rework}"
            );
        }
    }

    #[test]
    fn account_work_within_remaining_duration_generates_rework() {
        let mut task = state(5.0, 1.0);
        let accounted = task.account_work(2.0, 0.25);

        assert_close(task.remaining_duration, 3.0);
        assert_close(task.remaining_rework_duration, 1.5);
        assert_close(accounted.on_original, 2.0);
        assert_close(accounted.on_rework, 0.0);
    }

    #[test]
    fn account_work_beyond_remaining_duration_drains_rework_without_new_debt() {
        // d=2, w=1, r=0.5, s=3 => (0, max(0, 1 + 1 - 1)) = (0, 1)
        let mut task = state(2.0, 1.0);
        let accounted = task.account_work(3.0, 0.5);

        assert_close(task.remaining_duration, 0.0);
        assert_close(task.remaining_rework_duration, 1.0);
        assert_close(accounted.on_original, 2.0);
        assert_close(accounted.on_rework, 1.0);
    }

    #[test]
    fn account_work_clamps_rework_at_zero() {
        let mut task = state(1.0, 0.0);
        let accounted = task.account_work(10.0, 0.1);

        assert_close(task.remaining_duration, 0.0);
        assert_close(task.remaining_rework_duration, 0.0);
        assert_close(accounted.on_rework, 0.1);
        assert!(task.is_done());
    }

    #[test]
    fn remaining_need_finishes_task_in_one_step() {
        let mut task = state(4.0, 0.5);
        let need = task.remaining_need(0.2);
        task.account_work(need, 0.2);
        assert!(task.is_done());
    }

    #[test]
    fn containers_start_without_remaining_duration() {
        let epic = Task::new("E-1", "Epic", TaskType::Epic, 8.0);
        let story = Task::new("S-1", "Story", TaskType::UserStory, 3.0);

        assert!(TaskState::for_task(&epic).is_done());
        assert_eq!(TaskState::for_task(&story).remaining_duration, 3.0);
    }

    #[test]
    fn fibonacci_scale_membership() {
        assert!(is_on_fibonacci_scale(8));
        assert!(is_on_fibonacci_scale(0));
        assert!(!is_on_fibonacci_scale(4));
    }
}

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

use crate::domain::task::{TaskState, WORK_EPSILON};
use crate::services::personnel_lifecycle::{Crew, UnavailabilityStatus};
use crate::services::simulation_types::{Assignment, IterationResult, Unavailability, WeekRecord};
use crate::services::templates::SimulationTemplates;

/// Weeks an iteration may run before its schedule is declared unsatisfiable.
pub const MAX_SIMULATED_WEEKS: u32 = 1000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IterationError {
    #[error(
        "schedule not finished after {weeks} weeks (seed {seed}), still open: {}",
        .pending.join(", ")
    )]
    UnsatisfiableSchedule {
        weeks: u32,
        seed: u64,
        pending: Vec<String>,
    },
}

/// Runs one iteration from `seed`. Weekly detail is only kept when
/// `record_weeks` is set.
pub fn run_iteration(
    templates: &SimulationTemplates,
    seed: u64,
    record_weeks: bool,
) -> Result<IterationResult, IterationError> {
    WeekSimulation::new(templates, seed, record_weeks).run()
}

/// Private working state of one iteration over shared templates.
struct WeekSimulation<'a> {
    templates: &'a SimulationTemplates,
    rng: StdRng,
    seed: u64,
    tasks: Vec<TaskState>,
    crew: Crew<'a>,
    completion_weeks: Vec<Option<u32>>,
    outstanding_leaves: Vec<usize>,
    completed: usize,
    /// Done leaves whose completion waits on a prerequisite.
    dormant: Vec<usize>,
    week: u32,
    worked_weeks: Option<Vec<WeekRecord>>,
    unavailable: Vec<(usize, UnavailabilityStatus)>,
}

impl<'a> WeekSimulation<'a> {
    fn new(templates: &'a SimulationTemplates, seed: u64, record_weeks: bool) -> Self {
        let task_templates = templates.tasks();
        let mut simulation = Self {
            templates,
            rng: StdRng::seed_from_u64(seed),
            seed,
            tasks: task_templates.iter().map(TaskState::for_task).collect(),
            crew: Crew::from_templates(&templates.personnel),
            completion_weeks: vec![None; task_templates.len()],
            outstanding_leaves: templates.plan.leaf_counts.clone(),
            completed: 0,
            dormant: Vec::new(),
            week: 0,
            worked_weeks: record_weeks.then(Vec::new),
            unavailable: Vec::new(),
        };

        for (idx, task) in task_templates.iter().enumerate() {
            if task.is_container() {
                if simulation.outstanding_leaves[idx] == 0 {
                    simulation.mark_completed(idx);
                }
            } else if simulation.tasks[idx].is_done() {
                simulation.dormant.push(idx);
            }
        }
        simulation.settle_dormant();
        simulation
    }

    fn run(mut self) -> Result<IterationResult, IterationError> {
        while self.completed < self.tasks.len() {
            if self.week >= MAX_SIMULATED_WEEKS {
                return Err(IterationError::UnsatisfiableSchedule {
                    weeks: self.week,
                    seed: self.seed,
                    pending: self.pending_ids(),
                });
            }
            self.week += 1;
            self.simulate_week();
        }

        let completion_week = self.week;
        Ok(IterationResult {
            completion_week,
            task_completion_dates: self
                .completion_weeks
                .iter()
                .map(|week| week.unwrap_or(completion_week))
                .collect(),
            seed: self.seed,
            worked_weeks: self.worked_weeks,
        })
    }

    fn simulate_week(&mut self) {
        let templates = self.templates;
        let params = &templates.params;
        let date = params.week_date(self.week);

        self.crew.advance_week(
            self.week,
            date,
            params,
            &templates.events,
            &mut self.rng,
            &mut self.unavailable,
        );

        let startable: Vec<usize> = templates
            .plan
            .assignment_order
            .iter()
            .copied()
            .filter(|idx| self.is_startable(*idx, date))
            .collect();

        let mut assignments = Vec::new();
        let mut worked = Vec::new();
        for idx in startable {
            let Some(member_idx) = self.select_assignee(idx) else {
                continue;
            };
            worked.push(idx);
            if let Some(assignment) = self.perform_work(idx, member_idx) {
                assignments.push(assignment);
            }
        }

        for idx in worked {
            if self.tasks[idx].is_done() {
                self.mark_completed(idx);
            }
        }
        self.settle_dormant();

        if let Some(worked_weeks) = self.worked_weeks.as_mut() {
            let unavailabilities = self
                .unavailable
                .iter()
                .map(|(member_idx, status)| Unavailability {
                    person_id: self.crew.members[*member_idx].person.id.clone(),
                    status: *status,
                })
                .collect();
            worked_weeks.push(WeekRecord {
                week_number: self.week,
                assignments,
                unavailabilities,
            });
        }
    }

    fn is_startable(&self, idx: usize, date: chrono::NaiveDate) -> bool {
        let task = &self.templates.tasks()[idx];
        !self.tasks[idx].is_done()
            && self.prerequisites_completed(idx)
            && task.only_startable_at.is_none_or(|gate| gate <= date)
    }

    fn prerequisites_completed(&self, idx: usize) -> bool {
        self.templates.plan.prerequisites[idx]
            .iter()
            .all(|prerequisite| self.completion_weeks[*prerequisite].is_some())
    }

    /// Picks the crew member for a task: closest level first, then the last
    /// assignee, then the least loaded, then whoever has used the task's
    /// skills least, then crew order.
    fn select_assignee(&self, idx: usize) -> Option<usize> {
        let task = &self.templates.tasks()[idx];
        let params = &self.templates.params;
        let required_rank = i16::from(task.required_level().map_or(0, |level| level.rank()));
        let last_assignee = self.tasks[idx].last_assignee;

        self.crew
            .members
            .iter()
            .enumerate()
            .filter(|(_, member)| {
                member.state.available_capacity > WORK_EPSILON
                    && params.velocity.get(member.person.level) > 0.0
                    && member.person.is_qualified_for(&task.required_skills)
            })
            .min_by_key(|(member_idx, member)| {
                // Signed: a qualified person below the required level is the
                // closest match.
                let distance = i16::from(member.person.level.rank()) - required_rank;
                let practiced = task
                    .required_skills
                    .iter()
                    .filter(|skill| member.practiced_skills.contains(skill.name.as_str()))
                    .count();
                (
                    distance,
                    last_assignee != Some(*member_idx),
                    member.assignment_count,
                    practiced,
                    *member_idx,
                )
            })
            .map(|(member_idx, _)| member_idx)
    }

    /// Applies one member's work to a task. The assignment is only built
    /// when weeks are recorded.
    fn perform_work(&mut self, idx: usize, member_idx: usize) -> Option<Assignment> {
        let templates = self.templates;
        let task = &templates.tasks()[idx];
        let member = &mut self.crew.members[member_idx];
        let velocity = templates.params.velocity.get(member.person.level);
        let rework_rate = templates.params.rework_rate.get(member.person.level);
        let state = &mut self.tasks[idx];

        let need = state.remaining_need(rework_rate);
        let weeks_used = member.state.available_capacity.min(need / velocity);
        let work = weeks_used * velocity;
        let accounted = state.account_work(work, rework_rate);

        member.state.available_capacity = (member.state.available_capacity - weeks_used).max(0.0);
        member.assignment_count += 1;
        member
            .practiced_skills
            .extend(task.required_skills.iter().map(|skill| skill.name.as_str()));
        state.last_assignee = Some(member_idx);

        self.worked_weeks.as_ref()?;
        Some(Assignment {
            task_id: task.id.clone(),
            person_id: member.person.id.clone(),
            work_done: work,
            work_done_on_original: accounted.on_original,
            work_done_on_rework: accounted.on_rework,
            task_remaining_duration: state.remaining_duration,
            task_remaining_rework: state.remaining_rework_duration,
        })
    }

    /// Records the first completion of a leaf and of every container it
    /// finishes.
    fn mark_completed(&mut self, idx: usize) {
        if self.completion_weeks[idx].is_some() {
            return;
        }
        if !self.prerequisites_completed(idx) {
            self.dormant.push(idx);
            return;
        }
        self.completion_weeks[idx] = Some(self.week);
        self.completed += 1;

        let templates = self.templates;
        for container in &templates.plan.containers_of_leaf[idx] {
            self.outstanding_leaves[*container] -= 1;
            if self.outstanding_leaves[*container] == 0 {
                self.completion_weeks[*container] = Some(self.week);
                self.completed += 1;
            }
        }
    }

    fn settle_dormant(&mut self) {
        loop {
            let waiting = std::mem::take(&mut self.dormant);
            let before = waiting.len();
            for idx in waiting {
                self.mark_completed(idx);
            }
            if self.dormant.is_empty() || self.dormant.len() == before {
                break;
            }
        }
    }

    fn pending_ids(&self) -> Vec<String> {
        self.templates
            .tasks()
            .iter()
            .zip(&self.completion_weeks)
            .filter(|(_, week)| week.is_none())
            .map(|(task, _)| task.id.clone())
            .collect()
    }
}

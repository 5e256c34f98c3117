use rand_distr::BernoulliError;
use thiserror::Error;
use tracing::info;

use crate::domain::global_params::GlobalParams;
use crate::domain::person::Person;
use crate::domain::task::Task;
use crate::services::personnel_lifecycle::PersonnelEvents;
use crate::services::scope_injector::inject_change_requests;
use crate::services::task_graph::{TaskGraph, TaskGraphError};

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("invalid task graph: {0}")]
    Graph(#[from] TaskGraphError),
    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("invalid personnel event probability: {0}")]
    InvalidProbability(#[from] BernoulliError),
    #[error("duplicate person id {0}")]
    DuplicatePersonId(String),
}

/// Task indices the weekly engine needs on every step, resolved once.
#[derive(Debug, Clone)]
pub struct TaskPlan {
    /// Tasks (dependencies and change-request origins) that must be done
    /// before a task may start.
    pub prerequisites: Vec<Vec<usize>>,
    /// Leaves ordered by how much work they hold up, then input order.
    pub assignment_order: Vec<usize>,
    /// For each leaf, every container holding it.
    pub containers_of_leaf: Vec<Vec<usize>>,
    /// For each container, the number of leaves inside it.
    pub leaf_counts: Vec<usize>,
}

impl TaskPlan {
    fn from_graph(graph: &TaskGraph) -> Result<Self, TaskGraphError> {
        let tasks = graph.tasks();
        let prerequisites = (0..tasks.len())
            .map(|idx| graph.start_prerequisites(idx))
            .collect::<Result<Vec<_>, _>>()?;

        let mut assignment_order: Vec<usize> = (0..tasks.len())
            .filter(|idx| !tasks[*idx].is_container())
            .collect();
        assignment_order.sort_by_key(|idx| {
            std::cmp::Reverse(tasks[*idx].total_num_of_blocks.unwrap_or(0))
        });

        let mut containers_of_leaf = vec![Vec::new(); tasks.len()];
        let mut leaf_counts = vec![0; tasks.len()];
        for (idx, task) in tasks.iter().enumerate() {
            if !task.is_container() {
                continue;
            }
            let leaves = graph.leaf_descendants(idx)?;
            leaf_counts[idx] = leaves.len();
            for leaf in leaves {
                containers_of_leaf[leaf].push(idx);
            }
        }

        Ok(Self {
            prerequisites,
            assignment_order,
            containers_of_leaf,
            leaf_counts,
        })
    }
}

/// Read-only inputs shared by every iteration of a run: the aggregated task
/// graph (change requests included), the personnel and the parameters.
#[derive(Debug, Clone)]
pub struct SimulationTemplates {
    pub graph: TaskGraph,
    pub personnel: Vec<Person>,
    pub params: GlobalParams,
    pub(crate) plan: TaskPlan,
    pub(crate) events: PersonnelEvents,
}

impl SimulationTemplates {
    pub fn new(
        tasks: Vec<Task>,
        personnel: Vec<Person>,
        params: GlobalParams,
    ) -> Result<Self, TemplateError> {
        check_parameters(&params)?;
        let mut seen = std::collections::HashSet::new();
        for person in &personnel {
            if !seen.insert(person.id.as_str()) {
                return Err(TemplateError::DuplicatePersonId(person.id.clone()));
            }
        }

        let graph = TaskGraph::build(tasks)?;
        let planned_tasks = graph.len();
        let graph = inject_change_requests(graph, params.split_rate)?;
        let plan = TaskPlan::from_graph(&graph)?;
        let events = PersonnelEvents::new(params.sick_rate, params.turn_over_rate)?;

        info!(
            tasks = planned_tasks,
            change_requests = graph.len() - planned_tasks,
            personnel = personnel.len(),
            "simulation templates ready"
        );
        Ok(Self {
            graph,
            personnel,
            params,
            plan,
            events,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        self.graph.tasks()
    }

    pub fn task_ids(&self) -> Vec<String> {
        self.tasks().iter().map(|task| task.id.clone()).collect()
    }
}

fn check_parameters(params: &GlobalParams) -> Result<(), TemplateError> {
    for velocity in params.velocity.values() {
        if !(0.0..=2.0).contains(&velocity) {
            return Err(TemplateError::InvalidParameter {
                name: "velocity",
                value: velocity,
            });
        }
    }
    for rate in params.rework_rate.values() {
        if !(0.0..=1.0).contains(&rate) {
            return Err(TemplateError::InvalidParameter {
                name: "rework rate",
                value: rate,
            });
        }
    }
    if !(0.0..=1.0).contains(&params.split_rate) {
        return Err(TemplateError::InvalidParameter {
            name: "split rate",
            value: params.split_rate,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::person::Level;
    use crate::domain::task::TaskType;
    use crate::test_support::{build_params, chain, container, leaf, on_date, person};

    #[test]
    fn plan_orders_leaves_by_blocked_work() {
        let tasks = vec![leaf("LONE", 1.0, &[]), leaf("ROOT", 1.0, &[]), leaf("NEXT", 1.0, &["ROOT"])];
        let templates = SimulationTemplates::new(
            tasks,
            vec![person("P-1", Level::Mid, &[])],
            build_params(on_date(2026, 1, 5)),
        )
        .unwrap();

        assert_eq!(templates.plan.assignment_order, vec![1, 0, 2]);
        assert_eq!(templates.plan.prerequisites[2], vec![1]);
    }

    #[test]
    fn plan_tracks_leaves_per_container() {
        let mut a = leaf("A", 1.0, &[]);
        a.parents = vec!["EPIC".to_string()];
        let mut b = leaf("B", 1.0, &[]);
        b.parents = vec!["EPIC".to_string()];
        let tasks = vec![container("EPIC", TaskType::Epic, &[], 0.0), a, b];

        let templates = SimulationTemplates::new(
            tasks,
            vec![person("P-1", Level::Mid, &[])],
            build_params(on_date(2026, 1, 5)),
        )
        .unwrap();

        assert_eq!(templates.plan.leaf_counts[0], 2);
        assert_eq!(templates.plan.containers_of_leaf[1], vec![0]);
        assert_eq!(templates.plan.containers_of_leaf[2], vec![0]);
    }

    #[test]
    fn leaves_keep_only_their_own_prerequisites() {
        let mut epic = container("EPIC", TaskType::Epic, &[], 0.0);
        epic.depends_on_tasks = vec!["SETUP".to_string(), "INNER".to_string()];
        let mut inner = leaf("INNER", 1.0, &[]);
        inner.parents = vec!["EPIC".to_string()];
        let mut story = leaf("STORY", 1.0, &[]);
        story.parents = vec!["EPIC".to_string()];
        let tasks = vec![leaf("SETUP", 1.0, &[]), epic, inner, story];

        let templates = SimulationTemplates::new(
            tasks,
            vec![person("P-1", Level::Mid, &[])],
            build_params(on_date(2026, 1, 5)),
        )
        .unwrap();

        assert_eq!(templates.plan.prerequisites[1], vec![0, 2]);
        assert!(templates.plan.prerequisites[2].is_empty());
        assert!(templates.plan.prerequisites[3].is_empty());
    }

    #[test]
    fn split_rate_is_applied_once_to_the_templates() {
        let mut params = build_params(on_date(2026, 1, 5));
        params.split_rate = 0.5;
        let templates =
            SimulationTemplates::new(chain(4, 1.0), vec![person("P-1", Level::Mid, &[])], params)
                .unwrap();

        assert_eq!(templates.tasks().len(), 7);
        assert!(templates.graph.get("T2-CR").is_some());
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        let mut params = build_params(on_date(2026, 1, 5));
        params.sick_rate = 1.5;
        let error = SimulationTemplates::new(chain(1, 1.0), Vec::new(), params).unwrap_err();
        assert!(matches!(error, TemplateError::InvalidProbability(_)));

        let mut params = build_params(on_date(2026, 1, 5));
        params.velocity.mid = 3.0;
        let error = SimulationTemplates::new(chain(1, 1.0), Vec::new(), params).unwrap_err();
        assert!(matches!(error, TemplateError::InvalidParameter { name: "velocity", .. }));
    }

    #[test]
    fn duplicate_people_are_rejected() {
        let personnel = vec![person("P-1", Level::Mid, &[]), person("P-1", Level::Senior, &[])];
        let error = SimulationTemplates::new(
            chain(1, 1.0),
            personnel,
            build_params(on_date(2026, 1, 5)),
        )
        .unwrap_err();
        assert!(matches!(error, TemplateError::DuplicatePersonId(id) if id == "P-1"));
    }
}

use std::collections::HashSet;

use tracing::debug;

use crate::domain::task::{Task, TaskType};
use crate::services::task_graph::{TaskGraph, TaskGraphError};

pub const CHANGE_REQUEST_MILESTONE_ID: &str = "CHANGE-REQUESTS";

/// Adds one change request per selected leaf, grouped under a synthetic
/// milestone, and re-aggregates the graph. The selection only depends on
/// the task order and `split_rate`, so every iteration of a run sees the
/// same change requests.
pub fn inject_change_requests(
    graph: TaskGraph,
    split_rate: f64,
) -> Result<TaskGraph, TaskGraphError> {
    let selected = select_split_candidates(graph.tasks(), split_rate);
    if selected.is_empty() {
        return Ok(graph);
    }

    let originals: Vec<Task> = selected
        .iter()
        .map(|idx| graph.tasks()[*idx].clone())
        .collect();
    let mut tasks = graph.into_tasks();
    let mut taken: HashSet<String> = tasks.iter().map(|task| task.id.clone()).collect();

    let milestone_id = unique_id(CHANGE_REQUEST_MILESTONE_ID, &mut taken);
    tasks.push(Task::new(
        &milestone_id,
        "Change requests",
        TaskType::Milestone,
        0.0,
    ));

    for original in &originals {
        let id = unique_id(&format!("{}-CR", original.id), &mut taken);
        let mut change_request = Task::new(
            &id,
            &format!("Change request for {}", original.title),
            original.task_type,
            original.most_probable_estimate_in_range,
        );
        change_request.fibonacci_estimate = original.fibonacci_estimate;
        change_request.required_skills = original.required_skills.clone();
        change_request.parents = vec![milestone_id.clone()];
        change_request.follows_task = Some(original.id.clone());
        tasks.push(change_request);
    }

    debug!(
        change_requests = originals.len(),
        split_rate, "injected change requests"
    );
    TaskGraph::build(tasks)
}

/// Picks ⌊rate × eligible⌋ leaves spread evenly over the input order.
fn select_split_candidates(tasks: &[Task], split_rate: f64) -> Vec<usize> {
    let rate = split_rate.clamp(0.0, 1.0);
    if rate <= 0.0 {
        return Vec::new();
    }

    tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| {
            !task.is_container()
                && task.follows_task.is_none()
                && task.most_probable_estimate_in_range > 0.0
        })
        .map(|(idx, _)| idx)
        .enumerate()
        .filter(|(position, _)| {
            let before = (*position as f64 * rate).floor();
            let after = ((*position + 1) as f64 * rate).floor();
            after > before
        })
        .map(|(_, idx)| idx)
        .collect()
}

fn unique_id(base: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = base.to_string();
    let mut suffix = 2;
    while taken.contains(&candidate) {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::person::Level;
    use crate::test_support::{chain, container, skilled_leaf};

    #[test]
    fn zero_split_rate_leaves_graph_untouched() {
        let graph = TaskGraph::build(chain(4, 1.0)).unwrap();
        let injected = inject_change_requests(graph.clone(), 0.0).unwrap();
        assert_eq!(injected.tasks(), graph.tasks());
    }

    #[test]
    fn half_split_rate_adds_a_change_request_for_every_other_leaf() {
        let graph = TaskGraph::build(chain(4, 2.0)).unwrap();
        let injected = inject_change_requests(graph, 0.5).unwrap();

        assert_eq!(injected.len(), 4 + 1 + 2);
        let milestone = injected.get(CHANGE_REQUEST_MILESTONE_ID).unwrap();
        assert_eq!(milestone.task_type, TaskType::Milestone);
        assert_eq!(
            milestone.children.as_ref().unwrap(),
            &vec!["T2-CR".to_string(), "T4-CR".to_string()]
        );
        assert_eq!(milestone.total_realistic_estimate, Some(4.0));

        let change_request = injected.get("T2-CR").unwrap();
        assert!(change_request.depends_on_tasks.is_empty());
        assert_eq!(change_request.follows_task.as_deref(), Some("T2"));
        assert_eq!(change_request.most_probable_estimate_in_range, 2.0);
    }

    #[test]
    fn change_requests_keep_required_skills_and_skip_containers() {
        let mut story = skilled_leaf("S1", 3.0, &[("rust", Level::Senior)]);
        story.parents = vec!["E1".to_string()];
        let tasks = vec![container("E1", TaskType::Epic, &[], 0.0), story];

        let injected = inject_change_requests(TaskGraph::build(tasks).unwrap(), 1.0).unwrap();
        assert!(injected.get("E1-CR").is_none());
        let change_request = injected.get("S1-CR").unwrap();
        assert_eq!(change_request.required_skills.len(), 1);
        assert_eq!(change_request.required_skills[0].name, "rust");
    }

    #[test]
    fn injection_is_deterministic() {
        let first = inject_change_requests(TaskGraph::build(chain(10, 1.0)).unwrap(), 0.3).unwrap();
        let second = inject_change_requests(TaskGraph::build(chain(10, 1.0)).unwrap(), 0.3).unwrap();

        let ids = |graph: &TaskGraph| -> Vec<String> {
            graph.tasks().iter().map(|task| task.id.clone()).collect()
        };
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first.len(), 10 + 1 + 3);
    }

    #[test]
    fn colliding_ids_get_a_suffix() {
        let mut tasks = chain(1, 1.0);
        tasks.push(crate::test_support::leaf("T1-CR", 0.0, &[]));

        let injected = inject_change_requests(TaskGraph::build(tasks).unwrap(), 1.0).unwrap();
        assert!(injected.get("T1-CR-2").is_some());
    }
}

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::domain::task::Task;

/// Structural problems in the task list. All of them are detected while the
/// graph is built, before any iteration runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskGraphError {
    #[error("duplicate task id {0}")]
    DuplicateTaskId(String),
    #[error("{relation} {reference} of task {task} not found")]
    MissingReference {
        task: String,
        relation: &'static str,
        reference: String,
    },
    #[error("cyclic {relation} reference involving task {task}")]
    CyclicReference {
        task: String,
        relation: &'static str,
    },
}

/// Arena of tasks with an id index. Relations between tasks are kept as ids
/// on the tasks themselves; the derived relations are filled in place by
/// [`TaskGraph::aggregate`].
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskGraph {
    /// Indexes `tasks` and computes every derived relation.
    pub fn build(tasks: Vec<Task>) -> Result<Self, TaskGraphError> {
        let mut graph = Self::new(tasks)?;
        graph.aggregate()?;
        Ok(graph)
    }

    /// Indexes `tasks` without computing derived relations.
    pub fn new(tasks: Vec<Task>) -> Result<Self, TaskGraphError> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (idx, task) in tasks.iter().enumerate() {
            if index.insert(task.id.clone(), idx).is_some() {
                return Err(TaskGraphError::DuplicateTaskId(task.id.clone()));
            }
        }
        Ok(Self { tasks, index })
    }

    pub fn aggregate(&mut self) -> Result<(), TaskGraphError> {
        self.ensure_acyclic_dependencies()?;
        self.compute_children()?;
        self.compute_tasks_being_blocked()?;
        for idx in 0..self.tasks.len() {
            self.all_descendant_tasks(idx)?;
            self.all_tasks_being_blocked(idx)?;
        }
        for idx in 0..self.tasks.len() {
            self.total_num_of_blocks(idx)?;
            if self.tasks[idx].is_container() {
                self.total_realistic_estimate(idx)?;
            }
        }
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.index_of(id).map(|idx| &self.tasks[idx])
    }

    /// Gives the tasks back with their derived relations cleared, ready to be
    /// extended and aggregated again.
    pub fn into_tasks(self) -> Vec<Task> {
        let mut tasks = self.tasks;
        for task in &mut tasks {
            task.clear_derived();
        }
        tasks
    }

    /// Indices of the leaf tasks contained (transitively) in `idx`.
    pub fn leaf_descendants(&self, idx: usize) -> Result<Vec<usize>, TaskGraphError> {
        let task = &self.tasks[idx];
        let Some(descendants) = task.all_descendant_tasks.as_ref() else {
            return Ok(Vec::new());
        };
        let mut leaves = Vec::new();
        for id in descendants {
            let child = self.resolve(&task.id, "descendant", id)?;
            if !self.tasks[child].is_container() {
                leaves.push(child);
            }
        }
        Ok(leaves)
    }

    /// Resolves `dependsOnTasks` plus the change-request lineage of `idx`.
    pub fn start_prerequisites(&self, idx: usize) -> Result<Vec<usize>, TaskGraphError> {
        let task = &self.tasks[idx];
        let mut prerequisites = Vec::with_capacity(task.depends_on_tasks.len() + 1);
        for dependency in &task.depends_on_tasks {
            prerequisites.push(self.resolve(&task.id, "dependency", dependency)?);
        }
        if let Some(origin) = task.follows_task.as_deref() {
            prerequisites.push(self.resolve(&task.id, "origin", origin)?);
        }
        Ok(prerequisites)
    }

    fn resolve(
        &self,
        task: &str,
        relation: &'static str,
        reference: &str,
    ) -> Result<usize, TaskGraphError> {
        self.index_of(reference)
            .ok_or_else(|| TaskGraphError::MissingReference {
                task: task.to_string(),
                relation,
                reference: reference.to_string(),
            })
    }

    fn ensure_acyclic_dependencies(&self) -> Result<(), TaskGraphError> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..self.tasks.len()).map(|idx| graph.add_node(idx)).collect();

        for (idx, task) in self.tasks.iter().enumerate() {
            for dependency in &task.depends_on_tasks {
                let dep_idx = self.resolve(&task.id, "dependency", dependency)?;
                graph.add_edge(nodes[dep_idx], nodes[idx], ());
            }
            if let Some(origin) = task.follows_task.as_deref() {
                let origin_idx = self.resolve(&task.id, "origin", origin)?;
                graph.add_edge(nodes[origin_idx], nodes[idx], ());
            }
        }

        toposort(&graph, None)
            .map(|_| ())
            .map_err(|cycle| TaskGraphError::CyclicReference {
                task: self.tasks[graph[cycle.node_id()]].id.clone(),
                relation: "dependency",
            })
    }

    /// Inverse of `parents`. A task with several parents shows up in each.
    pub fn compute_children(&mut self) -> Result<(), TaskGraphError> {
        if self.tasks.iter().all(|task| task.children.is_some()) {
            return Ok(());
        }

        let mut children: Vec<Vec<String>> = vec![Vec::new(); self.tasks.len()];
        for task in &self.tasks {
            for parent in &task.parents {
                let parent_idx = self.resolve(&task.id, "parent", parent)?;
                if !children[parent_idx].contains(&task.id) {
                    children[parent_idx].push(task.id.clone());
                }
            }
        }

        for (task, computed) in self.tasks.iter_mut().zip(children) {
            task.children.get_or_insert(computed);
        }
        Ok(())
    }

    /// Inverse of `dependsOnTasks`.
    pub fn compute_tasks_being_blocked(&mut self) -> Result<(), TaskGraphError> {
        if self.tasks.iter().all(|task| task.tasks_being_blocked.is_some()) {
            return Ok(());
        }

        let mut blocked: Vec<Vec<String>> = vec![Vec::new(); self.tasks.len()];
        for task in &self.tasks {
            for dependency in &task.depends_on_tasks {
                let dep_idx = self.resolve(&task.id, "dependency", dependency)?;
                if !blocked[dep_idx].contains(&task.id) {
                    blocked[dep_idx].push(task.id.clone());
                }
            }
        }

        for (task, computed) in self.tasks.iter_mut().zip(blocked) {
            task.tasks_being_blocked.get_or_insert(computed);
        }
        Ok(())
    }

    pub fn all_descendant_tasks(&mut self, idx: usize) -> Result<BTreeSet<String>, TaskGraphError> {
        self.compute_children()?;
        let mut visiting = HashSet::new();
        self.descendants_of(idx, &mut visiting)
    }

    fn descendants_of(
        &mut self,
        idx: usize,
        visiting: &mut HashSet<usize>,
    ) -> Result<BTreeSet<String>, TaskGraphError> {
        if let Some(existing) = &self.tasks[idx].all_descendant_tasks {
            return Ok(existing.clone());
        }
        let task_id = self.tasks[idx].id.clone();
        if !visiting.insert(idx) {
            return Err(TaskGraphError::CyclicReference {
                task: task_id,
                relation: "containment",
            });
        }

        let children = self.tasks[idx].children.clone().unwrap_or_default();
        let mut descendants = BTreeSet::new();
        for child in children {
            let child_idx = self.resolve(&task_id, "child", &child)?;
            descendants.extend(self.descendants_of(child_idx, visiting)?);
            descendants.insert(child);
        }

        visiting.remove(&idx);
        self.tasks[idx].all_descendant_tasks = Some(descendants.clone());
        Ok(descendants)
    }

    pub fn all_tasks_being_blocked(
        &mut self,
        idx: usize,
    ) -> Result<BTreeSet<String>, TaskGraphError> {
        self.compute_tasks_being_blocked()?;
        let mut visiting = HashSet::new();
        self.blocked_by(idx, &mut visiting)
    }

    fn blocked_by(
        &mut self,
        idx: usize,
        visiting: &mut HashSet<usize>,
    ) -> Result<BTreeSet<String>, TaskGraphError> {
        if let Some(existing) = &self.tasks[idx].all_tasks_being_blocked {
            return Ok(existing.clone());
        }
        let task_id = self.tasks[idx].id.clone();
        if !visiting.insert(idx) {
            return Err(TaskGraphError::CyclicReference {
                task: task_id,
                relation: "dependency",
            });
        }

        let direct = self.tasks[idx].tasks_being_blocked.clone().unwrap_or_default();
        let mut blocked = BTreeSet::new();
        for dependent in direct {
            let dependent_idx = self.resolve(&task_id, "dependent", &dependent)?;
            blocked.extend(self.blocked_by(dependent_idx, visiting)?);
            blocked.insert(dependent);
        }

        visiting.remove(&idx);
        self.tasks[idx].all_tasks_being_blocked = Some(blocked.clone());
        Ok(blocked)
    }

    /// Number of tasks held up by `idx`, where a blocked container counts
    /// together with everything inside it. Reporting and ordering only.
    pub fn total_num_of_blocks(&mut self, idx: usize) -> Result<usize, TaskGraphError> {
        if let Some(existing) = self.tasks[idx].total_num_of_blocks {
            return Ok(existing);
        }

        let blocked = self.all_tasks_being_blocked(idx)?;
        let mut expanded = blocked.clone();
        for id in &blocked {
            let blocked_idx = self.resolve(&self.tasks[idx].id, "dependent", id)?;
            if self.tasks[blocked_idx].is_container() {
                expanded.extend(self.all_descendant_tasks(blocked_idx)?);
            }
        }

        let count = expanded.len();
        self.tasks[idx].total_num_of_blocks = Some(count);
        Ok(count)
    }

    /// Own estimate plus the estimates of everything contained. Stored on
    /// containers only; leaves report their own estimate.
    pub fn total_realistic_estimate(&mut self, idx: usize) -> Result<f64, TaskGraphError> {
        self.compute_children()?;
        let mut visiting = HashSet::new();
        self.realistic_estimate_of(idx, &mut visiting)
    }

    fn realistic_estimate_of(
        &mut self,
        idx: usize,
        visiting: &mut HashSet<usize>,
    ) -> Result<f64, TaskGraphError> {
        let task = &self.tasks[idx];
        if !task.is_container() {
            return Ok(task.most_probable_estimate_in_range);
        }
        if let Some(existing) = task.total_realistic_estimate {
            return Ok(existing);
        }
        let task_id = task.id.clone();
        if !visiting.insert(idx) {
            return Err(TaskGraphError::CyclicReference {
                task: task_id,
                relation: "containment",
            });
        }

        let mut total = task.most_probable_estimate_in_range;
        let children = task.children.clone().unwrap_or_default();
        for child in children {
            let child_idx = self.resolve(&task_id, "child", &child)?;
            total += self.realistic_estimate_of(child_idx, visiting)?;
        }

        visiting.remove(&idx);
        self.tasks[idx].total_realistic_estimate = Some(total);
        Ok(total)
    }
}

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::job::Feature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
    Cancelled,
    Skipped,
}

/// One unit of feature work against one item (`spec.md` §3 "Task").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub feature: Feature,
    pub item_id: String,
    /// Optional sub-range, e.g. a segment range for STT chunking.
    pub sub_range: Option<(f64, f64)>,
    pub dependencies: Vec<TaskId>,
    pub retry_count: u32,
    pub status: TaskStatus,
    /// Declared-priority used to break topological-order ties, higher runs
    /// first (`spec.md` §4.1 "priority, item creation order").
    pub priority: i32,
    /// Whether a failed required dependency should be skipped rather than
    /// propagated as `failed` (`spec.md` §3 Task invariant).
    pub skippable_on_dep_failure: bool,
}

/// The per-item task graph the engine builds and walks in topological
/// order (`spec.md` §4.1).
#[derive(Debug, Default)]
pub struct Dag {
    tasks: HashMap<TaskId, Task>,
    /// Tasks that depend on a given task, for propagating failure/skip.
    dependents: HashMap<TaskId, Vec<TaskId>>,
}

impl Dag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task: Task) {
        for dep in &task.dependencies {
            self.dependents.entry(*dep).or_default().push(task.id);
        }
        self.tasks.insert(task.id, task);
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    pub fn dependents_of(&self, id: TaskId) -> &[TaskId] {
        self.dependents.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn all_ids(&self) -> Vec<TaskId> {
        self.tasks.keys().copied().collect()
    }

    /// A task is runnable iff every dependency is `Done`
    /// (`spec.md` §3 Task invariant).
    pub fn is_runnable(&self, id: TaskId) -> bool {
        let Some(task) = self.tasks.get(&id) else {
            return false;
        };
        if task.status != TaskStatus::Pending {
            return false;
        }
        task.dependencies.iter().all(|dep| {
            self.tasks
                .get(dep)
                .is_some_and(|d| d.status == TaskStatus::Done)
        })
    }

    /// Tasks ready to run right now, ordered by (priority desc, id asc) to
    /// break ties deterministically per `spec.md` §4.1.
    pub fn runnable(&self) -> Vec<TaskId> {
        let mut ready: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|t| self.is_runnable(t.id))
            .map(|t| t.id)
            .collect();
        ready.sort_by(|a, b| {
            let ta = &self.tasks[a];
            let tb = &self.tasks[b];
            tb.priority.cmp(&ta.priority).then(a.0.cmp(&b.0))
        });
        ready
    }

    /// Propagate a task's terminal failure to dependents, unless they
    /// declare `skippable_on_dep_failure` (`spec.md` §3 Task invariant).
    pub fn propagate_failure(&mut self, failed: TaskId) -> Vec<TaskId> {
        let mut affected = Vec::new();
        let mut stack = vec![failed];
        let mut seen: HashSet<TaskId> = HashSet::new();
        while let Some(id) = stack.pop() {
            let dependents = self.dependents_of(id).to_vec();
            for dep_id in dependents {
                if !seen.insert(dep_id) {
                    continue;
                }
                let Some(task) = self.tasks.get_mut(&dep_id) else {
                    continue;
                };
                if task.status != TaskStatus::Pending {
                    continue;
                }
                if task.skippable_on_dep_failure {
                    task.status = TaskStatus::Skipped;
                } else {
                    task.status = TaskStatus::Failed;
                    affected.push(dep_id);
                    stack.push(dep_id);
                }
            }
        }
        affected
    }

    pub fn all_terminal(&self) -> bool {
        self.tasks.values().all(|t| {
            matches!(
                t.status,
                TaskStatus::Done | TaskStatus::Failed | TaskStatus::Cancelled | TaskStatus::Skipped
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u64, deps: Vec<u64>, skippable: bool) -> Task {
        Task {
            id: TaskId(id),
            feature: Feature::Dubtitles,
            item_id: "item-1".into(),
            sub_range: None,
            dependencies: deps.into_iter().map(TaskId).collect(),
            retry_count: 0,
            status: TaskStatus::Pending,
            priority: 0,
            skippable_on_dep_failure: skippable,
        }
    }

    #[test]
    fn task_runnable_only_when_dependencies_done() {
        let mut dag = Dag::new();
        dag.insert(task(1, vec![], false));
        dag.insert(task(2, vec![1], false));
        assert_eq!(dag.runnable(), vec![TaskId(1)]);

        dag.get_mut(TaskId(1)).unwrap().status = TaskStatus::Done;
        assert_eq!(dag.runnable(), vec![TaskId(2)]);
    }

    #[test]
    fn failure_propagates_unless_skippable() {
        let mut dag = Dag::new();
        dag.insert(task(1, vec![], false));
        dag.insert(task(2, vec![1], false));
        dag.insert(task(3, vec![1], true));

        dag.get_mut(TaskId(1)).unwrap().status = TaskStatus::Failed;
        let affected = dag.propagate_failure(TaskId(1));

        assert_eq!(affected, vec![TaskId(2)]);
        assert_eq!(dag.get(TaskId(2)).unwrap().status, TaskStatus::Failed);
        assert_eq!(dag.get(TaskId(3)).unwrap().status, TaskStatus::Skipped);
    }

    #[test]
    fn priority_breaks_ties_before_id() {
        let mut dag = Dag::new();
        let mut low = task(1, vec![], false);
        low.priority = 0;
        let mut high = task(2, vec![], false);
        high.priority = 10;
        dag.insert(low);
        dag.insert(high);
        assert_eq!(dag.runnable(), vec![TaskId(2), TaskId(1)]);
    }
}

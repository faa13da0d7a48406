//! Dependency bookkeeping for one scheduler.
//!
//! Edges point from predecessor to successor: `add_edge(a, b)` means `b` cannot start before
//! `a` finished. The graph only tracks tasks that are still waiting; once a task is admitted it
//! is removed, and once a predecessor finishes its outgoing edges are released.
//!
//! No cycle detection happens here. A cycle simply never releases; see
//! [`cycle_detection`](crate::cycle_detection) for the opt-in check done at submission.

use std::collections::{HashMap, HashSet};

use crate::types::TaskId;

#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
    /// task -> predecessors it is still waiting for
    waiting_on: HashMap<TaskId, HashSet<TaskId>>,
    /// predecessor -> tasks waiting for it
    dependents: HashMap<TaskId, Vec<TaskId>>,
}

impl DependencyGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start tracking `task`. Idempotent.
    pub(crate) fn insert(&mut self, task: TaskId) {
        self.waiting_on.entry(task).or_default();
    }

    /// `to` waits for `from`. Duplicate edges are ignored.
    pub(crate) fn add_edge(&mut self, from: TaskId, to: TaskId) {
        if self.waiting_on.entry(to).or_default().insert(from) {
            self.dependents.entry(from).or_default().push(to);
        }
    }

    /// Whether some tracked task still waits for `from`.
    pub(crate) fn has_dependents(&self, from: TaskId) -> bool {
        self.dependents.contains_key(&from)
    }

    /// Tracked and not waiting for anything.
    pub(crate) fn is_ready(&self, task: TaskId) -> bool {
        self.waiting_on
            .get(&task)
            .is_some_and(|predecessors| predecessors.is_empty())
    }

    /// Release every edge leaving `finished` and return the tasks that became ready, in the
    /// order their edges were added.
    pub(crate) fn on_finished(&mut self, finished: TaskId) -> Vec<TaskId> {
        let Some(dependents) = self.dependents.remove(&finished) else {
            return Vec::new();
        };

        dependents
            .into_iter()
            .filter(|dependent| match self.waiting_on.get_mut(dependent) {
                Some(predecessors) => predecessors.remove(&finished) && predecessors.is_empty(),
                None => false,
            })
            .collect()
    }

    /// Stop tracking `task` (it was admitted). Its own outgoing edges stay until it finishes.
    pub(crate) fn remove(&mut self, task: TaskId) {
        self.waiting_on.remove(&task);
    }

    /// Number of tracked (not yet admitted) tasks.
    #[cfg(any(test, feature = "tracing"))]
    pub(crate) fn len(&self) -> usize {
        self.waiting_on.len()
    }
}

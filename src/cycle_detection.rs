//! # Opt-in Cycle Detection
//!
//! Dependencies are ordinary runtime edges, so nothing stops a caller from wiring `A` to wait
//! for `B` and `B` to wait for `A`. By default such a configuration is accepted and the
//! scheduler stalls: neither task ever becomes ready, and
//! [`Scheduler::is_stalled`](crate::Scheduler::is_stalled) reports it.
//!
//! Schedulers built with [`SchedulerBuilder::detect_cycles`](crate::SchedulerBuilder::detect_cycles)
//! walk the predecessors of every submitted task and reject the submission with
//! [`ScheduleError::CycleDetected`](crate::ScheduleError::CycleDetected) instead.
//!
//! ```
//! use futures::executor::ThreadPool;
//! use procq::{ExecContext, ScheduleError, Scheduler, Spawner, Task};
//!
//! let pool = ThreadPool::new().unwrap();
//! let queue = Scheduler::builder()
//!     .detect_cycles(true)
//!     .build(Spawner::new(move |fut| pool.spawn_ok(fut)));
//!
//! let a = Task::from_fn(|_: ExecContext<()>| async { Ok(()) });
//! let b = Task::from_fn(|_: ExecContext<()>| async { Ok(()) });
//! a.add_dependency(&b).unwrap();
//! b.add_dependency(&a).unwrap();
//!
//! let err = queue.submit_all([a.erase(), b.erase()]).unwrap_err();
//! assert!(matches!(err, ScheduleError::CycleDetected { .. }));
//! ```
//!
//! Finished predecessors are never followed: they can no longer block anything.

use std::collections::HashMap;
use std::sync::Arc;

use crate::node::Node;
use crate::types::TaskId;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current DFS path
    Open,
    /// Fully explored, no cycle below
    Done,
}

/// Return the id of the first root whose predecessor closure contains a cycle.
pub(crate) fn find_cycle(roots: &[Arc<dyn Node>]) -> Option<TaskId> {
    let mut marks: HashMap<TaskId, Mark> = HashMap::new();

    for root in roots {
        if marks.contains_key(&root.id()) {
            continue;
        }

        // Explicit stack of (node, its predecessors, next predecessor index)
        let mut stack: Vec<(Arc<dyn Node>, Vec<Arc<dyn Node>>, usize)> = Vec::new();
        marks.insert(root.id(), Mark::Open);
        stack.push((Arc::clone(root), root.dependencies(), 0));

        while let Some((node, predecessors, next)) = stack.last_mut() {
            let Some(predecessor) = predecessors.get(*next).cloned() else {
                marks.insert(node.id(), Mark::Done);
                stack.pop();
                continue;
            };
            *next += 1;

            if predecessor.state().is_terminal() {
                continue;
            }

            match marks.get(&predecessor.id()) {
                Some(Mark::Open) => return Some(root.id()),
                Some(Mark::Done) => {}
                None => {
                    marks.insert(predecessor.id(), Mark::Open);
                    let deps = predecessor.dependencies();
                    stack.push((predecessor, deps, 0));
                }
            }
        }
    }

    None
}

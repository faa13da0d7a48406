//! Procedure queue: admission, worker slots and dependency release.
//!
//! Provides [`Scheduler`] for running tasks in dependency order with a bounded number of
//! concurrent executions. The scheduler never runs anything itself: admitted tasks are handed to
//! a user-supplied [`Spawner`], which keeps it runtime-agnostic.
//!
//! All queue state (graph, ready set, slot count) lives behind one mutex, which is the single
//! point of mutation. It is never held while spawning or while a task notifies observers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::BoxFuture;
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::{debug, info, trace, warn};

use crate::builder::SchedulerBuilder;
use crate::cycle_detection::find_cycle;
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::DependencyGraph;
use crate::handle::AnyTask;
use crate::node::Node;
use crate::types::TaskId;

/// Hands futures to an async runtime.
///
/// Examples:
/// - Tokio: `Spawner::new(|fut| { tokio::spawn(fut); })`
/// - Smol: `Spawner::new(|fut| smol::spawn(fut).detach())`
/// - futures thread pool: `Spawner::new(move |fut| pool.spawn_ok(fut))`
///
/// The closure may be called from any thread that finishes a task, so it must not rely on
/// thread-local runtime context unless every worker thread has it (tokio's do).
#[derive(Clone)]
pub struct Spawner(Arc<dyn Fn(BoxFuture<'static, ()>) + Send + Sync>);

impl Spawner {
    pub fn new<S>(spawner: S) -> Self
    where
        S: Fn(BoxFuture<'static, ()>) + Send + Sync + 'static,
    {
        Self(Arc::new(spawner))
    }

    pub fn spawn(&self, fut: BoxFuture<'static, ()>) {
        (self.0)(fut)
    }
}

impl fmt::Debug for Spawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Spawner")
    }
}

/// Point-in-time counters of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    /// Submitted, not admitted yet: waiting on dependencies plus ready.
    pub pending: usize,
    /// Pending tasks still waiting on at least one dependency.
    pub blocked: usize,
    /// Dependencies satisfied, waiting for a slot.
    pub ready: usize,
    /// Occupied worker slots.
    pub executing: usize,
    /// Tasks this scheduler saw finish.
    pub finished: u64,
    pub max_concurrent: usize,
}

pub(crate) struct QueueState {
    pub(crate) max_concurrent: usize,
    pub(crate) graph: DependencyGraph,
    /// Submitted and not yet admitted
    pub(crate) waiting: HashMap<TaskId, Arc<dyn Node>>,
    pub(crate) ready: VecDeque<TaskId>,
    pub(crate) executing: usize,
    pub(crate) finished: u64,
    pub(crate) idle_waiters: Vec<oneshot::Sender<()>>,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        self.waiting.is_empty() && self.executing == 0
    }

    fn make_ready(&mut self, id: TaskId) {
        self.graph.remove(id);
        if let Some(node) = self.waiting.get(&id) {
            node.mark_ready();
            self.ready.push_back(id);
        }
    }
}

pub(crate) struct Shared {
    pub(crate) name: Option<String>,
    pub(crate) spawner: Spawner,
    pub(crate) detect_cycles: bool,
    pub(crate) state: Mutex<QueueState>,
}

/// A queue that runs tasks in dependency order with bounded concurrency.
///
/// A `Scheduler` is a cheap handle; clones share the same queue. There is no global instance:
/// construct one and pass it where it is needed.
///
/// # Workflow
///
/// 1. Create a scheduler with [`Scheduler::new`] or [`Scheduler::builder`]
/// 2. Create tasks with [`Task::new`](crate::Task::new), wire them with
///    [`Task::depends_on`](crate::Task::depends_on) and [`bind`](crate::bind)
/// 3. Submit them with [`Scheduler::submit`] / [`Scheduler::submit_all`]
/// 4. Observe results through finish observers, [`Task::wait`](crate::Task::wait) or
///    [`Scheduler::wait_idle`]
///
/// # Examples
///
/// ```no_run
/// use procq::{ExecContext, Scheduler, Spawner, Task};
///
/// # async {
/// let queue = Scheduler::new(Spawner::new(|fut| { tokio::spawn(fut); }));
///
/// let seven = Task::from_fn(|_: ExecContext<()>| async { Ok(7) });
/// let square = Task::from_fn(|cx: ExecContext<i32>| async move {
///     let n = *cx.input()?;
///     Ok(n * n)
/// });
/// square.bind_input(&seven).unwrap();
/// square.add_dependency(&seven).unwrap();
///
/// queue.submit_all([seven.erase(), square.erase()]).unwrap();
/// assert_eq!(square.wait().await, Ok(49));
/// # };
/// ```
#[derive(Clone)]
pub struct Scheduler {
    pub(crate) shared: Arc<Shared>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.shared.name)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Scheduler {
    /// A serial queue (one task at a time) on the given spawner.
    pub fn new(spawner: Spawner) -> Self {
        SchedulerBuilder::new().build(spawner)
    }

    /// Configure a queue before creating it.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    pub(crate) fn from_parts(
        name: Option<String>,
        max_concurrent: usize,
        detect_cycles: bool,
        spawner: Spawner,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                spawner,
                detect_cycles,
                state: Mutex::new(QueueState {
                    max_concurrent,
                    graph: DependencyGraph::new(),
                    waiting: HashMap::new(),
                    ready: VecDeque::new(),
                    executing: 0,
                    finished: 0,
                    idle_waiters: Vec::new(),
                }),
            }),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.shared.name.as_deref()
    }

    /// Submit one task and start admitting.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::AlreadySubmitted`] if the task was submitted before (to any queue)
    /// - [`ScheduleError::CycleDetected`] if cycle detection is on and the task closes a cycle
    pub fn submit(&self, task: impl Into<AnyTask>) -> ScheduleResult<()> {
        self.submit_all([task.into()])
    }

    /// Submit several tasks at once. The batch is validated as a whole: on error nothing is
    /// submitted.
    ///
    /// Tasks with no dependencies between them become ready in iteration order, so a serial
    /// queue runs them in exactly that order.
    pub fn submit_all<T>(&self, tasks: impl IntoIterator<Item = T>) -> ScheduleResult<()>
    where
        T: Into<AnyTask>,
    {
        let nodes: Vec<Arc<dyn Node>> = tasks.into_iter().map(|t| t.into().node).collect();
        self.shared.submit(nodes)?;
        self.shared.pump();
        Ok(())
    }

    /// Change how many tasks may execute at once. `0` is treated as `1`.
    ///
    /// Running tasks are never preempted; a lower limit only affects future admissions.
    pub fn set_max_concurrent(&self, max_concurrent: usize) {
        {
            let mut state = self.shared.state.lock();
            state.max_concurrent = clamp_concurrency(max_concurrent);

            #[cfg(feature = "tracing")]
            debug!(
                queue = ?self.shared.name,
                max_concurrent = state.max_concurrent,
                "concurrency limit changed"
            );
        }
        self.shared.pump();
    }

    pub fn max_concurrent(&self) -> usize {
        self.shared.state.lock().max_concurrent
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.shared.state.lock();
        QueueStats {
            pending: state.waiting.len(),
            blocked: state.waiting.len().saturating_sub(state.ready.len()),
            ready: state.ready.len(),
            executing: state.executing,
            finished: state.finished,
            max_concurrent: state.max_concurrent,
        }
    }

    /// Nothing pending and nothing executing.
    pub fn is_idle(&self) -> bool {
        self.shared.state.lock().is_idle()
    }

    /// Tasks are pending, none is ready and none is executing: no local progress is possible.
    ///
    /// This is what a dependency cycle (or a predecessor that was never submitted) looks like.
    /// A task waiting on a predecessor owned by another, still busy, scheduler also reports as
    /// stalled here until that predecessor finishes.
    pub fn is_stalled(&self) -> bool {
        let state = self.shared.state.lock();
        let stalled = !state.waiting.is_empty() && state.ready.is_empty() && state.executing == 0;

        #[cfg(feature = "tracing")]
        if stalled {
            warn!(
                queue = ?self.shared.name,
                blocked = state.graph.len(),
                "queue is stalled: pending tasks can never become ready"
            );
        }

        stalled
    }

    /// Resolves once nothing is pending or executing. Resolves immediately on an idle queue and
    /// never on a stalled one.
    pub async fn wait_idle(&self) {
        let rx = {
            let mut state = self.shared.state.lock();
            if state.is_idle() {
                return;
            }
            let (tx, rx) = oneshot::channel();
            state.idle_waiters.push(tx);
            rx
        };
        let _ = rx.await;
    }
}

impl Shared {
    fn submit(self: &Arc<Self>, nodes: Vec<Arc<dyn Node>>) -> ScheduleResult<()> {
        let mut state = self.state.lock();

        let mut seen = HashSet::new();
        for node in &nodes {
            if !seen.insert(node.id()) || node.is_attached() {
                return Err(ScheduleError::AlreadySubmitted { task_id: node.id() });
            }
        }

        if self.detect_cycles {
            if let Some(task_id) = find_cycle(&nodes) {
                #[cfg(feature = "tracing")]
                warn!(queue = ?self.name, %task_id, "rejecting submission that closes a cycle");

                return Err(ScheduleError::CycleDetected { task_id });
            }
        }

        // Another queue may have claimed a task since the check above; then the whole batch
        // is released again before the graph is touched.
        for (attached, node) in nodes.iter().enumerate() {
            if let Err(err) = node.attach(Arc::downgrade(self)) {
                for node in &nodes[..attached] {
                    node.detach();
                }
                return Err(err);
            }
        }

        for node in nodes {
            let id = node.id();

            #[cfg(feature = "tracing")]
            debug!(queue = ?self.name, task_id = %id, name = ?node.name(), "task submitted");

            state.graph.insert(id);
            for dependency in node.dependencies() {
                let from = dependency.id();
                // One listener per predecessor is enough: it releases every edge leaving it.
                if !state.graph.has_dependents(from) {
                    let queue = Arc::downgrade(self);
                    let registered = dependency.watch(Box::new(move |finished| {
                        if let Some(queue) = queue.upgrade() {
                            queue.predecessor_finished(finished);
                        }
                    }));
                    if !registered {
                        continue;
                    }
                }

                #[cfg(feature = "tracing")]
                trace!(queue = ?self.name, from = %from, to = %id, "dependency edge added");

                state.graph.add_edge(from, id);
            }

            state.waiting.insert(id, node);
            if state.graph.is_ready(id) {
                state.make_ready(id);
            }
        }

        Ok(())
    }

    /// Admit ready tasks while slots are free.
    fn pump(self: &Arc<Self>) {
        let admitted: Vec<Arc<dyn Node>> = {
            let mut state = self.state.lock();
            let mut admitted = Vec::new();
            while state.executing < state.max_concurrent {
                let Some(id) = state.ready.pop_front() else {
                    break;
                };
                let Some(node) = state.waiting.remove(&id) else {
                    continue;
                };
                state.executing += 1;
                admitted.push(node);
            }
            admitted
        };

        for node in admitted {
            #[cfg(feature = "tracing")]
            trace!(queue = ?self.name, task_id = %node.id(), "admitting task");

            let run = node.start(self.spawner.clone());
            // Keep the queue alive while one of its tasks runs, so finish can be reported.
            let keep_alive = Arc::clone(self);
            self.spawner.spawn(Box::pin(async move {
                run.await;
                drop(keep_alive);
            }));
        }
    }

    fn predecessor_finished(self: &Arc<Self>, finished: TaskId) {
        {
            let mut state = self.state.lock();
            for id in state.graph.on_finished(finished) {
                #[cfg(feature = "tracing")]
                trace!(queue = ?self.name, task_id = %id, "dependencies satisfied");

                state.make_ready(id);
            }
        }
        self.pump();
    }

    /// Release the slot of a task that was admitted here.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub(crate) fn task_finished(self: &Arc<Self>, id: TaskId) {
        {
            let mut state = self.state.lock();
            state.executing = state.executing.saturating_sub(1);
            state.finished += 1;

            #[cfg(feature = "tracing")]
            trace!(queue = ?self.name, task_id = %id, executing = state.executing, "slot released");
        }

        self.pump();

        let waiters = {
            let mut state = self.state.lock();
            if state.is_idle() {
                std::mem::take(&mut state.idle_waiters)
            } else {
                Vec::new()
            }
        };
        if !waiters.is_empty() {
            #[cfg(feature = "tracing")]
            info!(queue = ?self.name, "queue idle");
        }
        for waiter in waiters {
            let _ = waiter.send(());
        }
    }
}

pub(crate) fn clamp_concurrency(max_concurrent: usize) -> usize {
    if max_concurrent == 0 {
        #[cfg(feature = "tracing")]
        warn!("max_concurrent of 0 would never admit anything, using 1");
        1
    } else {
        max_concurrent
    }
}

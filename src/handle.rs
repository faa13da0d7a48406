//! Public task handles.
//!
//! [`Task<I, O>`] is the typed handle callers build, wire and observe. [`AnyTask`] is the same
//! task with its types erased, for heterogeneous collections (scheduler batches, group
//! children, dependency lists).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::BoxFuture;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::deps::Dependencies;
use crate::error::{Outcome, ScheduleResult, TaskError};
use crate::node::{Body, Node, TaskCore};
use crate::observer::bind;
use crate::task::{procedure_fn, ExecContext, Procedure};
use crate::types::{Slot, TaskId, TaskState};

/// A schedulable unit of work with a typed input slot and a typed output slot.
///
/// `Task` is a cheap, cloneable handle: clones refer to the same task. Configure it (name,
/// dependencies, observers, bindings, input) before submitting it to a
/// [`Scheduler`](crate::Scheduler). Once finished it is immutable.
///
/// # Examples
///
/// ```no_run
/// use procq::{ExecContext, Scheduler, Spawner, Task, TaskError};
///
/// # async {
/// let queue = Scheduler::new(Spawner::new(|fut| { tokio::spawn(fut); }));
///
/// let greet = Task::with_input(
///     procq::procedure_fn(|cx: ExecContext<String>| async move {
///         let name = cx.input()?;
///         if name.is_empty() {
///             return Err(cx.invalid_input("empty name"));
///         }
///         Ok(format!("Hello, {name}"))
///     }),
///     "Dan".to_string(),
/// )
/// .with_name("greet");
///
/// greet.on_finish(|error: Option<&TaskError>| assert!(error.is_none())).unwrap();
/// queue.submit(&greet).unwrap();
///
/// assert_eq!(greet.wait().await.unwrap(), "Hello, Dan");
/// # };
/// ```
pub struct Task<I, O> {
    pub(crate) core: Arc<TaskCore<I, O>>,
}

impl<I, O> Clone for Task<I, O> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<I, O> fmt::Debug for Task<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.core.inner.lock();
        f.debug_struct("Task")
            .field("id", &self.core.id)
            .field("name", &inner.name)
            .field("state", &inner.state)
            .finish()
    }
}

impl<I, O> Task<I, O>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
{
    /// Wrap a procedure. The input slot starts unset.
    pub fn new<P>(procedure: P) -> Self
    where
        P: Procedure<Input = I, Output = O>,
    {
        Self::from_slot(procedure, Slot::Unset)
    }

    /// Wrap a procedure with an initial input value.
    pub fn with_input<P>(procedure: P, input: I) -> Self
    where
        P: Procedure<Input = I, Output = O>,
    {
        Self::from_slot(procedure, Slot::Ready(input))
    }

    /// Shorthand for `Task::new(procedure_fn(f))`.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(ExecContext<I>) -> Fut + Send + 'static,
        Fut: Future<Output = Outcome<O>> + Send + 'static,
    {
        Self::new(procedure_fn(f))
    }

    fn from_slot<P>(procedure: P, input: Slot<I>) -> Self
    where
        P: Procedure<Input = I, Output = O>,
    {
        let body: Body<I, O> = Box::new(move |cx: ExecContext<I>| -> BoxFuture<'static, Outcome<O>> {
            Box::pin(procedure.execute(cx))
        });
        let core = TaskCore::new(body, input);

        #[cfg(feature = "tracing")]
        debug!(
            task_id = %core.id,
            procedure = std::any::type_name::<P>(),
            "task created"
        );

        Self {
            core: Arc::new(core),
        }
    }

    /// Attach a debugging name.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.core.inner.lock().name = Some(name.into());
        self
    }

    pub fn id(&self) -> TaskId {
        self.core.id
    }

    pub fn name(&self) -> Option<String> {
        self.core.inner.lock().name.clone()
    }

    pub fn state(&self) -> TaskState {
        self.core.inner.lock().state
    }

    pub fn is_finished(&self) -> bool {
        self.state() == TaskState::Finished
    }

    /// Whether cancellation was requested (the task may still be running or finishing).
    pub fn is_cancelled(&self) -> bool {
        self.core.inner.lock().cancellation.is_some()
    }

    /// Make this task wait until `other` finished.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::SelfDependency`](crate::ScheduleError::SelfDependency)
    /// - [`ScheduleError::Sealed`](crate::ScheduleError::Sealed) once this task was submitted
    pub fn add_dependency(&self, other: impl Into<AnyTask>) -> ScheduleResult<()> {
        self.core.add_dependency(other.into().node)
    }

    /// Add several dependencies: a task, a tuple of up to 8 tasks, or a collection of
    /// [`AnyTask`].
    ///
    /// ```
    /// use procq::{ExecContext, Task};
    ///
    /// let a = Task::from_fn(|_: ExecContext<()>| async { Ok(1) });
    /// let b = Task::from_fn(|_: ExecContext<()>| async { Ok("two") });
    /// let c = Task::from_fn(|_: ExecContext<()>| async { Ok(()) });
    ///
    /// c.depends_on((&a, &b)).unwrap();
    /// ```
    pub fn depends_on<D: Dependencies>(&self, dependencies: D) -> ScheduleResult<()> {
        let nodes = dependencies.into_nodes();

        #[cfg(feature = "tracing")]
        debug!(
            task_id = %self.core.id,
            dependency_ids = ?nodes.iter().map(|n| n.id()).collect::<Vec<_>>(),
            "wiring task dependencies"
        );

        for node in nodes {
            self.core.add_dependency(node)?;
        }
        Ok(())
    }

    /// Register a finish observer. Observers run once, in registration order, with the error
    /// the task finished with (or `None` on success).
    pub fn on_finish<F>(&self, observer: F) -> ScheduleResult<()>
    where
        F: FnOnce(Option<&TaskError>) + Send + 'static,
    {
        self.core.on_finish(Box::new(observer))
    }

    /// Register a cancel observer. It runs once, when cancellation is requested, or right away
    /// if cancellation was already requested.
    pub fn on_cancel<F>(&self, observer: F) -> ScheduleResult<()>
    where
        F: FnOnce(&TaskError) + Send + 'static,
    {
        self.core.on_cancel(Box::new(observer))
    }

    /// Set the input value. Allowed until the task starts executing.
    pub fn set_input(&self, value: I) -> ScheduleResult<()> {
        self.core.set_input(value)
    }

    /// Current input slot (cloned).
    pub fn input(&self) -> Slot<I> {
        self.core.inner.lock().input.clone()
    }

    /// The recorded outcome, `None` until the task finishes.
    pub fn output(&self) -> Option<Outcome<O>> {
        self.core.output()
    }

    /// Feed `source`'s output into this task's input. See [`bind`].
    pub fn bind_input<S>(&self, source: &Task<S, I>) -> ScheduleResult<()>
    where
        S: Clone + Send + 'static,
    {
        bind(self, source)
    }

    /// Request cancellation with the default [`TaskError::Cancelled`] error.
    pub fn cancel(&self) {
        self.core.cancel(self.core.cancellation_error(None));
    }

    /// Request cancellation with a reason.
    pub fn cancel_because(&self, reason: impl Into<String>) {
        self.core
            .cancel(self.core.cancellation_error(Some(reason.into())));
    }

    /// Request cancellation with a specific error, which becomes the task's outcome.
    pub fn cancel_with(&self, error: TaskError) {
        self.core.cancel(error);
    }

    /// Resolves with the final outcome once the task finished.
    ///
    /// Never resolves for a task that is never submitted or sits in a stalled queue.
    pub fn wait(&self) -> impl Future<Output = Outcome<O>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        let registered = self.core.watch(Box::new(move |_| {
            let _ = tx.send(());
        }));
        let core = Arc::clone(&self.core);
        async move {
            if registered {
                let _ = rx.await;
            }
            core.output()
                .unwrap_or(Err(TaskError::MissingOutput { task_id: core.id }))
        }
    }

    /// Erase the input/output types.
    pub fn erase(&self) -> AnyTask {
        AnyTask {
            node: Arc::clone(&self.core) as Arc<dyn Node>,
        }
    }
}

/// A task with its input/output types erased.
///
/// Obtained with [`Task::erase`] or `AnyTask::from(&task)`.
#[derive(Clone)]
pub struct AnyTask {
    pub(crate) node: Arc<dyn Node>,
}

impl AnyTask {
    pub fn id(&self) -> TaskId {
        self.node.id()
    }

    pub fn name(&self) -> Option<String> {
        self.node.name()
    }

    pub fn state(&self) -> TaskState {
        self.node.state()
    }

    pub fn cancel(&self) {
        self.node.cancel(self.node.cancellation_error(None));
    }

    pub fn cancel_with(&self, error: TaskError) {
        self.node.cancel(error);
    }

    pub fn add_dependency(&self, other: impl Into<AnyTask>) -> ScheduleResult<()> {
        self.node.add_dependency(other.into().node)
    }

    pub fn on_finish<F>(&self, observer: F) -> ScheduleResult<()>
    where
        F: FnOnce(Option<&TaskError>) + Send + 'static,
    {
        self.node.on_finish(Box::new(observer))
    }
}

impl fmt::Debug for AnyTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyTask")
            .field("id", &self.node.id())
            .field("name", &self.node.name())
            .field("state", &self.node.state())
            .finish()
    }
}

impl<I, O> From<&Task<I, O>> for AnyTask
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
{
    fn from(task: &Task<I, O>) -> Self {
        task.erase()
    }
}

impl<I, O> From<Task<I, O>> for AnyTask
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
{
    fn from(task: Task<I, O>) -> Self {
        task.erase()
    }
}

impl From<&AnyTask> for AnyTask {
    fn from(task: &AnyTask) -> Self {
        task.clone()
    }
}

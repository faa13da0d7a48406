//! Groups: tasks made of tasks.
//!
//! A [`Group`] is a [`Procedure`] whose work is running its children on a private
//! [`Scheduler`]. Wrapped in a [`Task`], it is scheduled like any other task, and its single
//! finish is triggered by the engine when the last child finishes. There is no way to finish a
//! group by hand.
//!
//! # Error aggregation
//!
//! The first child error (in finish order) becomes the group's error; later child errors are
//! seen by the `on_child_finished` hook but do not override it. Siblings are not cancelled when
//! a child fails unless [`Group::cancel_on_error`] is set.

use std::fmt;
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::{self, Either};
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::builder::DEFAULT_MAX_CONCURRENT;
use crate::error::{Outcome, TaskError};
use crate::handle::{AnyTask, Task};
use crate::node::Node;
use crate::scheduler::Scheduler;
use crate::task::{ExecContext, Procedure};

type ChildHook = Arc<dyn Fn(&AnyTask, Option<&TaskError>) + Send + Sync>;
type InputForward<I> = Box<dyn FnOnce(I) -> Outcome<()> + Send>;
type OutputSource<O> = Box<dyn FnOnce() -> Outcome<O> + Send>;

/// A composite procedure: ordered children on a private queue.
///
/// `I` is the group's input (forwarded to one child with [`Group::input_to`]) and `O` its
/// output (taken from one child with [`Group::output_from`]). Both default to `()`.
///
/// # Examples
///
/// ```no_run
/// use procq::{ExecContext, Group, Scheduler, Spawner, Task};
///
/// # async {
/// let queue = Scheduler::new(Spawner::new(|fut| { tokio::spawn(fut); }));
///
/// let fetch = Task::from_fn(|_: ExecContext<()>| async { Ok(7_i64) });
/// let square = Task::from_fn(|cx: ExecContext<i64>| async move {
///     let n = *cx.input()?;
///     Ok(n * n)
/// });
/// square.bind_input(&fetch).unwrap();
/// square.add_dependency(&fetch).unwrap();
///
/// let group = Group::new()
///     .child(&fetch)
///     .child(&square)
///     .output_from(&square)
///     .into_task();
///
/// queue.submit(&group).unwrap();
/// assert_eq!(group.wait().await, Ok(49));
/// # };
/// ```
pub struct Group<I = (), O = ()> {
    name: Option<String>,
    children: Vec<AnyTask>,
    max_concurrent: usize,
    cancel_on_error: bool,
    hook: Option<ChildHook>,
    input: Option<InputForward<I>>,
    output: OutputSource<O>,
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

impl Group {
    /// An empty group with no input and a `()` output.
    pub fn new() -> Self {
        Self {
            name: None,
            children: Vec::new(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            cancel_on_error: false,
            hook: None,
            input: None,
            output: Box::new(|| Ok(())),
        }
    }
}

impl<I, O> fmt::Debug for Group<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("children", &self.children)
            .field("max_concurrent", &self.max_concurrent)
            .field("cancel_on_error", &self.cancel_on_error)
            .finish_non_exhaustive()
    }
}

impl<I, O> Group<I, O>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
{
    /// Name of the private queue, for logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a child. Children are submitted to the private queue in this order.
    pub fn child(mut self, child: impl Into<AnyTask>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<T>(mut self, children: impl IntoIterator<Item = T>) -> Self
    where
        T: Into<AnyTask>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Concurrency of the private queue, independent of the outer queue. Defaults to 1.
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Cancel the children that have not finished yet as soon as one child fails.
    pub fn cancel_on_error(mut self, cancel_on_error: bool) -> Self {
        self.cancel_on_error = cancel_on_error;
        self
    }

    /// Run `hook` for every child exactly once, as it finishes and before the group counts it
    /// as done. The hook sees the child's error, if any.
    ///
    /// This is the place for manual value passing between children: the finishing child's
    /// output is already recorded and its dependents have not been released yet.
    pub fn on_child_finished<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AnyTask, Option<&TaskError>) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Forward the group's input to `child` when the group starts.
    pub fn input_to<X, Y>(self, child: &Task<X, Y>) -> Group<X, O>
    where
        X: Clone + Send + 'static,
        Y: Clone + Send + 'static,
    {
        let child = child.clone();
        Group {
            name: self.name,
            children: self.children,
            max_concurrent: self.max_concurrent,
            cancel_on_error: self.cancel_on_error,
            hook: self.hook,
            input: Some(Box::new(move |value: X| {
                child.set_input(value).map_err(TaskError::from)
            })),
            output: self.output,
        }
    }

    /// Use `child`'s output as the group's output.
    ///
    /// If every child succeeded but `child` has no output (it was never part of the group, or
    /// was cancelled), the group fails with [`TaskError::MissingOutput`].
    pub fn output_from<X, Y>(self, child: &Task<X, Y>) -> Group<I, Y>
    where
        X: Clone + Send + 'static,
        Y: Clone + Send + 'static,
    {
        let child = child.clone();
        Group {
            name: self.name,
            children: self.children,
            max_concurrent: self.max_concurrent,
            cancel_on_error: self.cancel_on_error,
            hook: self.hook,
            input: self.input,
            output: Box::new(move || {
                child.output().unwrap_or(Err(TaskError::MissingOutput {
                    task_id: child.id(),
                }))
            }),
        }
    }

    /// Wrap the group in a task.
    pub fn into_task(self) -> Task<I, O> {
        Task::new(self)
    }
}

struct Progress {
    finished: usize,
    first_error: Option<TaskError>,
    done: Option<oneshot::Sender<()>>,
}

impl Progress {
    /// Returns `true` for the first error.
    fn record_error(&mut self, error: &TaskError) -> bool {
        if self.first_error.is_some() {
            return false;
        }
        self.first_error = Some(error.clone());
        true
    }

    fn child_finished(&mut self, total: usize) {
        self.finished += 1;
        if self.finished == total {
            if let Some(done) = self.done.take() {
                let _ = done.send(());
            }
        }
    }
}

impl<I, O> Procedure for Group<I, O>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
{
    type Input = I;
    type Output = O;

    async fn execute(self, mut cx: ExecContext<I>) -> Outcome<O> {
        if let Some(forward) = self.input {
            forward(cx.take_input()?)?;
        }

        let total = self.children.len();
        if total == 0 {
            return (self.output)();
        }

        #[cfg(feature = "tracing")]
        debug!(group = %cx.id(), children = total, "group starting");

        let (done_tx, done_rx) = oneshot::channel();
        let progress = Arc::new(Mutex::new(Progress {
            finished: 0,
            first_error: None,
            done: Some(done_tx),
        }));

        // Errors and the hook are seen from the finish observer, while the child is Finishing.
        for child in &self.children {
            let progress = Arc::clone(&progress);
            let hook = self.hook.clone();
            let siblings = self.cancel_on_error.then(|| self.children.clone());
            let this = child.clone();
            child.on_finish(move |error| {
                let first_failure = match error {
                    Some(error) => progress.lock().record_error(error),
                    None => false,
                };

                if let Some(hook) = &hook {
                    hook(&this, error);
                }

                if first_failure {
                    for sibling in siblings.iter().flatten() {
                        if sibling.id() != this.id() {
                            sibling.cancel();
                        }
                    }
                }
            })?;
        }

        // Completion is counted once a child is Finished, so the group never finishes ahead of
        // one of its children.
        for child in &self.children {
            let watcher = Arc::clone(&progress);
            let registered = child.node.watch(Box::new(move |_child_id| {
                #[cfg(feature = "tracing")]
                trace!(child = %_child_id, "group child finished");

                watcher.lock().child_finished(total);
            }));
            if !registered {
                progress.lock().child_finished(total);
            }
        }

        let queue = {
            let builder = Scheduler::builder().max_concurrent(self.max_concurrent);
            let builder = match &self.name {
                Some(name) => builder.name(name.clone()),
                None => builder,
            };
            builder.build(cx.spawner().clone())
        };
        queue.submit_all(self.children.iter())?;

        // Wait for every child; a cancelled group cancels its children but still waits for
        // them so that none is leaked.
        let cancelled = cx.cancelled();
        futures::pin_mut!(cancelled);
        let done_rx = match future::select(done_rx, cancelled).await {
            Either::Left(_) => None,
            Either::Right((_, done_rx)) => Some(done_rx),
        };
        if let Some(done_rx) = done_rx {
            #[cfg(feature = "tracing")]
            debug!(group = %cx.id(), "group cancelled, cancelling children");

            for child in &self.children {
                child.cancel();
            }
            let _ = done_rx.await;
        }

        let first_error = progress.lock().first_error.take();

        #[cfg(feature = "tracing")]
        debug!(group = %cx.id(), failed = first_error.is_some(), "group finished");

        match first_error {
            Some(error) => Err(error),
            None => (self.output)(),
        }
    }
}

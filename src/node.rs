//! Internal task storage and lifecycle.
//!
//! Provides type erasure so that schedulers can hold tasks with different input/output types in
//! a single collection. The public API ([`Task<I, O>`](crate::Task)) stays fully typed; type
//! erasure is purely an internal implementation detail.
//!
//! - **TaskCore\<I, O\>**: a task with full type information, its slots and its observers
//! - **Node**: object-safe trait the scheduler drives
//!
//! # Locking
//!
//! Every task has one mutex around its mutable state. It is never held while calling out:
//! observers, bindings, completion listeners and the owning scheduler all run after the guard
//! is dropped. Schedulers may lock a task while holding their own lock; the reverse never
//! happens.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::{debug, error, trace};

use crate::error::{Outcome, ScheduleError, ScheduleResult, TaskError};
use crate::scheduler::{Shared, Spawner};
use crate::task::{CancelSignal, ExecContext};
use crate::types::{Slot, TaskId, TaskState};

/// The payload, erased to a boxed future factory.
pub(crate) type Body<I, O> = Box<dyn FnOnce(ExecContext<I>) -> BoxFuture<'static, Outcome<O>> + Send>;

/// Called with the error (if any) once the outcome is recorded.
pub(crate) type FinishObserver = Box<dyn FnOnce(Option<&TaskError>) + Send>;

/// Called with the cancellation error when cancellation is requested.
pub(crate) type CancelObserver = Box<dyn FnOnce(&TaskError) + Send>;

/// Called with the producer's value before its finish observers run.
pub(crate) type OutputSink<O> = Box<dyn FnOnce(&O) + Send>;

/// Called once the task is Finished. Used by schedulers waiting on a predecessor.
pub(crate) type CompletionListener = Box<dyn FnOnce(TaskId) + Send>;

fn panic_message(panic_payload: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Internal trait for driving heterogeneous tasks.
///
/// This trait provides the type erasure needed to store different task types in one scheduler.
/// [`TaskCore`] knows the concrete types and implements it.
pub(crate) trait Node: Send + Sync {
    fn id(&self) -> TaskId;

    fn name(&self) -> Option<String>;

    fn state(&self) -> TaskState;

    /// Predecessors that have not been released yet. Empty once the task finished.
    fn dependencies(&self) -> Vec<Arc<dyn Node>>;

    /// Record the owning scheduler. Fails if the task was already submitted somewhere.
    fn attach(&self, queue: Weak<Shared>) -> ScheduleResult<()>;

    /// Undo [`Node::attach`] for a batch that could not be submitted as a whole.
    fn detach(&self);

    /// Whether the task has been attached to a scheduler.
    fn is_attached(&self) -> bool;

    /// Register a listener for the Finished transition.
    ///
    /// Returns `false` (dropping the listener) if the task already finished.
    fn watch(&self, listener: CompletionListener) -> bool;

    /// Pending -> Ready. Called by the scheduler when the last dependency is released.
    fn mark_ready(&self);

    /// Take the payload and build the future that runs it and finishes the task.
    ///
    /// # Panics
    ///
    /// If the task was already started. The scheduler starts each task once; a second start is
    /// an engine bug.
    fn start(self: Arc<Self>, spawner: Spawner) -> BoxFuture<'static, ()>;

    fn cancel(&self, error: TaskError);

    fn cancellation_error(&self, reason: Option<String>) -> TaskError;

    fn on_finish(&self, observer: FinishObserver) -> ScheduleResult<()>;

    fn add_dependency(&self, dependency: Arc<dyn Node>) -> ScheduleResult<()>;
}

pub(crate) struct Inner<I, O> {
    pub(crate) name: Option<String>,
    pub(crate) state: TaskState,
    pub(crate) cancellation: Option<TaskError>,
    pub(crate) input: Slot<I>,
    pub(crate) output: Slot<Outcome<O>>,
    pub(crate) dependencies: Vec<Arc<dyn Node>>,
    pub(crate) finish_observers: Vec<FinishObserver>,
    pub(crate) cancel_observers: Vec<CancelObserver>,
    pub(crate) output_sinks: Vec<OutputSink<O>>,
    pub(crate) listeners: Vec<CompletionListener>,
    pub(crate) queue: Option<Weak<Shared>>,
    pub(crate) started: bool,
}

/// Fully-typed storage for a single task.
///
/// # Ownership Model
///
/// The payload sits in its own mutex and is taken (consumed) when the task starts. Everything
/// else (state, slots, observers) lives in `inner`.
pub(crate) struct TaskCore<I, O> {
    pub(crate) id: TaskId,
    pub(crate) body: Mutex<Option<Body<I, O>>>,
    pub(crate) inner: Mutex<Inner<I, O>>,
    pub(crate) cancel: Arc<CancelSignal>,
}

impl<I, O> TaskCore<I, O>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
{
    pub(crate) fn new(body: Body<I, O>, input: Slot<I>) -> Self {
        Self {
            id: TaskId::next(),
            body: Mutex::new(Some(body)),
            inner: Mutex::new(Inner {
                name: None,
                state: TaskState::Pending,
                cancellation: None,
                input,
                output: Slot::Unset,
                dependencies: Vec::new(),
                finish_observers: Vec::new(),
                cancel_observers: Vec::new(),
                output_sinks: Vec::new(),
                listeners: Vec::new(),
                queue: None,
                started: false,
            }),
            cancel: Arc::new(CancelSignal::default()),
        }
    }

    /// Input may change until the payload has taken its copy.
    pub(crate) fn set_input(&self, value: I) -> ScheduleResult<()> {
        let mut inner = self.inner.lock();
        if inner.started || inner.state.is_terminal() {
            return Err(ScheduleError::Sealed {
                task_id: self.id,
                what: "set input",
            });
        }
        inner.input.set(value);
        Ok(())
    }

    pub(crate) fn output(&self) -> Option<Outcome<O>> {
        self.inner.lock().output.get().cloned()
    }

    pub(crate) fn add_output_sink(&self, sink: OutputSink<O>) -> ScheduleResult<()> {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return Err(ScheduleError::Sealed {
                task_id: self.id,
                what: "bind output",
            });
        }
        inner.output_sinks.push(sink);
        Ok(())
    }

    /// Register a cancel observer. If cancellation was already requested it runs right away.
    pub(crate) fn on_cancel(&self, observer: CancelObserver) -> ScheduleResult<()> {
        let cancellation = {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() {
                return Err(ScheduleError::Sealed {
                    task_id: self.id,
                    what: "add a cancel observer",
                });
            }
            match &inner.cancellation {
                Some(error) => error.clone(),
                None => {
                    inner.cancel_observers.push(observer);
                    return Ok(());
                }
            }
        };
        self.contain("cancel observer", || observer(&cancellation));
        Ok(())
    }

    /// Run a user callback. A panic is logged and swallowed so the lifecycle always completes.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn contain(&self, what: &'static str, callback: impl FnOnce()) {
        if let Err(panic_payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
            let panic_message = panic_message(panic_payload.as_ref());

            #[cfg(feature = "tracing")]
            error!(task_id = %self.id, callback = what, %panic_message, "callback panicked");
        }
    }

    /// Record the outcome, notify everybody, report to the owning queue.
    ///
    /// Order: output slot, output bindings, finish observers (registration order), Finished,
    /// completion listeners (dependents), owning scheduler. A dependent therefore always sees
    /// its predecessor's final output.
    ///
    /// # Panics
    ///
    /// If the task already finished. Finishing twice would desynchronize every scheduler and
    /// group watching this task.
    pub(crate) fn finish(&self, outcome: Outcome<O>) {
        let (outcome, sinks, observers) = {
            let mut inner = self.inner.lock();
            assert!(
                !inner.state.is_terminal(),
                "task {} finished more than once",
                self.id
            );
            let outcome = match &inner.cancellation {
                Some(error) => Err(error.clone()),
                None => outcome,
            };
            inner.state = TaskState::Finishing;
            inner.output.set(outcome.clone());
            inner.cancel_observers.clear();
            (
                outcome,
                std::mem::take(&mut inner.output_sinks),
                std::mem::take(&mut inner.finish_observers),
            )
        };

        #[cfg(feature = "tracing")]
        match &outcome {
            Ok(_) => debug!(task_id = %self.id, "task finishing"),
            Err(err) => debug!(task_id = %self.id, %err, "task finishing with error"),
        }

        if let Ok(value) = &outcome {
            for sink in sinks {
                self.contain("output binding", || sink(value));
            }
        }

        #[cfg(feature = "tracing")]
        trace!(
            task_id = %self.id,
            observer_count = observers.len(),
            "notifying finish observers"
        );

        let error = outcome.as_ref().err();
        for observer in observers {
            self.contain("finish observer", || observer(error));
        }

        let (listeners, queue) = {
            let mut inner = self.inner.lock();
            inner.state = TaskState::Finished;
            inner.dependencies.clear();
            (std::mem::take(&mut inner.listeners), inner.queue.take())
        };

        for listener in listeners {
            self.contain("completion listener", || listener(self.id));
        }

        if let Some(queue) = queue.and_then(|queue| queue.upgrade()) {
            queue.task_finished(self.id);
        }
    }
}

impl<I, O> Node for TaskCore<I, O>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
{
    fn id(&self) -> TaskId {
        self.id
    }

    fn name(&self) -> Option<String> {
        self.inner.lock().name.clone()
    }

    fn state(&self) -> TaskState {
        self.inner.lock().state
    }

    fn dependencies(&self) -> Vec<Arc<dyn Node>> {
        self.inner.lock().dependencies.clone()
    }

    fn attach(&self, queue: Weak<Shared>) -> ScheduleResult<()> {
        let mut inner = self.inner.lock();
        if inner.queue.is_some() || inner.started || inner.state.is_terminal() {
            return Err(ScheduleError::AlreadySubmitted { task_id: self.id });
        }
        inner.queue = Some(queue);
        Ok(())
    }

    fn detach(&self) {
        self.inner.lock().queue = None;
    }

    fn is_attached(&self) -> bool {
        let inner = self.inner.lock();
        inner.queue.is_some() || inner.started || inner.state.is_terminal()
    }

    fn watch(&self, listener: CompletionListener) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == TaskState::Finished {
            return false;
        }
        inner.listeners.push(listener);
        true
    }

    fn mark_ready(&self) {
        let mut inner = self.inner.lock();
        if inner.state == TaskState::Pending {
            inner.state = TaskState::Ready;
        }
    }

    fn start(self: Arc<Self>, spawner: Spawner) -> BoxFuture<'static, ()> {
        let (body, cx, cancelled) = {
            let mut inner = self.inner.lock();
            assert!(!inner.started, "task {} executed more than once", self.id);
            inner.started = true;
            if inner.cancellation.is_none() {
                inner.state = TaskState::Executing;
            }
            let body = self.body.lock().take();
            let cx = ExecContext::new(
                self.id,
                inner.name.clone(),
                inner.input.clone(),
                Arc::clone(&self.cancel),
                spawner,
            );
            (body, cx, inner.cancellation.clone())
        };

        Box::pin(async move {
            let outcome = match (cancelled, body) {
                (Some(error), _) => {
                    #[cfg(feature = "tracing")]
                    trace!(task_id = %self.id, "skipping payload of cancelled task");
                    Err(error)
                }
                (None, Some(body)) => {
                    #[cfg(feature = "tracing")]
                    trace!(task_id = %self.id, "executing task");

                    // Panics become errors so the task still finishes and releases its slot.
                    AssertUnwindSafe(body(cx))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic_payload| {
                            let panic_message = panic_message(panic_payload.as_ref());

                            #[cfg(feature = "tracing")]
                            error!(
                                task_id = %self.id,
                                panic_message = %panic_message,
                                "task panicked during execution"
                            );

                            Err(TaskError::Panicked {
                                task_id: self.id,
                                panic_message,
                            })
                        })
                }
                (None, None) => Err(TaskError::MissingOutput { task_id: self.id }),
            };
            self.finish(outcome);
        })
    }

    fn cancel(&self, error: TaskError) {
        let observers = {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() || inner.cancellation.is_some() {
                return;
            }
            inner.cancellation = Some(error.clone());
            inner.state = TaskState::Cancelled;
            std::mem::take(&mut inner.cancel_observers)
        };

        #[cfg(feature = "tracing")]
        debug!(task_id = %self.id, %error, "task cancelled");

        self.cancel.raise();
        for observer in observers {
            self.contain("cancel observer", || observer(&error));
        }
    }

    fn cancellation_error(&self, reason: Option<String>) -> TaskError {
        TaskError::Cancelled {
            task_id: self.id,
            reason,
        }
    }

    fn on_finish(&self, observer: FinishObserver) -> ScheduleResult<()> {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return Err(ScheduleError::Sealed {
                task_id: self.id,
                what: "add a finish observer",
            });
        }
        inner.finish_observers.push(observer);
        Ok(())
    }

    fn add_dependency(&self, dependency: Arc<dyn Node>) -> ScheduleResult<()> {
        if dependency.id() == self.id {
            return Err(ScheduleError::SelfDependency { task_id: self.id });
        }
        let mut inner = self.inner.lock();
        if inner.queue.is_some() || inner.started || inner.state.is_terminal() {
            return Err(ScheduleError::Sealed {
                task_id: self.id,
                what: "add a dependency",
            });
        }
        if !inner.dependencies.iter().any(|d| d.id() == dependency.id()) {
            inner.dependencies.push(dependency);
        }
        Ok(())
    }
}

//! Procedure trait and execution context.
//!
//! A [`Procedure`] is the user-supplied payload of a task. The engine wraps it in a
//! [`Task`](crate::Task), which adds identity, lifecycle, dependencies, observers and typed
//! input/output slots. A procedure only sees its [`ExecContext`].

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::task::AtomicWaker;

use crate::error::{Outcome, TaskError};
use crate::scheduler::Spawner;
use crate::types::{Slot, TaskId};

/// A unit of async work with a typed input and a typed output.
///
/// `execute` is called at most once, after every dependency of the owning task finished. The
/// engine finishes the task when the returned future resolves, so every exit path (success,
/// error, panic) ends in exactly one finish.
///
/// Synchronous work is just a future that resolves immediately:
///
/// ```
/// use procq::{ExecContext, Outcome, Procedure};
///
/// struct Square;
///
/// impl Procedure for Square {
///     type Input = i64;
///     type Output = i64;
///
///     async fn execute(self, cx: ExecContext<i64>) -> Outcome<i64> {
///         let n = *cx.input()?;
///         Ok(n * n)
///     }
/// }
/// ```
///
/// Asynchronous work may await timers, I/O or nested groups. It keeps its worker slot while it
/// is suspended.
pub trait Procedure: Send + 'static {
    type Input: Clone + Send + 'static;
    type Output: Clone + Send + 'static;

    fn execute(
        self,
        cx: ExecContext<Self::Input>,
    ) -> impl Future<Output = Outcome<Self::Output>> + Send;
}

/// Everything a running procedure may look at.
pub struct ExecContext<I> {
    id: TaskId,
    name: Option<String>,
    input: Slot<I>,
    cancel: Arc<CancelSignal>,
    spawner: Spawner,
}

impl<I> ExecContext<I> {
    pub(crate) fn new(
        id: TaskId,
        name: Option<String>,
        input: Slot<I>,
        cancel: Arc<CancelSignal>,
        spawner: Spawner,
    ) -> Self {
        Self {
            id,
            name,
            input,
            cancel,
            spawner,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Borrow the input value.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidInput`] when the input slot was never set, e.g. because the
    /// bound producer failed.
    pub fn input(&self) -> Outcome<&I> {
        self.input.get().ok_or_else(|| self.unset_input())
    }

    /// Take ownership of the input value. Same failure as [`ExecContext::input`], and fails on a
    /// second call.
    pub fn take_input(&mut self) -> Outcome<I> {
        match self.input.take() {
            Some(value) => Ok(value),
            None => Err(self.unset_input()),
        }
    }

    /// Build an [`TaskError::InvalidInput`] for this task, for payload-level validation.
    pub fn invalid_input(&self, reason: impl Into<String>) -> TaskError {
        TaskError::InvalidInput {
            task_id: self.id,
            reason: reason.into(),
        }
    }

    /// Whether cancellation was requested. Cancellation is advisory: the procedure decides
    /// whether to stop early.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_set()
    }

    /// Resolves once cancellation is requested. Useful in `select` against long waits.
    pub fn cancelled(&self) -> Cancelled<'_> {
        Cancelled {
            signal: &self.cancel,
        }
    }

    /// The spawner of the scheduler running this task. Groups use it for their private queue.
    pub fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    fn unset_input(&self) -> TaskError {
        self.invalid_input("input slot is unset")
    }
}

/// Cancellation flag shared between a task and its running procedure.
#[derive(Default)]
pub(crate) struct CancelSignal {
    set: AtomicBool,
    waker: AtomicWaker,
}

impl CancelSignal {
    pub(crate) fn raise(&self) {
        self.set.store(true, Ordering::Release);
        self.waker.wake();
    }

    pub(crate) fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }
}

/// Future returned by [`ExecContext::cancelled`].
///
/// Only the most recently polled `Cancelled` future of a task is woken.
pub struct Cancelled<'a> {
    signal: &'a CancelSignal,
}

impl Future for Cancelled<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.signal.is_set() {
            return Poll::Ready(());
        }
        self.signal.waker.register(cx.waker());
        if self.signal.is_set() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// A procedure built from a closure. Created by [`procedure_fn`].
pub struct FnProcedure<F, I, O> {
    f: F,
    _phantom: PhantomData<fn(I) -> O>,
}

impl<F, Fut, I, O> Procedure for FnProcedure<F, I, O>
where
    F: FnOnce(ExecContext<I>) -> Fut + Send + 'static,
    Fut: Future<Output = Outcome<O>> + Send + 'static,
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
{
    type Input = I;
    type Output = O;

    fn execute(self, cx: ExecContext<I>) -> impl Future<Output = Outcome<O>> + Send {
        (self.f)(cx)
    }
}

/// Convenience function to create a procedure from a closure.
///
/// ```
/// use procq::{procedure_fn, ExecContext, Task};
///
/// let double = Task::new(procedure_fn(|cx: ExecContext<i32>| async move {
///     Ok(cx.input()? * 2)
/// }));
/// # let _ = double;
/// ```
pub fn procedure_fn<I, O, F, Fut>(f: F) -> FnProcedure<F, I, O>
where
    F: FnOnce(ExecContext<I>) -> Fut + Send + 'static,
    Fut: Future<Output = Outcome<O>> + Send + 'static,
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
{
    FnProcedure {
        f,
        _phantom: PhantomData,
    }
}

//! Value propagation between tasks.
//!
//! Lifecycle observers themselves are registered on the task
//! ([`Task::on_finish`](crate::Task::on_finish), [`Task::on_cancel`](crate::Task::on_cancel)).
//! This module adds bindings: one task's output flowing into another task's input without
//! either procedure knowing about the other.

#[cfg(feature = "tracing")]
use tracing::{trace, warn};

use crate::error::ScheduleResult;
use crate::handle::Task;

/// Propagate `source`'s output into `target`'s input.
///
/// When `source` finishes with `Ok(value)`, `target`'s input slot is set to `value` before
/// `source`'s finish observers run, and so before any dependent of `source` is evaluated for
/// readiness. When `source` fails, `target`'s input is left untouched (usually unset), and
/// `target`'s own [`ExecContext::input`](crate::ExecContext::input) check turns that into
/// [`TaskError::InvalidInput`](crate::TaskError::InvalidInput).
///
/// A binding does **not** add a dependency edge. Without
/// `target.add_dependency(&source)` the target may run before the value arrives.
///
/// ```no_run
/// use procq::{bind, ExecContext, Scheduler, Spawner, Task};
///
/// # async {
/// let queue = Scheduler::new(Spawner::new(|fut| { tokio::spawn(fut); }));
///
/// let fetch = Task::from_fn(|_: ExecContext<()>| async { Ok(vec![7u8]) });
/// let count = Task::from_fn(|cx: ExecContext<Vec<u8>>| async move { Ok(cx.input()?.len()) });
///
/// bind(&count, &fetch).unwrap();
/// count.add_dependency(&fetch).unwrap();
///
/// queue.submit_all([fetch.erase(), count.erase()]).unwrap();
/// assert_eq!(count.wait().await, Ok(1));
/// # };
/// ```
///
/// # Errors
///
/// [`ScheduleError::Sealed`](crate::ScheduleError::Sealed) if `source` already finished.
pub fn bind<I, O, S>(target: &Task<I, O>, source: &Task<S, I>) -> ScheduleResult<()>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
    S: Clone + Send + 'static,
{
    let target = target.clone();

    #[cfg(feature = "tracing")]
    trace!(from = %source.id(), to = %target.id(), "binding output to input");

    source.core.add_output_sink(Box::new(move |value: &I| {
        // A target that already started keeps the input it started with.
        match target.set_input(value.clone()) {
            Ok(()) => {}
            #[cfg(feature = "tracing")]
            Err(err) => warn!(%err, "bound value arrived after the target started"),
            #[cfg(not(feature = "tracing"))]
            Err(_) => {}
        }
    }))
}

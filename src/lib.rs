//! Dependency-Ordered Procedure Queue
//!
//! A runtime-agnostic task engine: units of async work ("procedures") wrapped in tasks, run by
//! a queue that honors dependencies between tasks and a bounded number of worker slots.
//!
//! # Features
//!
//! - **Dependency ordering**: a task runs only after every task it depends on finished,
//!   successfully or not. Dependencies may cross queues.
//! - **Bounded concurrency**: each [`Scheduler`] has a limit (default 1, i.e. strictly serial
//!   and FIFO by readiness) that can be changed while it runs.
//! - **Typed slots**: every task has a typed input and a typed output. [`bind`] feeds one
//!   task's output into another task's input.
//! - **Groups**: a [`Group`] is a task made of child tasks run on a private queue. It finishes
//!   when its last child finishes and reports the first child error.
//! - **Observers**: finish and cancel observers run in registration order, exactly once.
//! - **Runtime-agnostic**: the queue never spawns on its own; it hands futures to a
//!   [`Spawner`] (Tokio, smol, a `futures` thread pool, ...).
//! - **Panic safety**: a panicking procedure finishes its task with [`TaskError::Panicked`]
//!   and the queue keeps going.
//!
//! # Quick Start
//!
//! ```no_run
//! use procq::{ExecContext, Outcome, Procedure, Scheduler, Spawner, Task};
//!
//! struct Greet;
//!
//! impl Procedure for Greet {
//!     type Input = String;
//!     type Output = String;
//!
//!     async fn execute(self, cx: ExecContext<String>) -> Outcome<String> {
//!         let name = cx.input()?;
//!         if name.is_empty() {
//!             return Err(cx.invalid_input("name must not be empty"));
//!         }
//!         Ok(format!("Hello, {name}!"))
//!     }
//! }
//!
//! # async {
//! let queue = Scheduler::new(Spawner::new(|fut| { tokio::spawn(fut); }));
//!
//! let dan = Task::with_input(Greet, "Dan".to_string());
//! let nobody = Task::with_input(Greet, String::new());
//!
//! queue.submit_all([dan.erase(), nobody.erase()]).unwrap();
//! queue.wait_idle().await;
//!
//! assert_eq!(dan.output(), Some(Ok("Hello, Dan!".to_string())));
//! assert!(nobody.output().unwrap().is_err());
//! # };
//! ```
//!
//! # Core Concepts
//!
//! ## Procedure
//!
//! A [`Procedure`] is the payload: `execute` receives an [`ExecContext`] (input slot,
//! cancellation flag, spawner) and returns an [`Outcome`]. Closures work through
//! [`procedure_fn`] and [`Task::from_fn`].
//!
//! ## Task
//!
//! A [`Task<I, O>`] wraps a procedure with identity, lifecycle state, dependencies, observers
//! and slots. It moves through [`TaskState`]:
//!
//! ```text
//! Pending -> Ready -> Executing -> Finishing -> Finished
//!    \________\_________\-> Cancelled --------^
//! ```
//!
//! Finishing happens exactly once, when the procedure's future resolves. There is no way to
//! finish a task by hand.
//!
//! ## Scheduler
//!
//! A [`Scheduler`] tracks submitted tasks, admits ready ones in FIFO order while slots are
//! free, and releases dependents when a task finishes. Configure it with
//! [`SchedulerBuilder`].
//!
//! ## Dependencies and Bindings
//!
//! A dependency is an ordering edge ([`Task::add_dependency`], [`Task::depends_on`]). A binding
//! ([`bind`], [`Task::bind_input`]) is a value edge. They are independent: a binding alone does
//! not delay the consumer, and a dependency alone does not move any value.
//!
//! ```no_run
//! use procq::{ExecContext, Scheduler, Spawner, Task};
//!
//! # async {
//! let queue = Scheduler::builder()
//!     .max_concurrent(4)
//!     .build(Spawner::new(|fut| { tokio::spawn(fut); }));
//!
//! let left = Task::from_fn(|_: ExecContext<()>| async { Ok(2) });
//! let right = Task::from_fn(|_: ExecContext<()>| async { Ok(3) });
//! let report = Task::from_fn(|_: ExecContext<()>| async { Ok("both done") });
//! report.depends_on((&left, &right)).unwrap();
//!
//! queue.submit_all([report.erase(), left.erase(), right.erase()]).unwrap();
//! assert_eq!(report.wait().await, Ok("both done"));
//! # };
//! ```
//!
//! ## Cycles
//!
//! Cycles are not rejected by default: tasks on a cycle never become ready and
//! [`Scheduler::is_stalled`] reports the stall. See [`cycle_detection`] for the opt-in check.
//!
//! # Optional Tracing Support
//!
//! procq logs through the `tracing` crate when the `tracing` feature is enabled. Every log
//! statement is behind `#[cfg(feature = "tracing")]`, so without the feature nothing is
//! compiled in and `tracing` is not linked.
//!
//! ```toml
//! [dependencies]
//! procq = { version = "0.1", features = ["tracing"] }
//! tracing-subscriber = "0.3"
//! ```
//!
//! ```no_run
//! use tracing_subscriber::{fmt, EnvFilter};
//!
//! fmt()
//!     .with_env_filter(
//!         EnvFilter::try_from_default_env()
//!             .unwrap_or_else(|_| EnvFilter::new("procq=info"))
//!     )
//!     .init();
//! ```
//!
//! ## Log Levels
//!
//! - **INFO**: queue became idle
//! - **DEBUG**: task creation and submission, dependency wiring, cancellation, finish, groups
//! - **TRACE**: admission, dependency release, observer notification, slot release
//! - **WARN**: stalled queues, rejected cycles, bound values arriving too late
//! - **ERROR**: procedure panics
//!
//! See `demos/tracing_example.rs` for a complete example.

#![allow(private_bounds, private_interfaces)]

// Module declarations
mod builder;
pub mod cycle_detection;
mod deps;
mod error;
mod graph;
mod group;
mod handle;
mod node;
mod observer;
mod scheduler;
mod task;
mod types;

#[cfg(test)]
mod test_util;

// Public re-exports
pub use builder::{SchedulerBuilder, DEFAULT_MAX_CONCURRENT};
pub use deps::Dependencies;
pub use error::{Outcome, ScheduleError, ScheduleResult, TaskError};
pub use group::Group;
pub use handle::{AnyTask, Task};
pub use observer::bind;
pub use scheduler::{QueueStats, Scheduler, Spawner};
pub use task::{procedure_fn, Cancelled, ExecContext, FnProcedure, Procedure};
pub use types::{Slot, TaskId, TaskState};

//! Core type definitions shared by tasks and schedulers.
//!
//! This module defines task identifiers, the task lifecycle states and [`Slot`], the typed
//! "maybe set" container used for task inputs and outputs.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque task identifier.
///
/// Ids are unique for the lifetime of the process, so tasks from different schedulers (or from
/// a group's private scheduler) never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        TaskId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a task is in its lifecycle.
///
/// The normal path is `Pending -> Ready -> Executing -> Finishing -> Finished`. A cancellation
/// request moves any not-yet-finishing task to `Cancelled`; it still passes through `Finishing`
/// and `Finished` afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Created or submitted, waiting on dependencies.
    Pending,
    /// Every dependency finished; waiting for a worker slot.
    Ready,
    /// Occupies a worker slot and its payload is running.
    Executing,
    /// Outcome recorded, observers are being notified.
    Finishing,
    /// Terminal. The task is immutable from here on.
    Finished,
    /// Cancellation was requested; finish has not happened yet.
    Cancelled,
}

impl TaskState {
    /// `Finishing` or `Finished`: the outcome is fixed.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Finishing | TaskState::Finished)
    }
}

/// A value that is either not set yet or ready.
///
/// Task inputs and outputs live in slots. Reading an unset slot is an ordinary branch, never a
/// panic:
///
/// ```
/// use procq::Slot;
///
/// let mut slot = Slot::Unset;
/// assert!(slot.get().is_none());
///
/// slot.set(7);
/// assert_eq!(slot.get(), Some(&7));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Slot<T> {
    #[default]
    Unset,
    Ready(T),
}

impl<T> Slot<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Slot::Ready(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Slot::Ready(value) => Some(value),
            Slot::Unset => None,
        }
    }

    /// Replace the contents, returning the previous value if there was one.
    pub fn set(&mut self, value: T) -> Option<T> {
        std::mem::replace(self, Slot::Ready(value)).into_option()
    }

    pub fn take(&mut self) -> Option<T> {
        std::mem::take(self).into_option()
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Slot::Ready(value) => Some(value),
            Slot::Unset => None,
        }
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Slot::Ready(value),
            None => Slot::Unset,
        }
    }
}

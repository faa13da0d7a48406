//! Scheduler configuration.
//!
//! [`SchedulerBuilder`] collects the knobs of a queue before it exists. Builder methods consume
//! `self`, so configuration reads as one fluent chain ending in [`SchedulerBuilder::build`].

use crate::scheduler::{clamp_concurrency, Scheduler, Spawner};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Default worker slots: strictly serial, FIFO by readiness.
pub const DEFAULT_MAX_CONCURRENT: usize = 1;

/// Builder for [`Scheduler`].
///
/// # Examples
///
/// ```
/// use futures::executor::ThreadPool;
/// use procq::{Scheduler, Spawner};
///
/// let pool = ThreadPool::new().unwrap();
/// let queue = Scheduler::builder()
///     .name("downloads")
///     .max_concurrent(5)
///     .build(Spawner::new(move |fut| pool.spawn_ok(fut)));
///
/// assert_eq!(queue.name(), Some("downloads"));
/// assert_eq!(queue.max_concurrent(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct SchedulerBuilder {
    name: Option<String>,
    max_concurrent: usize,
    detect_cycles: bool,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            detect_cycles: false,
        }
    }

    /// Human-readable name, used in logs and `Debug` output only.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// How many tasks may execute at once. `0` is treated as `1`.
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Reject submissions that close a dependency cycle instead of stalling on them.
    ///
    /// Off by default. See [`cycle_detection`](crate::cycle_detection).
    pub fn detect_cycles(mut self, detect_cycles: bool) -> Self {
        self.detect_cycles = detect_cycles;
        self
    }

    pub fn build(self, spawner: Spawner) -> Scheduler {
        let max_concurrent = clamp_concurrency(self.max_concurrent);

        #[cfg(feature = "tracing")]
        debug!(
            queue = ?self.name,
            max_concurrent,
            detect_cycles = self.detect_cycles,
            "creating scheduler"
        );

        Scheduler::from_parts(self.name, max_concurrent, self.detect_cycles, spawner)
    }
}

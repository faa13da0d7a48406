// Common test utilities and helpers for the test suite

#![allow(dead_code)]

use procq::{ExecContext, Scheduler, Task};

pub use procq_test::{
    pipeline, probed_task, recording_task, tokio_spawner, ConcurrencyProbe, Fetch, Greet,
    MockNetwork, Parse, Recorder, Square,
};

/// A tokio-backed queue with the given limit.
pub fn tokio_queue(max_concurrent: usize) -> Scheduler {
    Scheduler::builder()
        .max_concurrent(max_concurrent)
        .build(tokio_spawner())
}

pub fn constant<T>(value: T) -> Task<(), T>
where
    T: Clone + Send + 'static,
{
    Task::from_fn(move |_: ExecContext<()>| async move { Ok(value) })
}

pub fn greet(name: &str) -> Task<String, String> {
    Task::with_input(Greet, name.to_string())
}

//! Ordered event logs.

use std::sync::Arc;

use parking_lot::Mutex;
use procq::{ExecContext, Task};

/// A shared, append-only list of events. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Record `"<label> ok"` or `"<label> failed: <error>"` when `task` finishes.
    pub fn observe<I, O>(&self, task: &Task<I, O>, label: &str)
    where
        I: Clone + Send + 'static,
        O: Clone + Send + 'static,
    {
        let recorder = self.clone();
        let label = label.to_string();
        task.on_finish(move |error| match error {
            None => recorder.record(format!("{label} ok")),
            Some(err) => recorder.record(format!("{label} failed: {err}")),
        })
        .unwrap();
    }

    /// Record `"<label> cancelled"` when `task` is cancelled.
    pub fn observe_cancel<I, O>(&self, task: &Task<I, O>, label: &str)
    where
        I: Clone + Send + 'static,
        O: Clone + Send + 'static,
    {
        let recorder = self.clone();
        let label = label.to_string();
        task.on_cancel(move |_| recorder.record(format!("{label} cancelled")))
            .unwrap();
    }
}

/// A task that records `label` when its payload runs and returns it.
pub fn recording_task(recorder: &Recorder, label: &str) -> Task<(), String> {
    let recorder = recorder.clone();
    let label = label.to_string();
    Task::from_fn(move |_: ExecContext<()>| async move {
        recorder.record(label.clone());
        Ok(label)
    })
}

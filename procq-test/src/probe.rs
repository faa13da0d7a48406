//! Concurrency measurement.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use procq::{ExecContext, Task};

/// Counts how many probed sections run at the same time and remembers the peak.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyProbe {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a probed section; leaving happens when the guard drops.
    pub fn enter(&self) -> ProbeGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ProbeGuard {
            current: Arc::clone(&self.current),
        }
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct ProbeGuard {
    current: Arc<AtomicUsize>,
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A task that stays inside `probe` for `hold`. Needs a tokio runtime.
pub fn probed_task(probe: &ConcurrencyProbe, hold: Duration) -> Task<(), ()> {
    let probe = probe.clone();
    Task::from_fn(move |_: ExecContext<()>| async move {
        let _guard = probe.enter();
        tokio::time::sleep(hold).await;
        Ok(())
    })
}

//! Helpers shared by unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::executor::block_on;
use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::scheduler::Spawner;

/// A spawner that only queues futures. Tests decide when (and whether) they run.
#[derive(Clone, Default)]
pub(crate) struct ManualSpawner {
    queue: Arc<Mutex<VecDeque<BoxFuture<'static, ()>>>>,
}

impl ManualSpawner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn spawner(&self) -> Spawner {
        let queue = Arc::clone(&self.queue);
        Spawner::new(move |fut| queue.lock().push_back(fut))
    }

    /// Futures spawned and not run yet.
    pub(crate) fn spawned(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run the oldest spawned future to completion. Returns `false` if there was none.
    pub(crate) fn run_one(&self) -> bool {
        let next = self.queue.lock().pop_front();
        match next {
            Some(fut) => {
                block_on(fut);
                true
            }
            None => false,
        }
    }

    /// Run spawned futures, including the ones spawned meanwhile, until none is left.
    pub(crate) fn run_all(&self) {
        while self.run_one() {}
    }
}

pub(crate) fn tokio_spawner() -> Spawner {
    Spawner::new(|fut| {
        tokio::spawn(fut);
    })
}

// Initialize tracing subscriber for tests (idempotent)
#[cfg(feature = "tracing")]
pub(crate) fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::TRACE)
            .try_init()
            .ok();
    });
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn init_tracing() {
    // No-op when tracing is disabled
}

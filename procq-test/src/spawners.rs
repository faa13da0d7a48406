//! One spawner per runtime the test suite runs on.

use futures::executor::ThreadPool;
use procq::Spawner;

/// Spawns on the ambient tokio runtime. Must be used from inside one.
pub fn tokio_spawner() -> Spawner {
    Spawner::new(|fut| {
        tokio::spawn(fut);
    })
}

/// Spawns on smol's global executor.
pub fn smol_spawner() -> Spawner {
    Spawner::new(|fut| smol::spawn(fut).detach())
}

/// Spawns on a fresh `futures` thread pool, kept alive by the spawner.
pub fn thread_pool_spawner() -> Spawner {
    let pool = ThreadPool::new().unwrap();
    Spawner::new(move |fut| pool.spawn_ok(fut))
}

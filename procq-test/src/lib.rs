//! Helpers for internal use in procq integration tests, benchmarks and demos.
//!
//! This crate is not meant for public use and offers no stability guarantees.
//!
//! - [`procedures`]: the demo payloads (greeting, mock network, fetch/parse/square)
//! - [`recorder`]: ordered event logs filled from tasks and observers
//! - [`probe`]: concurrency measurement
//! - [`spawners`]: one [`procq::Spawner`] per supported runtime

pub mod probe;
pub mod procedures;
pub mod recorder;
pub mod spawners;

pub use probe::{probed_task, ConcurrencyProbe};
pub use procedures::{pipeline, Fetch, Greet, MockNetwork, Parse, Square};
pub use recorder::{recording_task, Recorder};
pub use spawners::{smol_spawner, thread_pool_spawner, tokio_spawner};

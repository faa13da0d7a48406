//! # Tracing Example
//!
//! Shows what procq logs while it runs a small graph with a group, a failure and a
//! cancellation.
//!
//! ```bash
//! # Default level (info)
//! cargo run --example tracing_example --features tracing
//!
//! # Task lifecycle and wiring
//! RUST_LOG=procq=debug cargo run --example tracing_example --features tracing
//!
//! # Admission, slot release and dependency release too
//! RUST_LOG=procq=trace cargo run --example tracing_example --features tracing
//! ```

use procq::{ExecContext, Group, Scheduler, Spawner, Task, TaskError};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("procq=info")),
        )
        .init();

    let queue = Scheduler::builder()
        .name("main")
        .max_concurrent(2)
        .build(Spawner::new(|fut| {
            tokio::spawn(fut);
        }));

    let source = Task::from_fn(|_: ExecContext<()>| async { Ok(6_i64) }).with_name("source");

    let double = Task::from_fn(|cx: ExecContext<i64>| async move { Ok(*cx.input()? * 2) })
        .with_name("double");
    let check = Task::from_fn(|cx: ExecContext<i64>| async move {
        let n = *cx.input()?;
        if n > 10 {
            return Err(TaskError::failed(format!("{n} is too large")));
        }
        Ok(n)
    })
    .with_name("check");
    double.bind_input(&source).unwrap();
    check.bind_input(&double).unwrap();
    check.add_dependency(&double).unwrap();

    let group = Group::new()
        .name("double-and-check")
        .child(&double)
        .child(&check)
        .output_from(&check)
        .into_task()
        .with_name("group");
    group.add_dependency(&source).unwrap();

    let skipped = Task::from_fn(|_: ExecContext<()>| async { Ok(()) }).with_name("skipped");
    skipped.cancel_because("no longer needed");

    queue
        .submit_all([source.erase(), group.erase(), skipped.erase()])
        .unwrap();
    queue.wait_idle().await;

    println!("group  -> {:?}", group.output());
    println!("skipped -> {:?}", skipped.output());
}

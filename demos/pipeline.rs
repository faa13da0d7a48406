//! # Pipeline
//!
//! fetch -> parse -> square, packaged as a group with one input and one output.
//! Several pipelines then run side by side on an outer queue with two slots, and a
//! final task sums their results.
//!
//! ```bash
//! cargo run --example pipeline
//! ```

use std::time::Duration;

use procq::{ExecContext, Scheduler, Spawner, Task};
use procq_test::{pipeline, MockNetwork};

#[tokio::main]
async fn main() {
    let queue = Scheduler::builder()
        .name("outer")
        .max_concurrent(2)
        .build(Spawner::new(|fut| {
            tokio::spawn(fut);
        }));

    let pipelines: Vec<Task<String, i64>> = ["3", "4", "12", "not a number"]
        .into_iter()
        .map(|payload| {
            let network = MockNetwork::new(payload).with_latency(Duration::from_millis(20));
            let task = pipeline(network);
            task.set_input(format!("mock://{payload}")).unwrap();
            task
        })
        .collect();

    let results = pipelines.clone();
    let sum = Task::from_fn(move |_: ExecContext<()>| async move {
        let total = results
            .iter()
            .filter_map(|task| task.output().and_then(Result::ok))
            .sum::<i64>();
        Ok(total)
    });
    for task in &pipelines {
        sum.add_dependency(task).unwrap();
    }

    queue.submit_all(pipelines.iter()).unwrap();
    queue.submit(&sum).unwrap();

    for task in &pipelines {
        match task.wait().await {
            Ok(square) => println!("{} -> {square}", task.id()),
            Err(err) => println!("{} -> {err}", task.id()),
        }
    }
    println!("sum of squares: {:?}", sum.wait().await);
}

//! # Greeting
//!
//! The smallest useful queue: one procedure, two tasks, one of them with invalid input.
//!
//! ```bash
//! cargo run --example greeting
//! ```

use procq::{ExecContext, Outcome, Procedure, Scheduler, Spawner, Task};

struct Greet;

impl Procedure for Greet {
    type Input = String;
    type Output = String;

    async fn execute(self, cx: ExecContext<String>) -> Outcome<String> {
        let name = cx.input()?;
        if name.is_empty() {
            return Err(cx.invalid_input("name must not be empty"));
        }
        Ok(format!("Hello, {name}!"))
    }
}

#[tokio::main]
async fn main() {
    let queue = Scheduler::new(Spawner::new(|fut| {
        tokio::spawn(fut);
    }));

    let dan = Task::with_input(Greet, "Dan".to_string()).with_name("dan");
    let nobody = Task::with_input(Greet, String::new()).with_name("nobody");

    for task in [&dan, &nobody] {
        let name = task.name().unwrap_or_default();
        task.on_finish(move |error| match error {
            None => println!("{name}: done"),
            Some(err) => println!("{name}: {err}"),
        })
        .unwrap();
    }

    queue.submit_all([&dan, &nobody]).unwrap();
    queue.wait_idle().await;

    println!("dan    -> {:?}", dan.output());
    println!("nobody -> {:?}", nobody.output());
}

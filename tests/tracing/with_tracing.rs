//! Runs with a subscriber installed, so every log statement is formatted at least once.
//! `RUST_LOG=procq=trace cargo test --features tracing -- --nocapture` shows the output.

use procq::{ExecContext, Group, Outcome, Task};
use tracing_subscriber::{fmt, EnvFilter};

use crate::common::{greet, pipeline, recording_task, tokio_queue, MockNetwork, Recorder};

fn init() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn explode() -> Outcome<u8> {
    panic!("traced panic")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tracing_with_subscriber() {
    init();

    let queue = tokio_queue(2);
    let dan = greet("Dan").with_name("dan");
    let nobody = greet("").with_name("nobody");

    queue.submit_all([dan.erase(), nobody.erase()]).unwrap();
    queue.wait_idle().await;

    assert_eq!(dan.output(), Some(Ok("Hello, Dan!".to_string())));
    assert!(nobody.output().unwrap().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tracing_with_groups_and_failures() {
    init();

    let queue = tokio_queue(4);
    let good = pipeline(MockNetwork::new("7"));
    good.set_input("mock://seven".to_string()).unwrap();
    let bad = pipeline(MockNetwork::new("seven"));
    bad.set_input("mock://words".to_string()).unwrap();
    let panicking = Task::from_fn(|_: ExecContext<()>| async { explode() });

    queue
        .submit_all([good.erase(), bad.erase(), panicking.erase()])
        .unwrap();
    queue.wait_idle().await;

    assert_eq!(good.output(), Some(Ok(49)));
    assert!(bad.output().unwrap().is_err());
    assert!(panicking.output().unwrap().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tracing_with_cancellation_and_stall() {
    init();

    let queue = tokio_queue(1);
    let recorder = Recorder::new();
    let skipped = recording_task(&recorder, "skipped");
    skipped.cancel_because("traced");
    let a = recording_task(&recorder, "a");
    let b = recording_task(&recorder, "b");
    a.add_dependency(&b).unwrap();
    b.add_dependency(&a).unwrap();

    queue
        .submit_all([skipped.erase(), a.erase(), b.erase()])
        .unwrap();
    assert!(skipped.wait().await.unwrap_err().is_cancellation());

    let group = Group::new().child(&recording_task(&recorder, "child")).into_task();
    let other = tokio_queue(1);
    other.submit(&group).unwrap();
    assert_eq!(group.wait().await, Ok(()));

    while queue.stats().executing > 0 {
        tokio::task::yield_now().await;
    }
    assert!(queue.is_stalled());
    assert_eq!(recorder.events(), vec!["child"]);
}

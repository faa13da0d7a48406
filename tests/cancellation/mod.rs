//! Advisory cancellation

use std::time::Duration;

use procq::{ExecContext, Task, TaskError, TaskState};

use crate::common::{recording_task, tokio_queue, Fetch, MockNetwork, Recorder};

#[tokio::test]
async fn test_cancelled_before_admission_skips_payload() {
    let queue = tokio_queue(1);
    let recorder = Recorder::new();
    let blocker = recording_task(&recorder, "blocker");
    let victim = recording_task(&recorder, "victim");
    let after = recording_task(&recorder, "after");
    recorder.observe_cancel(&victim, "victim");

    queue
        .submit_all([blocker.erase(), victim.erase(), after.erase()])
        .unwrap();
    victim.cancel_because("not needed");
    queue.wait_idle().await;

    assert_eq!(
        recorder.events(),
        vec!["victim cancelled", "blocker", "after"]
    );
    assert_eq!(
        victim.output(),
        Some(Err(TaskError::Cancelled {
            task_id: victim.id(),
            reason: Some("not needed".to_string()),
        }))
    );
    assert_eq!(queue.stats().finished, 3);
}

#[tokio::test]
async fn test_cooperative_payload_stops_early() {
    let queue = tokio_queue(1);
    let fetch = Task::with_input(
        Fetch::new(MockNetwork::new("slow").with_latency(Duration::from_secs(60))),
        "mock://slow".to_string(),
    );

    queue.submit(&fetch).unwrap();
    while fetch.state() != TaskState::Executing {
        tokio::task::yield_now().await;
    }
    fetch.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(5), fetch.wait())
        .await
        .expect("cancelled fetch should finish promptly");
    assert!(outcome.unwrap_err().is_cancellation());
}

#[tokio::test]
async fn test_uncooperative_payload_still_reports_cancellation() {
    let queue = tokio_queue(1);
    let (release, hold) = futures::channel::oneshot::channel::<()>();
    let stubborn: Task<(), i32> = Task::from_fn(move |_: ExecContext<()>| async move {
        let _ = hold.await;
        Ok(42)
    });

    queue.submit(&stubborn).unwrap();
    stubborn.cancel();
    assert_eq!(stubborn.state(), TaskState::Cancelled);
    assert!(!stubborn.is_finished());

    release.send(()).unwrap();
    assert!(stubborn.wait().await.unwrap_err().is_cancellation());
}

#[tokio::test]
async fn test_cancellation_releases_dependents() {
    let queue = tokio_queue(1);
    let recorder = Recorder::new();
    let cancelled = recording_task(&recorder, "cancelled");
    let dependent = recording_task(&recorder, "dependent");
    dependent.add_dependency(&cancelled).unwrap();
    cancelled.cancel();

    queue.submit_all([cancelled.erase(), dependent.erase()]).unwrap();

    assert_eq!(dependent.wait().await, Ok("dependent".to_string()));
    assert_eq!(recorder.events(), vec!["dependent"]);
}

#[tokio::test]
async fn test_cancel_with_custom_error() {
    let queue = tokio_queue(1);
    let recorder = Recorder::new();
    let task = recording_task(&recorder, "task");
    task.cancel_with(TaskError::failed("superseded by a newer request"));

    queue.submit(&task).unwrap();

    assert_eq!(
        task.wait().await,
        Err(TaskError::failed("superseded by a newer request"))
    );
}

#[tokio::test]
async fn test_late_cancel_observer_fires_immediately() {
    let recorder = Recorder::new();
    let task = recording_task(&recorder, "task");
    task.cancel();

    recorder.observe_cancel(&task, "late");

    assert_eq!(recorder.events(), vec!["late cancelled"]);
}

//! Cycles and stalls

use std::time::Duration;

use procq::{ScheduleError, Scheduler, Task};

use crate::common::{recording_task, tokio_queue, tokio_spawner, Recorder};

#[tokio::test]
async fn test_mutual_dependency_makes_no_progress() {
    let queue = tokio_queue(2);
    let recorder = Recorder::new();
    let a = recording_task(&recorder, "a");
    let b = recording_task(&recorder, "b");
    a.add_dependency(&b).unwrap();
    b.add_dependency(&a).unwrap();

    queue.submit_all([a.erase(), b.erase()]).unwrap();

    let idle = tokio::time::timeout(Duration::from_millis(50), queue.wait_idle()).await;
    assert!(idle.is_err());
    assert!(queue.is_stalled());
    assert!(recorder.is_empty());
    assert_eq!(queue.stats().pending, 2);
}

#[tokio::test]
async fn test_stall_behind_unrelated_work() {
    let queue = tokio_queue(1);
    let recorder = Recorder::new();
    let free = recording_task(&recorder, "free");
    let (x, y, z) = (
        recording_task(&recorder, "x"),
        recording_task(&recorder, "y"),
        recording_task(&recorder, "z"),
    );
    x.add_dependency(&z).unwrap();
    y.add_dependency(&x).unwrap();
    z.add_dependency(&y).unwrap();

    queue
        .submit_all([x.erase(), free.erase(), y.erase(), z.erase()])
        .unwrap();
    let _ = free.wait().await;
    tokio::task::yield_now().await;

    assert!(queue.is_stalled());
    assert_eq!(recorder.events(), vec!["free"]);
}

#[tokio::test]
async fn test_cycle_detection_rejects_cycle() {
    let queue = Scheduler::builder()
        .detect_cycles(true)
        .build(tokio_spawner());
    let recorder = Recorder::new();
    let tasks: Vec<Task<(), String>> = (0..3)
        .map(|i| recording_task(&recorder, &i.to_string()))
        .collect();
    tasks[0].add_dependency(&tasks[2]).unwrap();
    tasks[1].add_dependency(&tasks[0]).unwrap();
    tasks[2].add_dependency(&tasks[1]).unwrap();

    let err = queue.submit_all(tasks.iter()).unwrap_err();

    assert!(matches!(err, ScheduleError::CycleDetected { .. }));
    assert!(queue.is_idle());
    assert!(!queue.is_stalled());
}

#[tokio::test]
async fn test_cycle_detection_accepts_acyclic_graph() {
    let queue = Scheduler::builder()
        .detect_cycles(true)
        .max_concurrent(2)
        .build(tokio_spawner());
    let recorder = Recorder::new();
    let a = recording_task(&recorder, "a");
    let b = recording_task(&recorder, "b");
    let c = recording_task(&recorder, "c");
    b.add_dependency(&a).unwrap();
    c.depends_on((&a, &b)).unwrap();

    queue.submit_all([c.erase(), b.erase(), a.erase()]).unwrap();
    queue.wait_idle().await;

    assert_eq!(recorder.events(), vec!["a", "b", "c"]);
}

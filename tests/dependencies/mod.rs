//! Dependency ordering, fan-in/fan-out and cross-queue edges

use std::collections::HashMap;

use futures::channel::oneshot;

use procq::{AnyTask, ExecContext, Task, TaskState};

use crate::common::{recording_task, tokio_queue, Recorder};

fn position(events: &[String], label: &str) -> usize {
    events
        .iter()
        .position(|event| event == label)
        .unwrap_or_else(|| panic!("{label} never ran"))
}

#[tokio::test]
async fn test_chain_submitted_backwards() {
    let queue = tokio_queue(4);
    let recorder = Recorder::new();
    let a = recording_task(&recorder, "a");
    let b = recording_task(&recorder, "b");
    let c = recording_task(&recorder, "c");
    b.add_dependency(&a).unwrap();
    c.add_dependency(&b).unwrap();

    queue.submit_all([c.erase(), b.erase(), a.erase()]).unwrap();
    queue.wait_idle().await;

    assert_eq!(recorder.events(), vec!["a", "b", "c"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_diamond() {
    let queue = tokio_queue(4);
    let recorder = Recorder::new();
    let top = recording_task(&recorder, "top");
    let left = recording_task(&recorder, "left");
    let right = recording_task(&recorder, "right");
    let bottom = recording_task(&recorder, "bottom");
    left.add_dependency(&top).unwrap();
    right.add_dependency(&top).unwrap();
    bottom.depends_on((&left, &right)).unwrap();

    queue
        .submit_all([bottom.erase(), right.erase(), left.erase(), top.erase()])
        .unwrap();
    queue.wait_idle().await;

    let events = recorder.events();
    assert_eq!(events.first().map(String::as_str), Some("top"));
    assert_eq!(events.last().map(String::as_str), Some("bottom"));
    assert_eq!(events.len(), 4);
}

#[tokio::test]
async fn test_fan_out_and_fan_in() {
    let queue = tokio_queue(3);
    let recorder = Recorder::new();
    let source = recording_task(&recorder, "source");
    let workers: Vec<AnyTask> = (0..6)
        .map(|i| {
            let worker = recording_task(&recorder, &format!("worker-{i}"));
            worker.add_dependency(&source).unwrap();
            worker.erase()
        })
        .collect();
    let sink = recording_task(&recorder, "sink");
    sink.depends_on(workers.as_slice()).unwrap();

    queue.submit(&sink).unwrap();
    queue.submit_all(workers.iter()).unwrap();
    queue.submit(&source).unwrap();
    queue.wait_idle().await;

    let events = recorder.events();
    assert_eq!(events.len(), 8);
    assert_eq!(events[0], "source");
    assert_eq!(events[7], "sink");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_layered_graph_respects_every_edge() {
    let queue = tokio_queue(6);
    let recorder = Recorder::new();
    let tasks: Vec<Task<(), String>> = (0..60)
        .map(|i| recording_task(&recorder, &i.to_string()))
        .collect();

    let mut edges = Vec::new();
    for i in 0..tasks.len() {
        for back in [1, 3, 7] {
            if i >= back && (i + back) % 2 == 0 {
                tasks[i].add_dependency(&tasks[i - back]).unwrap();
                edges.push((i - back, i));
            }
        }
    }

    queue.submit_all(tasks.iter().rev()).unwrap();
    queue.wait_idle().await;

    let events = recorder.events();
    let positions: HashMap<usize, usize> = (0..tasks.len())
        .map(|i| (i, position(&events, &i.to_string())))
        .collect();
    for (from, to) in edges {
        assert!(
            positions[&from] < positions[&to],
            "{to} ran before its dependency {from}"
        );
    }
}

#[tokio::test]
async fn test_finished_dependency_counts_as_satisfied() {
    let queue = tokio_queue(1);
    let recorder = Recorder::new();
    let early = recording_task(&recorder, "early");
    queue.submit(&early).unwrap();
    let _ = early.wait().await;

    let late = recording_task(&recorder, "late");
    late.add_dependency(&early).unwrap();
    queue.submit(&late).unwrap();

    assert_eq!(late.wait().await, Ok("late".to_string()));
}

#[tokio::test]
async fn test_dependency_across_queues() {
    let producer_queue = tokio_queue(1);
    let consumer_queue = tokio_queue(1);
    let recorder = Recorder::new();

    let (release, hold) = oneshot::channel::<()>();
    let producer: Task<(), ()> = Task::from_fn(move |_: ExecContext<()>| async move {
        let _ = hold.await;
        Ok(())
    });
    let consumer = recording_task(&recorder, "consumer");
    consumer.add_dependency(&producer).unwrap();

    consumer_queue.submit(&consumer).unwrap();
    producer_queue.submit(&producer).unwrap();
    tokio::task::yield_now().await;

    assert_eq!(consumer.state(), TaskState::Pending);
    assert!(consumer_queue.is_stalled());

    release.send(()).unwrap();
    assert_eq!(consumer.wait().await, Ok("consumer".to_string()));
    assert!(producer.is_finished());
}

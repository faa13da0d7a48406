//! Groups: aggregation, pipelines and child hooks

use std::time::Duration;

use procq::{ExecContext, Group, Task, TaskError};

use crate::common::{
    constant, pipeline, recording_task, tokio_queue, MockNetwork, Recorder, Square,
};

#[tokio::test]
async fn test_fetch_parse_square_yields_49() {
    let queue = tokio_queue(1);
    let task = pipeline(MockNetwork::new("7"));
    task.set_input("mock://seven".to_string()).unwrap();

    queue.submit(&task).unwrap();

    assert_eq!(task.wait().await, Ok(49));
}

#[tokio::test]
async fn test_pipeline_with_latency() {
    let queue = tokio_queue(1);
    let task = pipeline(MockNetwork::new(" 12\n").with_latency(Duration::from_millis(10)));
    task.set_input("mock://twelve".to_string()).unwrap();

    queue.submit(&task).unwrap();

    assert_eq!(task.wait().await, Ok(144));
}

#[tokio::test]
async fn test_pipeline_network_failure_is_group_error() {
    let queue = tokio_queue(1);
    let task = pipeline(MockNetwork::new("7").failing("connection refused"));
    task.set_input("mock://down".to_string()).unwrap();

    queue.submit(&task).unwrap();

    assert_eq!(
        task.wait().await,
        Err(TaskError::failed("GET mock://down: connection refused"))
    );
}

#[tokio::test]
async fn test_pipeline_bad_payload_fails_in_parse() {
    let queue = tokio_queue(1);
    let task = pipeline(MockNetwork::new("seven"));
    task.set_input("mock://words".to_string()).unwrap();

    queue.submit(&task).unwrap();

    match task.wait().await {
        Err(TaskError::InvalidInput { reason, .. }) => {
            assert!(reason.contains("is not an integer"));
        }
        other => panic!("expected invalid input, got {other:?}"),
    }
}

#[tokio::test]
async fn test_group_finishes_after_all_children() {
    let queue = tokio_queue(2);
    let recorder = Recorder::new();
    let children: Vec<_> = (0..4)
        .map(|i| {
            let child = recording_task(&recorder, &format!("child-{i}"));
            recorder.observe(&child, &format!("child-{i}"));
            child
        })
        .collect();
    let group = Group::new()
        .children(children.iter())
        .max_concurrent(2)
        .into_task();
    recorder.observe(&group, "group");

    queue.submit(&group).unwrap();
    assert_eq!(group.wait().await, Ok(()));

    let events = recorder.events();
    assert_eq!(events.len(), 9);
    assert_eq!(events.last().map(String::as_str), Some("group ok"));
}

#[tokio::test]
async fn test_first_child_error_wins() {
    let queue = tokio_queue(1);
    let first: Task<(), ()> =
        Task::from_fn(|_: ExecContext<()>| async { Err(TaskError::failed("first")) });
    let second: Task<(), ()> =
        Task::from_fn(|_: ExecContext<()>| async { Err(TaskError::failed("second")) });
    let survivor = constant(3);

    let group = Group::new()
        .child(&first)
        .child(&survivor)
        .child(&second)
        .into_task();

    queue.submit(&group).unwrap();

    assert_eq!(group.wait().await, Err(TaskError::failed("first")));
    // Siblings are not skipped by default
    assert_eq!(survivor.output(), Some(Ok(3)));
    assert_eq!(second.output(), Some(Err(TaskError::failed("second"))));
}

#[tokio::test]
async fn test_child_hook_moves_values() {
    let queue = tokio_queue(1);
    let seed = constant(5_i64);
    let square = Task::new(Square);
    square.add_dependency(&seed).unwrap();

    let (from, to) = (seed.clone(), square.clone());
    let group = Group::new()
        .child(&seed)
        .child(&square)
        .on_child_finished(move |child, error| {
            if child.id() == from.id() && error.is_none() {
                if let Some(Ok(value)) = from.output() {
                    to.set_input(value).unwrap();
                }
            }
        })
        .output_from(&square)
        .into_task();

    queue.submit(&group).unwrap();
    assert_eq!(group.wait().await, Ok(25));
}

#[tokio::test]
async fn test_groups_in_outer_graph() {
    let queue = tokio_queue(2);
    let recorder = Recorder::new();

    let first = Group::new()
        .child(&recording_task(&recorder, "first-a"))
        .child(&recording_task(&recorder, "first-b"))
        .into_task();
    let second = Group::new()
        .child(&recording_task(&recorder, "second-a"))
        .into_task();
    second.add_dependency(&first).unwrap();

    queue.submit_all([second.erase(), first.erase()]).unwrap();
    queue.wait_idle().await;

    assert_eq!(recorder.events(), vec!["first-a", "first-b", "second-a"]);
}

#[tokio::test]
async fn test_group_output_bound_downstream() {
    let queue = tokio_queue(1);
    let group = pipeline(MockNetwork::new("3"));
    group.set_input("mock://three".to_string()).unwrap();
    let report: Task<i64, String> = Task::from_fn(|cx: ExecContext<i64>| async move {
        Ok(format!("result = {}", cx.input()?))
    });
    report.bind_input(&group).unwrap();
    report.add_dependency(&group).unwrap();

    queue.submit_all([group.erase(), report.erase()]).unwrap();

    assert_eq!(report.wait().await, Ok("result = 9".to_string()));
}

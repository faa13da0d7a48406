//! Nested queues: the fetch/parse/square pipeline as a group

use criterion::{BenchmarkId, Criterion};
use procq::{Scheduler, Spawner};
use procq_test::{pipeline, MockNetwork};

pub fn bench_groups(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("group_pipelines");

    for count in [1, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.to_async(&rt).iter(|| async move {
                let queue = Scheduler::builder()
                    .max_concurrent(8)
                    .build(Spawner::new(|fut| {
                        tokio::spawn(fut);
                    }));
                let pipelines: Vec<_> = (0..count)
                    .map(|i| {
                        let task = pipeline(MockNetwork::new(i.to_string()));
                        task.set_input(format!("mock://{i}")).unwrap();
                        task
                    })
                    .collect();

                queue.submit_all(pipelines.iter()).unwrap();
                queue.wait_idle().await;
            });
        });
    }

    group.finish();
}

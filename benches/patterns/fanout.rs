//! One source, many consumers, different slot counts

use criterion::{BenchmarkId, Criterion};
use procq::{ExecContext, Scheduler, Spawner, Task};

pub fn bench_fanout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("fanout_1000");

    for limit in [1, 4, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(limit), &limit, |b, &limit| {
            b.to_async(&rt).iter(|| async move {
                let queue = Scheduler::builder()
                    .max_concurrent(limit)
                    .build(Spawner::new(|fut| {
                        tokio::spawn(fut);
                    }));
                let source = Task::from_fn(|_: ExecContext<()>| async { Ok(3_u64) });
                let consumers: Vec<Task<u64, u64>> = (0..1_000)
                    .map(|i| {
                        let consumer = Task::from_fn(move |cx: ExecContext<u64>| async move {
                            Ok(*cx.input()? * i)
                        });
                        consumer.add_dependency(&source).unwrap();
                        consumer.bind_input(&source).unwrap();
                        consumer
                    })
                    .collect();

                queue.submit(&source).unwrap();
                queue.submit_all(consumers.iter()).unwrap();
                queue.wait_idle().await;
            });
        });
    }

    group.finish();
}

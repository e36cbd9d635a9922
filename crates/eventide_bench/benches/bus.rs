//! Message bus and publisher benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use eventide_bench::utils::{generate_batch, random_body};
use eventide_bus::{BusResult, Message, Topic, TopicConfig};
use eventide_core::{Config, Runtime};
use eventide_journal::NO_STREAM_VERSION;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn wait_for(counter: &AtomicUsize, count: usize) {
    while counter.load(Ordering::SeqCst) < count {
        thread::yield_now();
    }
}

/// Benchmark publishing messages and waiting for delivery to subscribers.
fn bench_topic_delivery(c: &mut Criterion) {
    let mut group = c.benchmark_group("topic_delivery");

    for subscribers in [1, 4, 16].iter() {
        group.throughput(Throughput::Elements(1_000));
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            subscribers,
            |b, &subscribers| {
                let topic = Topic::new(
                    "bench",
                    TopicConfig::new().idle_interval(Duration::from_millis(1)),
                )
                .unwrap();
                let delivered = Arc::new(AtomicUsize::new(0));
                for _ in 0..subscribers {
                    let delivered = Arc::clone(&delivered);
                    topic.subscribe(Arc::new(move |m: &Message| -> BusResult<()> {
                        black_box(m);
                        delivered.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }));
                }
                let payload = random_body(128);

                b.iter(|| {
                    delivered.store(0, Ordering::SeqCst);
                    for i in 0..1_000 {
                        topic
                            .publish(Message::new(i.to_string(), "BenchEvent", payload.clone()))
                            .unwrap();
                    }
                    wait_for(&delivered, 1_000 * subscribers);
                });
                topic.close();
            },
        );
    }
    group.finish();
}

/// Benchmark the full path from journal write to subscriber.
fn bench_publisher_relay(c: &mut Criterion) {
    let runtime = Runtime::new(Config::new().poll_every(Duration::from_millis(1)));
    let journal = runtime.open_journal("bench");
    let publisher = runtime.publish("bench", "bench-bus", "bench").unwrap();
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    publisher
        .topic()
        .subscribe(Arc::new(move |_: &Message| -> BusResult<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

    let batch = generate_batch(100, 128);
    let mut version = NO_STREAM_VERSION;
    let mut total = 0;

    let mut group = c.benchmark_group("publisher_relay");
    group.throughput(Throughput::Elements(100));
    group.bench_function("batch_100", |b| {
        b.iter(|| {
            journal.write("bench_1", version, &batch).unwrap();
            version += 100;
            total += 100;
            wait_for(&delivered, total);
        });
    });
    group.finish();
    runtime.shutdown();
}

criterion_group!(benches, bench_topic_delivery, bench_publisher_relay);
criterion_main!(benches);

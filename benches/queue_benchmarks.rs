use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use durable_mq::backends::memory::MemoryBackend;
use durable_mq::config::MemoryConfig;
use durable_mq::{Message, Queue};

fn bench_queue(c: &mut Criterion) {
    c.bench_function("queue_single_message", |b| {
        b.iter_batched(
            || Queue::open(MemoryBackend::new(MemoryConfig::default()).unwrap()),
            |queue| {
                let content = Bytes::from("test data for benchmarking");
                queue
                    .queue(black_box(&Message::new(0, content)))
                    .unwrap()
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_take_and_finish(c: &mut Criterion) {
    c.bench_function("take_then_finish", |b| {
        b.iter_batched(
            || {
                let queue = Queue::open(MemoryBackend::new(MemoryConfig::default()).unwrap());
                queue.queue(&Message::new(0, "payload")).unwrap();
                queue
            },
            |queue| {
                let taken = queue.take().unwrap().unwrap();
                queue.finish(black_box(&taken)).unwrap()
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_requeue(c: &mut Criterion) {
    c.bench_function("requeue_single_message", |b| {
        b.iter_batched(
            || {
                let queue = Queue::open(MemoryBackend::new(MemoryConfig::default()).unwrap());
                queue.queue(&Message::new(0, "payload")).unwrap();
                let taken = queue.take().unwrap().unwrap();
                (queue, taken)
            },
            |(queue, taken)| queue.requeue(black_box(&taken)).unwrap(),
            BatchSize::SmallInput,
        );
    });
}

fn bench_batch_enqueue(c: &mut Criterion) {
    c.bench_function("queue_batch_100_messages", |b| {
        b.iter_batched(
            || Queue::open(MemoryBackend::new(MemoryConfig::default()).unwrap()),
            |queue| {
                for i in 0..100u64 {
                    queue.queue(black_box(&Message::new(i, "payload"))).unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_queue,
    bench_take_and_finish,
    bench_requeue,
    bench_batch_enqueue
);
criterion_main!(benches);

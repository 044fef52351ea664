//! S4 and property 5 from spec.md §8, using an injectable clock so the
//! orphan threshold can be crossed deterministically instead of sleeping.

use durable_mq::backends::memory::MemoryBackend;
use durable_mq::config::MemoryConfig;
use durable_mq::{recover_orphans, Clock, ExecutorOptions, Message, Queue};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

struct FakeClock(AtomicI64);

impl FakeClock {
    fn at(millis: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(millis)))
    }

    fn advance(&self, millis: i64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(self.0.load(Ordering::SeqCst)).unwrap()
    }
}

#[test]
fn messages_older_than_threshold_are_recovered_back_to_queued() {
    let clock = FakeClock::at(0);
    let queue = Queue::open_with(
        MemoryBackend::new(MemoryConfig::default()).unwrap(),
        ExecutorOptions::default(),
        clock.clone() as Arc<dyn Clock>,
    );

    queue.queue(&Message::new(1, "a")).unwrap();
    let taken = queue.take().unwrap().unwrap();
    assert_eq!(queue.ephemeral_size(), 1);

    // Not yet past the threshold: nothing to recover.
    clock.advance(30_000);
    let recovered = recover_orphans(&queue, chrono::Duration::seconds(60)).unwrap();
    assert_eq!(recovered, 0);

    // Past the threshold now.
    clock.advance(40_000);
    let recovered = recover_orphans(&queue, chrono::Duration::seconds(60)).unwrap();
    assert_eq!(recovered, 1);
    assert_eq!(queue.ephemeral_size(), 0);
    assert_eq!(queue.queue_size(), 1);

    let requeued = queue.take().unwrap().unwrap();
    assert_eq!(requeued.id(), taken.id());
    // Orphan recovery does not touch retry counters (spec.md §4.3 invariant 4).
    assert_eq!(requeued.num_requeues(), 0);
}

#[test]
fn recovery_is_a_noop_when_nothing_is_in_flight() {
    let clock = FakeClock::at(0);
    let queue = Queue::open_with(
        MemoryBackend::new(MemoryConfig::default()).unwrap(),
        ExecutorOptions::default(),
        clock as Arc<dyn Clock>,
    );

    let recovered = recover_orphans(&queue, chrono::Duration::seconds(60)).unwrap();
    assert_eq!(recovered, 0);
}

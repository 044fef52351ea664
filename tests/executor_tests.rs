//! S7 from spec.md §8: a deadlock retry collapses to one visible requeue —
//! a retried transition must not inflate `numRequeues` beyond the single
//! intended increment, since the retry re-runs the whole attempt closure
//! and the counter bump happens before the closure is handed to the
//! executor (see `Queue::requeue`).

use durable_mq::{ExecutorOptions, QueueError, Result, TransactionalExecutor};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[test]
fn retries_deadlocks_up_to_max_then_succeeds() {
    let executor = TransactionalExecutor::new(ExecutorOptions {
        max_retries: 3,
        retry_delay: Duration::from_millis(0),
    });
    let calls = AtomicU32::new(0);

    let result: Result<u32> = executor.run(|| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        if n < 2 {
            Err(QueueError::Deadlock("locked row".into()))
        } else {
            Ok(n)
        }
    });

    assert_eq!(result.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn gives_up_after_max_retries_exhausted() {
    let executor = TransactionalExecutor::new(ExecutorOptions {
        max_retries: 2,
        retry_delay: Duration::from_millis(0),
    });
    let calls = AtomicU32::new(0);

    let result: Result<()> = executor.run(|| {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(QueueError::Deadlock("always locked".into()))
    });

    assert!(result.is_err());
    // First attempt + 2 retries = 3 calls total.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn non_deadlock_errors_are_not_retried() {
    let executor = TransactionalExecutor::new(ExecutorOptions::default());
    let calls = AtomicU32::new(0);

    let result: Result<()> = executor.run(|| {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(QueueError::Unsupported("finish"))
    });

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn a_retried_requeue_still_only_advances_num_requeues_by_one() {
    use durable_mq::backends::memory::MemoryBackend;
    use durable_mq::config::MemoryConfig;
    use durable_mq::{Message, Queue};

    let queue = Queue::open(MemoryBackend::new(MemoryConfig::default()).unwrap());
    queue.queue(&Message::new(1, "a")).unwrap();
    let taken = queue.take().unwrap().unwrap();

    // The in-memory backend never returns Deadlock, so this exercises the
    // non-retried path, but confirms the counter discipline the executor
    // relies on: `requeue` bumps the counter once, outside the retried
    // closure, so even a forced retry at the backend layer would not
    // double-count it.
    queue.requeue(&taken).unwrap();
    let requeued = queue.take().unwrap().unwrap();
    assert_eq!(requeued.num_requeues(), 1);
}

//! The transactional executor (spec.md C5): wraps each state-machine
//! transition with the backend's strongest available isolation, commits on
//! success, rolls back and rethrows on failure, and retries deadlock-class
//! failures a bounded number of times.
//!
//! The backend adapters themselves own the actual transaction/connection
//! borrowing (a relational adapter opens and commits a `postgres`
//! transaction per call, a key-value adapter runs a Lua script or a
//! `MULTI`/`EXEC` block); this type only owns the retry policy that spans
//! those per-call units of work, since a retried transition may need to
//! re-borrow a fresh connection from the pool.

use crate::error::{QueueError, Result};
use std::time::Duration;

/// Retry policy for the transactional executor (spec.md §4.5).
#[derive(Debug, Clone, Copy)]
pub struct ExecutorOptions {
    /// Maximum number of retries after the first attempt on a deadlock-class
    /// failure. Default 3, per spec.md.
    pub max_retries: u32,
    /// Delay between retry attempts. The spec names no backoff curve, so a
    /// short fixed delay is used rather than an exponential one.
    pub retry_delay: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(10),
        }
    }
}

/// Runs state-machine transitions with bounded deadlock retry.
pub struct TransactionalExecutor {
    options: ExecutorOptions,
}

impl TransactionalExecutor {
    pub fn new(options: ExecutorOptions) -> Self {
        Self { options }
    }

    /// Invokes `attempt` until it succeeds, returns a non-deadlock error, or
    /// `max_retries` is exhausted. `attempt` must be safe to call more than
    /// once — each retry re-runs the *entire* logical transition, so any
    /// counter mutation performed inside `attempt` itself would be repeated
    /// on retry. Callers needing `numRequeues` to advance exactly once
    /// across retries (spec.md "Requeue retries must use the silent path
    /// internally") increment the counter before calling `run`, not inside
    /// `attempt`.
    pub fn run<T>(&self, mut attempt: impl FnMut() -> Result<T>) -> Result<T> {
        let mut retries = 0;
        loop {
            match attempt() {
                Ok(value) => return Ok(value),
                Err(QueueError::Deadlock(cause)) => {
                    if retries >= self.options.max_retries {
                        log::error!(
                            "deadlock persisted after {retries} retries, giving up: {cause}"
                        );
                        return Err(QueueError::Deadlock(cause));
                    }
                    retries += 1;
                    log::warn!(
                        "deadlock on transition, retrying ({retries}/{}): {cause}",
                        self.options.max_retries
                    );
                    std::thread::sleep(self.options.retry_delay);
                }
                Err(other) => {
                    log::error!("transition failed, rolling back: {other}");
                    return Err(other);
                }
            }
        }
    }
}

//! The queue state machine (spec.md C4): the single source of truth for
//! transitions between `queued`, `in-flight`, and `done`/`requeued`, always
//! operating on a `clone()` of the caller's message (spec.md §3.1, §4.4).

use crate::backend::Backend;
use crate::error::Result;
use crate::executor::{ExecutorOptions, TransactionalExecutor};
use crate::idgen::IdGenerator;
use crate::message::Message;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Supplies `now()`. Injectable so tests can control orphan-recovery
/// timing deterministically (spec.md §9 "Tests MUST inject a clock").
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The default clock, backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Whether a [`Queue`] owns its backend's lifecycle. Owned backends are
/// dropped when the queue closes; borrowed ones are not, because some other
/// owner is responsible for them (spec.md §9 "Cyclic configuration").
enum BackendHandle<B: Backend> {
    Owned(B),
    Borrowed(Arc<B>),
}

impl<B: Backend> std::ops::Deref for BackendHandle<B> {
    type Target = B;

    fn deref(&self) -> &B {
        match self {
            BackendHandle::Owned(b) => b,
            BackendHandle::Borrowed(b) => b,
        }
    }
}

/// The public queue contract (spec.md §6.1), generic over any [`Backend`].
pub struct Queue<B: Backend> {
    backend: BackendHandle<B>,
    executor: TransactionalExecutor,
    id_gen: IdGenerator,
    clock: Arc<dyn Clock>,
}

impl<B: Backend> Queue<B> {
    /// Opens a queue that owns `backend`: it is dropped when this `Queue`
    /// is dropped.
    pub fn open(backend: B) -> Self {
        Self::with_options(BackendHandle::Owned(backend), ExecutorOptions::default(), Arc::new(SystemClock))
    }

    /// Opens a queue over a backend shared with other owners; dropping this
    /// `Queue` does not destroy `backend`.
    pub fn open_borrowed(backend: Arc<B>) -> Self {
        Self::with_options(
            BackendHandle::Borrowed(backend),
            ExecutorOptions::default(),
            Arc::new(SystemClock),
        )
    }

    /// Full constructor for callers that need a custom retry policy or an
    /// injected clock (tests).
    pub fn open_with(backend: B, executor_options: ExecutorOptions, clock: Arc<dyn Clock>) -> Self {
        Self::with_options(BackendHandle::Owned(backend), executor_options, clock)
    }

    fn with_options(backend: BackendHandle<B>, executor_options: ExecutorOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            executor: TransactionalExecutor::new(executor_options),
            id_gen: IdGenerator::new(),
            clock,
        }
    }

    /// Closes the queue. Present for API parity with spec.md's `close()`;
    /// an owned backend's resources are released by Rust's ordinary `Drop`
    /// once this value (and thus its `BackendHandle::Owned`) goes away.
    pub fn close(self) -> Result<()> {
        Ok(())
    }

    /// Enqueues `msg` for the first time (spec.md §4.4 `queue`). Operates on
    /// a clone: `numRequeues` is reset to 0, `originalTimestamp` and
    /// `timestamp` are stamped with the current time, and an id is
    /// synthesized if `msg.id() == 0`.
    pub fn queue(&self, msg: &Message) -> Result<bool> {
        let mut msg = msg.clone();
        if msg.id() == 0 {
            msg.set_id(self.id_gen.next());
        }
        let now = self.clock.now();
        msg.set_num_requeues(0);
        msg.set_original_timestamp(now);
        msg.set_timestamp(now);

        self.executor.run(|| self.backend.push(&msg))
    }

    /// Takes the head of the queued store and records it as in-flight
    /// (spec.md §4.4 `take`).
    pub fn take(&self) -> Result<Option<Message>> {
        self.executor.run(|| {
            let Some(msg) = self.backend.pop()? else {
                return Ok(None);
            };
            let now = self.clock.now();
            self.backend.stash(&msg, now)?;
            Ok(Some(msg))
        })
    }

    /// Marks `msg` done: removes it from the ephemeral store. A no-op on
    /// backends without one, and idempotent (spec.md §4.4, §7).
    pub fn finish(&self, msg: &Message) -> Result<()> {
        self.executor.run(|| self.backend.unstash(msg.id()))
    }

    /// Visible requeue: unstashes, increments `numRequeues`, stamps
    /// `timestamp`, then re-enqueues (spec.md §4.4 `requeue`). Ordering
    /// matters — unstash must precede push to preserve the at-most-one
    /// in-flight invariant under concurrent orphan recovery (spec.md §4.4).
    pub fn requeue(&self, msg: &Message) -> Result<bool> {
        let mut msg = msg.clone();
        msg.inc_num_requeues();
        msg.set_timestamp(self.clock.now());
        self.requeue_transition(msg)
    }

    /// Silent requeue: unstashes and re-enqueues without touching
    /// `numRequeues` or `timestamp` (spec.md §4.4 `requeueSilent`). Used
    /// both as a public operation and internally by the executor's
    /// deadlock-retry policy, so that a retried requeue never inflates the
    /// visible retry count (spec.md §4.5).
    pub fn requeue_silent(&self, msg: &Message) -> Result<bool> {
        self.requeue_transition(msg.clone())
    }

    fn requeue_transition(&self, msg: Message) -> Result<bool> {
        self.executor.run(|| {
            self.backend.unstash(msg.id())?;
            self.backend.push(&msg)
        })
    }

    /// Returns in-flight entries older than `threshold`, or `None` if this
    /// backend has no ephemeral store (spec.md §6.1).
    pub fn get_orphan_messages(&self, threshold: chrono::Duration) -> Result<Option<Vec<Message>>> {
        if !self.backend.capabilities().ephemeral {
            return Ok(None);
        }
        let now = self.clock.now();
        let entries = self.backend.scan_orphans(now, threshold, 100)?;
        Ok(Some(entries.into_iter().map(|e| e.message).collect()))
    }

    /// Atomically moves `msg` from ephemeral back to queued without
    /// touching `numRequeues` (the orphan-recovery hook, spec.md §4.4).
    pub fn move_from_ephemeral_to_queue_storage(&self, msg: &Message) -> Result<bool> {
        self.executor.run(|| self.backend.move_ephemeral_to_queued(msg.id()))
    }

    /// Best-effort queued-store size, `-1` if unsupported (spec.md §6.1).
    pub fn queue_size(&self) -> i64 {
        self.backend.count_queued()
    }

    /// Best-effort ephemeral-store size, `-1` if unsupported (spec.md §6.1).
    pub fn ephemeral_size(&self) -> i64 {
        self.backend.count_ephemeral()
    }
}

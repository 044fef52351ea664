//! The backend port (spec.md C3): the narrow set of operations each backend
//! must provide. Not every backend implements every operation with real
//! semantics — ones it can't honor return [`QueueError::Unsupported`]
//! (spec.md §7, §9 "Polymorphism over backends").

use crate::error::Result;
use crate::message::Message;
use chrono::{DateTime, Utc};

/// What a given backend instance actually supports, reported up front so
/// [`crate::Queue`] can short-circuit calls that would only return
/// `Unsupported` anyway (e.g. skip polling for orphans on a log backend).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The backend maintains an ephemeral (in-flight) store at all.
    pub ephemeral: bool,
    /// `count_queued` / `count_ephemeral` return real sizes, not `-1`.
    pub sizes: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        ephemeral: false,
        sizes: false,
    };
    pub const FULL: Capabilities = Capabilities {
        ephemeral: true,
        sizes: true,
    };
}

/// An in-flight entry as returned by [`Backend::scan_orphans`]: the message
/// plus the instant it was taken.
#[derive(Debug, Clone)]
pub struct OrphanEntry {
    pub message: Message,
    pub taken_at: DateTime<Utc>,
}

/// The narrow set of operations a storage backend exposes to the queue
/// state machine (spec.md §4.3). Every method is present on every backend
/// for object-safety; backends without ephemeral support implement the
/// ephemeral-only operations as `Unsupported`.
pub trait Backend: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// Append to the queued store. Returns `Ok(true)` on durable accept,
    /// `Ok(false)` when rejected by a capacity policy (spec.md C8) rather
    /// than failing.
    fn push(&self, msg: &Message) -> Result<bool>;

    /// Remove and return the head of the queued store, or `None` if empty.
    fn pop(&self) -> Result<Option<Message>>;

    /// Record `msg` as in-flight as of `taken_at`. Idempotent on duplicate
    /// id: a second `stash` for the same id logs a warning and succeeds
    /// (spec.md §4.3, §7 DuplicateKey).
    fn stash(&self, msg: &Message, taken_at: DateTime<Utc>) -> Result<()>;

    /// Remove `id` from the in-flight store. Idempotent: removing an id
    /// that isn't present is not an error (spec.md §7 "finish on a
    /// non-existent id is a no-op").
    fn unstash(&self, id: u64) -> Result<()>;

    /// Best-effort queued-store size, or `-1` if this backend can't report
    /// one cheaply (spec.md §4.3).
    fn count_queued(&self) -> i64;

    /// Best-effort ephemeral-store size, or `-1` if unsupported.
    fn count_ephemeral(&self) -> i64;

    /// Up to `limit` in-flight entries whose original enqueue time plus the
    /// recovery threshold has elapsed as of `now` (spec.md §4.3, §4.6).
    fn scan_orphans(&self, now: DateTime<Utc>, threshold: chrono::Duration, limit: usize) -> Result<Vec<OrphanEntry>>;

    /// Atomically move `id` from the ephemeral store back to the queued
    /// store without touching retry counters (spec.md §4.3 invariant 4,
    /// §4.6). Returns `true` if a move actually happened.
    fn move_ephemeral_to_queued(&self, id: u64) -> Result<bool>;
}

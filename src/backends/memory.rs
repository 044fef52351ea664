//! The in-memory backend (spec.md C7 "In-memory", C8 "Bounded In-Memory
//! Variant"). Queued storage is a concurrent node-backed queue
//! (`crossbeam_queue::SegQueue`) when unbounded or above the 1024-boundary
//! tuning threshold, and a concurrent array-backed ring
//! (`crossbeam_queue::ArrayQueue`) below it — mirroring the
//! `ArrayBlockingQueue`/`LinkedBlockingQueue` tuning split spec.md §4.7
//! describes. Ephemeral storage is a `dashmap::DashMap` keyed by id.

use crate::backend::{Backend, Capabilities, OrphanEntry};
use crate::config::MemoryConfig;
use crate::error::Result;
use crate::message::Message;
use chrono::{DateTime, Utc};
use crossbeam_queue::{ArrayQueue, SegQueue};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

enum QueuedStore {
    Unbounded(SegQueue<Message>),
    ArrayBounded(ArrayQueue<Message>),
    NodeBounded {
        queue: SegQueue<Message>,
        cap: usize,
        len: AtomicUsize,
    },
}

impl QueuedStore {
    fn new(boundary: i64) -> Self {
        if boundary <= 0 {
            QueuedStore::Unbounded(SegQueue::new())
        } else if boundary > MemoryConfig::NODE_BACKED_THRESHOLD {
            QueuedStore::NodeBounded {
                queue: SegQueue::new(),
                cap: boundary as usize,
                len: AtomicUsize::new(0),
            }
        } else {
            QueuedStore::ArrayBounded(ArrayQueue::new(boundary as usize))
        }
    }

    /// Returns `true` on durable accept, `false` on overflow (spec.md C8).
    fn push(&self, msg: Message) -> bool {
        match self {
            QueuedStore::Unbounded(q) => {
                q.push(msg);
                true
            }
            QueuedStore::ArrayBounded(q) => q.push(msg).is_ok(),
            QueuedStore::NodeBounded { queue, cap, len } => {
                loop {
                    let current = len.load(Ordering::SeqCst);
                    if current >= *cap {
                        return false;
                    }
                    if len.compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                    {
                        break;
                    }
                }
                queue.push(msg);
                true
            }
        }
    }

    fn pop(&self) -> Option<Message> {
        match self {
            QueuedStore::Unbounded(q) => q.pop(),
            QueuedStore::ArrayBounded(q) => q.pop(),
            QueuedStore::NodeBounded { queue, len, .. } => {
                let msg = queue.pop();
                if msg.is_some() {
                    len.fetch_sub(1, Ordering::SeqCst);
                }
                msg
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            QueuedStore::Unbounded(q) => q.len(),
            QueuedStore::ArrayBounded(q) => q.len(),
            QueuedStore::NodeBounded { len, .. } => len.load(Ordering::SeqCst),
        }
    }
}

struct EphemeralEntry {
    message: Message,
    taken_at: DateTime<Utc>,
}

/// An in-memory, single-process [`Backend`] (spec.md C7/C8). Useful as a
/// default, for tests, and for single-instance deployments that don't need
/// cross-process durability.
pub struct MemoryBackend {
    config: MemoryConfig,
    queued: QueuedStore,
    ephemeral: Option<DashMap<u64, EphemeralEntry>>,
}

impl MemoryBackend {
    pub fn new(config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        let ephemeral = if config.ephemeral_disabled {
            None
        } else {
            Some(DashMap::new())
        };
        Ok(Self {
            queued: QueuedStore::new(config.boundary),
            ephemeral,
            config,
        })
    }

    /// `true` if the ephemeral store is at its configured cap and can take
    /// no more in-flight entries.
    fn ephemeral_saturated(&self) -> bool {
        match (&self.ephemeral, self.config.ephemeral_max_size) {
            (Some(map), Some(max)) => map.len() >= max,
            _ => false,
        }
    }
}

impl Backend for MemoryBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            ephemeral: self.ephemeral.is_some(),
            sizes: true,
        }
    }

    fn push(&self, msg: &Message) -> Result<bool> {
        Ok(self.queued.push(msg.clone()))
    }

    fn pop(&self) -> Result<Option<Message>> {
        // Back-pressure: if the ephemeral cap is saturated, refuse to pop
        // even though queued has items, so nothing is lost between pop and
        // stash (spec.md §4.7, §4.8).
        if self.ephemeral_saturated() {
            return Ok(None);
        }
        Ok(self.queued.pop())
    }

    fn stash(&self, msg: &Message, taken_at: DateTime<Utc>) -> Result<()> {
        let Some(ephemeral) = &self.ephemeral else {
            return Ok(());
        };
        if ephemeral.contains_key(&msg.id()) {
            log::warn!("duplicate stash for id {}, keeping existing entry", msg.id());
            return Ok(());
        }
        ephemeral.insert(
            msg.id(),
            EphemeralEntry {
                message: msg.clone(),
                taken_at,
            },
        );
        Ok(())
    }

    fn unstash(&self, id: u64) -> Result<()> {
        if let Some(ephemeral) = &self.ephemeral {
            ephemeral.remove(&id);
        }
        Ok(())
    }

    fn count_queued(&self) -> i64 {
        self.queued.len() as i64
    }

    fn count_ephemeral(&self) -> i64 {
        match &self.ephemeral {
            Some(map) => map.len() as i64,
            None => -1,
        }
    }

    fn scan_orphans(
        &self,
        now: DateTime<Utc>,
        threshold: chrono::Duration,
        limit: usize,
    ) -> Result<Vec<OrphanEntry>> {
        let Some(ephemeral) = &self.ephemeral else {
            return Err(crate::error::QueueError::Unsupported("scan_orphans"));
        };

        let mut orphans: Vec<OrphanEntry> = ephemeral
            .iter()
            .filter(|entry| {
                let original = entry
                    .message
                    .original_timestamp()
                    .unwrap_or(entry.taken_at);
                original + threshold < now
            })
            .map(|entry| OrphanEntry {
                message: entry.message.clone(),
                taken_at: entry.taken_at,
            })
            .take(limit)
            .collect();

        orphans.sort_by_key(|o| o.taken_at);
        Ok(orphans)
    }

    fn move_ephemeral_to_queued(&self, id: u64) -> Result<bool> {
        let Some(ephemeral) = &self.ephemeral else {
            return Err(crate::error::QueueError::Unsupported("move_ephemeral_to_queued"));
        };
        let Some((_, entry)) = ephemeral.remove(&id) else {
            return Ok(false);
        };
        if !self.queued.push(entry.message) {
            log::error!("orphan recovery dropped id {id}: queued store is at capacity");
        }
        Ok(true)
    }
}

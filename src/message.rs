//! The message contract (spec.md C1): identity, retry/time metadata, and
//! the clone discipline the state machine depends on.

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A unit of work moving through the queue.
///
/// `Message` is always handled by value or by `clone()` inside the state
/// machine (spec.md §3.1 "Clone discipline") — mutating a `Message` you
/// still hold after calling [`crate::Queue::queue`] must never be visible
/// through the copy the backend actually stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: u64,
    num_requeues: u32,
    original_timestamp: Option<DateTime<Utc>>,
    timestamp: Option<DateTime<Utc>>,
    payload: Bytes,
    partition_key: Option<Bytes>,
}

impl Message {
    /// Builds a new message with the given id (`0` requests id synthesis,
    /// see [`crate::idgen`]) and payload. `num_requeues` starts at zero and
    /// both timestamps are unset until the message passes through
    /// [`crate::Queue::queue`].
    pub fn new(id: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            num_requeues: 0,
            original_timestamp: None,
            timestamp: None,
            payload: payload.into(),
            partition_key: None,
        }
    }

    /// Overrides the partition-routing token. When unset, `id` itself acts
    /// as the partition key (spec.md §3.1, §4.1 `PartitionSupport`).
    pub fn with_partition_key(mut self, key: impl Into<Bytes>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn num_requeues(&self) -> u32 {
        self.num_requeues
    }

    pub fn original_timestamp(&self) -> Option<DateTime<Utc>> {
        self.original_timestamp
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// The token backends shard/route by: the explicit partition key if the
    /// message carries one, otherwise its `id`.
    pub fn partition_key(&self) -> Bytes {
        self.partition_key
            .clone()
            .unwrap_or_else(|| Bytes::from(self.id.to_be_bytes().to_vec()))
    }

    pub(crate) fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    pub(crate) fn set_num_requeues(&mut self, n: u32) {
        self.num_requeues = n;
    }

    pub(crate) fn inc_num_requeues(&mut self) {
        self.num_requeues += 1;
    }

    pub(crate) fn set_original_timestamp(&mut self, t: DateTime<Utc>) {
        self.original_timestamp = Some(t);
    }

    pub(crate) fn set_timestamp(&mut self, t: DateTime<Utc>) {
        self.timestamp = Some(t);
    }
}

/// Capability for messages whose partition key is computed rather than
/// stored (spec.md §4.1 `PartitionSupport`). `Message` implements this
/// directly via [`Message::partition_key`]; the trait exists so codecs
/// wrapping foreign message types can plug in without reshaping `Message`
/// itself.
pub trait PartitionSupport {
    fn partition_key(&self) -> Option<Bytes>;
}

impl PartitionSupport for Message {
    fn partition_key(&self) -> Option<Bytes> {
        Some(Message::partition_key(self))
    }
}

//! A durable, at-least-once message queue abstraction with pluggable
//! storage backends.
//!
//! The core ([`Message`], [`Queue`], [`Backend`]) is storage-agnostic: a
//! [`Queue`] drives the `queued` -> `in-flight` -> `done`/`requeued` state
//! machine and delegates the actual storage of each state to whatever
//! [`Backend`] it's opened over. Four adapters ship behind Cargo features:
//!
//! - `memory` (default): a single-process backend over `dashmap`/`crossbeam-queue`.
//! - `relational`: a two-table Postgres adapter.
//! - `kv`: a Redis hash+list+sorted-set adapter.
//! - `log-backend`: a Kafka topic adapter.
//!
//! # Examples
//!
//! ```
//! use durable_mq::{Queue, Message};
//! use durable_mq::backends::memory::MemoryBackend;
//! use durable_mq::config::MemoryConfig;
//!
//! # fn main() -> Result<(), durable_mq::QueueError> {
//! let queue = Queue::open(MemoryBackend::new(MemoryConfig::default())?);
//!
//! queue.queue(&Message::new(0, "hello"))?;
//! let taken = queue.take()?.expect("message is available");
//! queue.finish(&taken)?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod backends;
pub mod codec;
pub mod config;
pub mod error;
pub mod executor;
pub mod idgen;
pub mod message;
pub mod queue;
pub mod recovery;

pub use backend::{Backend, Capabilities, OrphanEntry};
pub use codec::{BinaryCodec, Codec};
pub use error::{QueueError, Result};
pub use executor::{ExecutorOptions, TransactionalExecutor};
pub use idgen::IdGenerator;
pub use message::{Message, PartitionSupport};
pub use queue::{Clock, Queue, SystemClock};
pub use recovery::{recover_orphans, DEFAULT_BATCH_SIZE};

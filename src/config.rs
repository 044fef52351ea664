//! Configuration surface (spec.md §6.2): one options struct per backend,
//! each with documented defaults and a `validate()` that raises
//! [`QueueError::Configuration`] rather than panicking — mirroring the
//! teacher's `WalOptions::validate`.

use crate::error::{QueueError, Result};
use std::time::Duration;

/// Options for the two-table relational backend.
#[derive(Debug, Clone)]
pub struct RelationalConfig {
    pub table_name: String,
    pub table_name_ephemeral: String,
    pub database_url: String,
    pub max_retries: u32,
    pub isolation_serializable: bool,
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            table_name: "Q".to_string(),
            table_name_ephemeral: "E".to_string(),
            database_url: String::new(),
            max_retries: 3,
            isolation_serializable: true,
        }
    }
}

impl RelationalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            return Err(QueueError::Configuration(
                "database_url must be set".to_string(),
            ));
        }
        if self.table_name.is_empty() || self.table_name_ephemeral.is_empty() {
            return Err(QueueError::Configuration(
                "table_name and table_name_ephemeral must be non-empty".to_string(),
            ));
        }
        if self.table_name == self.table_name_ephemeral {
            return Err(QueueError::Configuration(
                "table_name and table_name_ephemeral must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options for the hash+list+sorted-set key-value backend.
#[derive(Debug, Clone)]
pub struct KvConfig {
    pub host_port: String,
    pub hash_name: String,
    pub list_name: String,
    pub sorted_set_name: String,
    pub pool_size: u32,
    pub pool_idle: u32,
    pub wait: Duration,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            host_port: String::new(),
            hash_name: "queue_h".to_string(),
            list_name: "queue_l".to_string(),
            sorted_set_name: "queue_s".to_string(),
            pool_size: 32,
            pool_idle: 1,
            wait: Duration::from_millis(10_000),
        }
    }
}

impl KvConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host_port.is_empty() {
            return Err(QueueError::Configuration(
                "host_port must be set".to_string(),
            ));
        }
        if self.pool_size == 0 {
            return Err(QueueError::Configuration(
                "pool_size must be greater than 0".to_string(),
            ));
        }
        if self.pool_idle > self.pool_size {
            return Err(QueueError::Configuration(
                "pool_idle must not exceed pool_size".to_string(),
            ));
        }
        Ok(())
    }
}

/// Acknowledgement mode requested from the log backend's producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerAckMode {
    /// Wait only for the partition leader to acknowledge the write.
    LeaderAck,
    /// Wait for all in-sync replicas.
    AllReplicas,
}

/// Options for the distributed-log backend.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub bootstrap_servers: String,
    pub topic: String,
    pub consumer_group_id: String,
    pub producer_ack_mode: ProducerAckMode,
    pub send_async: bool,
    pub poll_timeout: Duration,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: String::new(),
            topic: String::new(),
            consumer_group_id: String::new(),
            producer_ack_mode: ProducerAckMode::LeaderAck,
            send_async: true,
            poll_timeout: Duration::from_millis(1000),
        }
    }
}

impl LogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bootstrap_servers.is_empty() {
            return Err(QueueError::Configuration(
                "bootstrap_servers must be set".to_string(),
            ));
        }
        if self.topic.is_empty() {
            return Err(QueueError::Configuration("topic must be set".to_string()));
        }
        if self.consumer_group_id.is_empty() {
            return Err(QueueError::Configuration(
                "consumer_group_id must be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options for the in-memory backend (spec.md §4.7, §4.8).
#[derive(Debug, Clone, Copy)]
pub struct MemoryConfig {
    /// Queued-store capacity. `<= 0` means unbounded; `> 1024` selects the
    /// node-backed (linked) bounded container, otherwise the array-backed
    /// one, matching the tuning split described in spec.md §4.7.
    pub boundary: i64,
    /// Disables the ephemeral store entirely (no redelivery tracking).
    pub ephemeral_disabled: bool,
    /// Caps the ephemeral set; `None` means unbounded.
    pub ephemeral_max_size: Option<usize>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            boundary: 0,
            ephemeral_disabled: false,
            ephemeral_max_size: None,
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(0) = self.ephemeral_max_size {
            return Err(QueueError::Configuration(
                "ephemeral_max_size of 0 would make take() always back-pressure".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) const NODE_BACKED_THRESHOLD: i64 = 1024;
}

//! The key-value backend (spec.md C7 "Key-Value"): a Redis hash holds
//! encoded message bodies keyed by id, a list holds the FIFO queued order,
//! and a sorted set holds in-flight ids scored by `originalTimestamp` so
//! `scan_orphans` can filter on `originalTimestamp + threshold < now`
//! (spec.md §4.3) with a cheap `ZRANGEBYSCORE`, the same field
//! `relational.rs` filters `WHERE original_ts < $1` on and `memory.rs`
//! filters `entry.message.original_timestamp()` on. Each multi-step
//! transition is one Lua script so it runs atomically on the server — the
//! same approach `relational.rs` takes with a SQL transaction for the same
//! reason.

use crate::backend::{Backend, Capabilities, OrphanEntry};
use crate::codec::Codec;
use crate::config::KvConfig;
use crate::error::{QueueError, Result};
use crate::message::Message;
use chrono::{DateTime, Utc};
use r2d2::{ManageConnection, Pool};
use redis::{Commands, Script};

struct RedisConnectionManager {
    client: redis::Client,
}

impl ManageConnection for RedisConnectionManager {
    type Connection = redis::Connection;
    type Error = redis::RedisError;

    fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        self.client.get_connection()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        redis::cmd("PING").query(conn)
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

// Note: the take script does not touch the sorted set. Recording the
// in-flight entry (scored by originalTimestamp) is `stash`'s job alone, so
// there is exactly one writer into the sorted set and it can't race with
// orphan recovery (see `KvBackend::stash`).
const SCRIPT_TAKE: &str = r#"
local id = redis.call('LPOP', KEYS[1])
if not id then return false end
local content = redis.call('HGET', KEYS[2], id)
return {id, content}
"#;

// HSETNX gates the RPUSH so a duplicate id can never be enqueued twice by
// two concurrent pushes racing on a separate HEXISTS check (spec.md §7
// DuplicateKey, invariant 1).
const SCRIPT_PUSH: &str = r#"
local created = redis.call('HSETNX', KEYS[1], ARGV[1], ARGV[2])
if created == 0 then return false end
redis.call('RPUSH', KEYS[2], ARGV[1])
return true
"#;

// ZADD NX so a second stash for the same id is a genuine no-op rather than
// overwriting the first entry's score (spec.md §4.3 duplicate-stash).
const SCRIPT_STASH: &str = r#"
local added = redis.call('ZADD', KEYS[1], 'NX', ARGV[1], ARGV[2])
return added
"#;

const SCRIPT_MOVE_TO_QUEUED: &str = r#"
local removed = redis.call('ZREM', KEYS[1], ARGV[1])
if removed == 0 then return false end
redis.call('RPUSH', KEYS[2], ARGV[1])
return true
"#;

/// A Redis-backed [`Backend`] (spec.md §6.3).
pub struct KvBackend {
    pool: Pool<RedisConnectionManager>,
    config: KvConfig,
    codec: Box<dyn Codec>,
    take_script: Script,
    push_script: Script,
    stash_script: Script,
    move_script: Script,
}

impl KvBackend {
    pub fn connect(config: KvConfig, codec: Box<dyn Codec>) -> Result<Self> {
        config.validate()?;
        let client = redis::Client::open(format!("redis://{}", config.host_port))
            .map_err(|e| QueueError::Configuration(e.to_string()))?;
        let manager = RedisConnectionManager { client };
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(config.pool_idle))
            .connection_timeout(config.wait)
            .build(manager)
            .map_err(|e| QueueError::backend(e))?;
        Ok(Self {
            pool,
            config,
            codec,
            take_script: Script::new(SCRIPT_TAKE),
            push_script: Script::new(SCRIPT_PUSH),
            stash_script: Script::new(SCRIPT_STASH),
            move_script: Script::new(SCRIPT_MOVE_TO_QUEUED),
        })
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<RedisConnectionManager>> {
        self.pool.get().map_err(|e| QueueError::backend(e))
    }
}

fn to_queue_error(err: redis::RedisError) -> QueueError {
    if err.is_timeout() || err.is_connection_dropped() || err.is_connection_refusal() {
        QueueError::TransientBackendFailure(err.to_string())
    } else {
        QueueError::backend(err)
    }
}

impl Backend for KvBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities::FULL
    }

    fn push(&self, msg: &Message) -> Result<bool> {
        let mut conn = self.conn()?;
        let content = self.codec.encode(msg)?;
        let id = msg.id().to_string();

        let created: bool = self
            .push_script
            .key(&self.config.hash_name)
            .key(&self.config.list_name)
            .arg(&id)
            .arg(content.as_ref())
            .invoke(&mut *conn)
            .map_err(to_queue_error)?;

        if !created {
            log::warn!("duplicate key on push for id {id}, treating as success");
        }
        Ok(true)
    }

    fn pop(&self) -> Result<Option<Message>> {
        let mut conn = self.conn()?;

        let result: Option<(String, Vec<u8>)> = self
            .take_script
            .key(&self.config.list_name)
            .key(&self.config.hash_name)
            .invoke(&mut *conn)
            .map_err(to_queue_error)?;

        let Some((_, content)) = result else {
            return Ok(None);
        };

        let msg = self.codec.decode(&content)?;
        Ok(Some(msg))
    }

    fn stash(&self, msg: &Message, taken_at: DateTime<Utc>) -> Result<()> {
        // Sole writer into the sorted set (spec.md §4.3): scored by
        // `originalTimestamp`, not take time, so `scan_orphans` can filter
        // on `originalTimestamp + threshold < now` the same way
        // `relational.rs` and `memory.rs` do.
        let mut conn = self.conn()?;
        let id = msg.id().to_string();
        let original_ms = msg.original_timestamp().unwrap_or(taken_at).timestamp_millis();

        let added: bool = self
            .stash_script
            .key(&self.config.sorted_set_name)
            .arg(original_ms)
            .arg(&id)
            .invoke(&mut *conn)
            .map_err(to_queue_error)?;

        if !added {
            log::warn!("duplicate stash for id {id}, keeping existing entry");
        }
        Ok(())
    }

    fn unstash(&self, id: u64) -> Result<()> {
        let mut conn = self.conn()?;
        let id = id.to_string();
        let _: () = redis::pipe()
            .atomic()
            .zrem(&self.config.sorted_set_name, &id)
            .hdel(&self.config.hash_name, &id)
            .query(&mut *conn)
            .map_err(to_queue_error)?;
        Ok(())
    }

    fn count_queued(&self) -> i64 {
        let Ok(mut conn) = self.conn() else { return -1 };
        conn.llen(&self.config.list_name).unwrap_or(-1)
    }

    fn count_ephemeral(&self) -> i64 {
        let Ok(mut conn) = self.conn() else { return -1 };
        conn.zcard(&self.config.sorted_set_name).unwrap_or(-1)
    }

    fn scan_orphans(&self, now: DateTime<Utc>, threshold: chrono::Duration, limit: usize) -> Result<Vec<OrphanEntry>> {
        let mut conn = self.conn()?;
        // The sorted set is scored by originalTimestamp (see `stash`), so
        // this range matches spec.md §4.3's literal `originalTimestamp +
        // threshold < now` contract directly.
        let cutoff = (now - threshold).timestamp_millis();

        let ids: Vec<String> = conn
            .zrangebyscore_limit(&self.config.sorted_set_name, 0, cutoff, 0, limit as isize)
            .map_err(to_queue_error)?;

        let mut orphans = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(content): Option<Vec<u8>> = conn
                .hget(&self.config.hash_name, &id)
                .map_err(to_queue_error)?
            else {
                continue;
            };
            let message = self.codec.decode(&content)?;
            let taken_at = message.timestamp().unwrap_or(now);
            orphans.push(OrphanEntry { message, taken_at });
        }
        Ok(orphans)
    }

    fn move_ephemeral_to_queued(&self, id: u64) -> Result<bool> {
        let mut conn = self.conn()?;
        let id = id.to_string();
        let moved: bool = self
            .move_script
            .key(&self.config.sorted_set_name)
            .key(&self.config.list_name)
            .arg(&id)
            .invoke(&mut *conn)
            .map_err(to_queue_error)?;
        Ok(moved)
    }
}

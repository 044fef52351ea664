//! The two-table relational backend (spec.md C7 "Relational"). Queued and
//! in-flight messages live in separate tables with identical schema
//! `(id PK, original_ts, ts, num_requeues, content BLOB)`; `pop` is a
//! `SELECT ... FOR UPDATE` followed by a `DELETE` inside one serializable
//! transaction, and deadlocks/serialization failures are surfaced as
//! [`QueueError::Deadlock`] so [`crate::executor::TransactionalExecutor`]
//! retries the whole transition (spec.md §4.5, §4.7).

use crate::backend::{Backend, Capabilities, OrphanEntry};
use crate::codec::Codec;
use crate::config::RelationalConfig;
use crate::error::{QueueError, Result};
use crate::message::Message;
use chrono::{DateTime, Utc};
use postgres::{IsolationLevel, NoTls};
use r2d2_postgres::PostgresConnectionManager;

type Pool = r2d2::Pool<PostgresConnectionManager<NoTls>>;

/// Postgres error codes treated as retryable deadlock-class failures. Both
/// a literal deadlock and a serializable-isolation conflict land here,
/// since under `SERIALIZABLE` a commit-time conflict surfaces the same way
/// a classic deadlock would to a caller: retry the transition.
const DEADLOCK_DETECTED: &str = "40P01";
const SERIALIZATION_FAILURE: &str = "40001";

/// A Postgres-backed [`Backend`] using two tables for queued and in-flight
/// messages (spec.md §6.3).
pub struct RelationalBackend {
    pool: Pool,
    config: RelationalConfig,
    codec: Box<dyn Codec>,
}

impl RelationalBackend {
    pub fn connect(config: RelationalConfig, codec: Box<dyn Codec>) -> Result<Self> {
        config.validate()?;
        let manager = PostgresConnectionManager::new(
            config
                .database_url
                .parse()
                .map_err(|e: postgres::Error| QueueError::Configuration(e.to_string()))?,
            NoTls,
        );
        let pool = r2d2::Pool::new(manager).map_err(|e| QueueError::backend(e))?;
        let backend = Self { pool, config, codec };
        backend.init_schema()?;
        Ok(backend)
    }

    fn init_schema(&self) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| QueueError::backend(e))?;
        for table in [&self.config.table_name, &self.config.table_name_ephemeral] {
            conn.batch_execute(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id BIGINT PRIMARY KEY,
                    original_ts TIMESTAMPTZ NOT NULL,
                    ts TIMESTAMPTZ NOT NULL,
                    num_requeues INTEGER NOT NULL,
                    content BYTEA NOT NULL
                )"
            ))
            .map_err(to_queue_error)?;
        }
        Ok(())
    }

    fn begin(&self) -> Result<r2d2::PooledConnection<PostgresConnectionManager<NoTls>>> {
        self.pool.get().map_err(|e| QueueError::backend(e))
    }
}

fn to_queue_error(err: postgres::Error) -> QueueError {
    if let Some(db_err) = err.as_db_error() {
        match db_err.code().code() {
            DEADLOCK_DETECTED | SERIALIZATION_FAILURE => {
                return QueueError::Deadlock(db_err.message().to_string())
            }
            _ => {}
        }
    }
    QueueError::TransientBackendFailure(err.to_string())
}

impl Backend for RelationalBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities::FULL
    }

    fn push(&self, msg: &Message) -> Result<bool> {
        let mut conn = self.begin()?;
        let content = self.codec.encode(msg)?;
        let original = msg.original_timestamp().unwrap_or_else(Utc::now);
        let ts = msg.timestamp().unwrap_or(original);

        let mut txn = conn
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .map_err(to_queue_error)?;

        let outcome = txn.execute(
            &format!(
                "INSERT INTO {} (id, original_ts, ts, num_requeues, content)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (id) DO NOTHING",
                self.config.table_name
            ),
            &[
                &(msg.id() as i64),
                &original,
                &ts,
                &(msg.num_requeues() as i32),
                &content.as_ref(),
            ],
        );

        match outcome {
            Ok(rows) => {
                if rows == 0 {
                    log::warn!("duplicate key on push for id {}, treating as success", msg.id());
                }
                txn.commit().map_err(to_queue_error)?;
                Ok(true)
            }
            Err(e) => {
                let classified = to_queue_error(e);
                Err(classified)
            }
        }
    }

    fn pop(&self) -> Result<Option<Message>> {
        let mut conn = self.begin()?;
        let mut txn = conn
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .map_err(to_queue_error)?;

        let row = txn
            .query_opt(
                &format!(
                    "SELECT id, content FROM {} ORDER BY ts ASC LIMIT 1 FOR UPDATE SKIP LOCKED",
                    self.config.table_name
                ),
                &[],
            )
            .map_err(to_queue_error)?;

        let Some(row) = row else {
            txn.commit().map_err(to_queue_error)?;
            return Ok(None);
        };

        let id: i64 = row.get(0);
        let content: Vec<u8> = row.get(1);

        txn.execute(
            &format!("DELETE FROM {} WHERE id = $1", self.config.table_name),
            &[&id],
        )
        .map_err(to_queue_error)?;

        txn.commit().map_err(to_queue_error)?;

        let msg = self.codec.decode(&content)?;
        Ok(Some(msg))
    }

    fn stash(&self, msg: &Message, taken_at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.begin()?;
        let content = self.codec.encode(msg)?;
        let original = msg.original_timestamp().unwrap_or(taken_at);

        let rows = conn
            .execute(
                &format!(
                    "INSERT INTO {} (id, original_ts, ts, num_requeues, content)
                     VALUES ($1, $2, $3, $4, $5)
                     ON CONFLICT (id) DO NOTHING",
                    self.config.table_name_ephemeral
                ),
                &[
                    &(msg.id() as i64),
                    &original,
                    &taken_at,
                    &(msg.num_requeues() as i32),
                    &content.as_ref(),
                ],
            )
            .map_err(to_queue_error)?;

        if rows == 0 {
            log::warn!("duplicate stash for id {}, keeping existing entry", msg.id());
        }
        Ok(())
    }

    fn unstash(&self, id: u64) -> Result<()> {
        let mut conn = self.begin()?;
        conn.execute(
            &format!("DELETE FROM {} WHERE id = $1", self.config.table_name_ephemeral),
            &[&(id as i64)],
        )
        .map_err(to_queue_error)?;
        Ok(())
    }

    fn count_queued(&self) -> i64 {
        count_table(&self.pool, &self.config.table_name).unwrap_or(-1)
    }

    fn count_ephemeral(&self) -> i64 {
        count_table(&self.pool, &self.config.table_name_ephemeral).unwrap_or(-1)
    }

    fn scan_orphans(&self, now: DateTime<Utc>, threshold: chrono::Duration, limit: usize) -> Result<Vec<OrphanEntry>> {
        let mut conn = self.begin()?;
        let cutoff = now - threshold;

        let rows = conn
            .query(
                &format!(
                    "SELECT content, ts FROM {} WHERE original_ts < $1 ORDER BY original_ts ASC LIMIT $2",
                    self.config.table_name_ephemeral
                ),
                &[&cutoff, &(limit as i64)],
            )
            .map_err(to_queue_error)?;

        rows.into_iter()
            .map(|row| {
                let content: Vec<u8> = row.get(0);
                let taken_at: DateTime<Utc> = row.get(1);
                Ok(OrphanEntry {
                    message: self.codec.decode(&content)?,
                    taken_at,
                })
            })
            .collect()
    }

    fn move_ephemeral_to_queued(&self, id: u64) -> Result<bool> {
        let mut conn = self.begin()?;
        let mut txn = conn
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .map_err(to_queue_error)?;

        let row = txn
            .query_opt(
                &format!(
                    "DELETE FROM {} WHERE id = $1 RETURNING original_ts, num_requeues, content",
                    self.config.table_name_ephemeral
                ),
                &[&(id as i64)],
            )
            .map_err(to_queue_error)?;

        let Some(row) = row else {
            txn.commit().map_err(to_queue_error)?;
            return Ok(false);
        };

        let original_ts: DateTime<Utc> = row.get(0);
        let num_requeues: i32 = row.get(1);
        let content: Vec<u8> = row.get(2);

        txn.execute(
            &format!(
                "INSERT INTO {} (id, original_ts, ts, num_requeues, content) VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (id) DO NOTHING",
                self.config.table_name
            ),
            &[&(id as i64), &original_ts, &original_ts, &num_requeues, &content],
        )
        .map_err(to_queue_error)?;

        txn.commit().map_err(to_queue_error)?;
        Ok(true)
    }
}

fn count_table(pool: &Pool, table: &str) -> std::result::Result<i64, ()> {
    let mut conn = pool.get().map_err(|_| ())?;
    let row = conn
        .query_one(&format!("SELECT COUNT(*) FROM {table}"), &[])
        .map_err(|_| ())?;
    Ok(row.get(0))
}

//! The distributed-log backend (spec.md C7 "Distributed Log"): a single
//! Kafka topic, partitioned by `partitionKey ?? id` (spec.md §4.1), stands
//! in for both the queued and in-flight stores at once. There is no
//! separate ephemeral store — a consumer-group commit on `finish` is what a
//! log backend would use in place of unstash, and that commit-on-take
//! behavior is modeled here as a no-op rather than a genuine move, per the
//! resolution of spec.md §9's "what does `finish` mean on a log backend"
//! open question (see SPEC_FULL.md §9). Orphan scanning and ephemeral-to-
//! queued moves have no meaning here and return `Unsupported`.

use crate::backend::{Backend, Capabilities, OrphanEntry};
use crate::codec::Codec;
use crate::config::{LogConfig, ProducerAckMode};
use crate::error::{QueueError, Result};
use crate::message::Message;
use chrono::{DateTime, Utc};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::producer::{BaseProducer, BaseRecord, Producer};
use rdkafka::Message as _;
use std::time::Duration;

/// A Kafka-backed [`Backend`] (spec.md §6.3). `take` polls the consumer for
/// up to `config.poll_timeout`; `queue` hands off to the producer and
/// blocks on delivery according to `config.send_async`.
pub struct LogBackend {
    config: LogConfig,
    codec: Box<dyn Codec>,
    producer: BaseProducer,
    consumer: BaseConsumer,
}

impl LogBackend {
    pub fn connect(config: LogConfig, codec: Box<dyn Codec>) -> Result<Self> {
        config.validate()?;

        let acks = match config.producer_ack_mode {
            ProducerAckMode::LeaderAck => "1",
            ProducerAckMode::AllReplicas => "all",
        };

        let producer: BaseProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("acks", acks)
            .create()
            .map_err(|e| QueueError::backend(e))?;

        let consumer: BaseConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("group.id", &config.consumer_group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| QueueError::backend(e))?;
        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| QueueError::backend(e))?;

        Ok(Self {
            config,
            codec,
            producer,
            consumer,
        })
    }
}

impl Backend for LogBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    fn push(&self, msg: &Message) -> Result<bool> {
        let content = self.codec.encode(msg)?;
        let key = msg.partition_key();

        let record = BaseRecord::to(&self.config.topic)
            .payload(content.as_ref())
            .key(key.as_ref());

        self.producer
            .send(record)
            .map_err(|(e, _)| QueueError::backend(e))?;

        if !self.config.send_async {
            self.producer
                .flush(Duration::from_secs(30))
                .map_err(|e| QueueError::backend(e))?;
        }
        Ok(true)
    }

    fn pop(&self) -> Result<Option<Message>> {
        let poll = self.consumer.poll(self.config.poll_timeout);
        let Some(result) = poll else {
            return Ok(None);
        };
        let borrowed = result.map_err(|e| QueueError::backend(e))?;
        let payload = borrowed
            .payload()
            .ok_or_else(|| QueueError::Serialization("Kafka record had no payload".to_string()))?;
        let msg = self.codec.decode(payload)?;
        Ok(Some(msg))
    }

    /// No-op: there is no separate in-flight store on a log backend
    /// (spec.md §9, resolved in SPEC_FULL.md §9).
    fn stash(&self, _msg: &Message, _taken_at: DateTime<Utc>) -> Result<()> {
        Ok(())
    }

    /// No-op: auto-commit already advanced the consumer group's offset past
    /// this record when it was polled in [`LogBackend::pop`]; there is
    /// nothing further to acknowledge.
    fn unstash(&self, _id: u64) -> Result<()> {
        Ok(())
    }

    fn count_queued(&self) -> i64 {
        -1
    }

    fn count_ephemeral(&self) -> i64 {
        -1
    }

    fn scan_orphans(&self, _now: DateTime<Utc>, _threshold: chrono::Duration, _limit: usize) -> Result<Vec<OrphanEntry>> {
        Err(QueueError::Unsupported("scan_orphans"))
    }

    fn move_ephemeral_to_queued(&self, _id: u64) -> Result<bool> {
        Err(QueueError::Unsupported("move_ephemeral_to_queued"))
    }
}

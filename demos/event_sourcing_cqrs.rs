//! Demonstrates using the queue as the write-side event bus of a small
//! event-sourced/CQRS setup: domain events are serialized to JSON and
//! queued; a projector consumer takes each one and folds it into a
//! read-model, acknowledging with `finish` only once the projection has
//! been applied.

use durable_mq::backends::memory::MemoryBackend;
use durable_mq::config::MemoryConfig;
use durable_mq::{Message, Queue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize)]
enum AccountEvent {
    Opened { account_id: String },
    Deposited { account_id: String, amount: i64 },
    Withdrawn { account_id: String, amount: i64 },
}

fn main() {
    env_logger::init();

    let queue = Queue::open(MemoryBackend::new(MemoryConfig::default()).unwrap());

    let events = vec![
        AccountEvent::Opened {
            account_id: "acct-1".into(),
        },
        AccountEvent::Deposited {
            account_id: "acct-1".into(),
            amount: 500,
        },
        AccountEvent::Withdrawn {
            account_id: "acct-1".into(),
            amount: 200,
        },
    ];

    for event in &events {
        let payload = serde_json::to_vec(event).expect("event serializes");
        queue.queue(&Message::new(0, payload)).unwrap();
    }

    let mut balances: HashMap<String, i64> = HashMap::new();
    while let Some(msg) = queue.take().unwrap() {
        let event: AccountEvent =
            serde_json::from_slice(msg.payload()).expect("stored event deserializes");

        match event {
            AccountEvent::Opened { account_id } => {
                balances.insert(account_id, 0);
            }
            AccountEvent::Deposited { account_id, amount } => {
                *balances.entry(account_id).or_insert(0) += amount;
            }
            AccountEvent::Withdrawn { account_id, amount } => {
                *balances.entry(account_id).or_insert(0) -= amount;
            }
        }

        queue.finish(&msg).unwrap();
    }

    for (account, balance) in &balances {
        println!("projection: {account} balance = {balance}");
    }
}

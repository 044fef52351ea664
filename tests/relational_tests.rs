//! Integration coverage for the two-table Postgres backend (spec.md C7
//! "Relational"). Needs a live Postgres reachable via
//! `DURABLE_MQ_TEST_DATABASE_URL`; skipped otherwise.

#![cfg(feature = "relational")]

use durable_mq::backends::relational::RelationalBackend;
use durable_mq::config::RelationalConfig;
use durable_mq::{Backend, BinaryCodec, Message};

fn backend() -> RelationalBackend {
    let url = std::env::var("DURABLE_MQ_TEST_DATABASE_URL")
        .expect("set DURABLE_MQ_TEST_DATABASE_URL to run relational backend tests");
    RelationalBackend::connect(
        RelationalConfig {
            database_url: url,
            table_name: format!("q_test_{}", std::process::id()),
            table_name_ephemeral: format!("e_test_{}", std::process::id()),
            ..Default::default()
        },
        Box::new(BinaryCodec),
    )
    .unwrap()
}

#[test]
#[ignore = "requires a running Postgres reachable via DURABLE_MQ_TEST_DATABASE_URL"]
fn push_then_pop_roundtrips_payload() {
    let backend = backend();
    let msg = Message::new(1, "hello");
    assert!(backend.push(&msg).unwrap());
    let popped = backend.pop().unwrap().unwrap();
    assert_eq!(popped.id(), 1);
    assert_eq!(popped.payload().as_ref(), b"hello");
}

#[test]
#[ignore = "requires a running Postgres reachable via DURABLE_MQ_TEST_DATABASE_URL"]
fn stash_then_move_ephemeral_back_to_queued() {
    let backend = backend();
    let msg = Message::new(2, "payload");
    backend.stash(&msg, chrono::Utc::now()).unwrap();
    assert_eq!(backend.count_ephemeral(), 1);
    assert!(backend.move_ephemeral_to_queued(2).unwrap());
    assert_eq!(backend.count_queued(), 1);
    assert_eq!(backend.count_ephemeral(), 0);
}

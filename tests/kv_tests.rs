//! Integration coverage for the Redis hash+list+sorted-set backend
//! (spec.md C7 "Key-Value"). Needs a live Redis reachable via
//! `DURABLE_MQ_TEST_REDIS_URL`; skipped otherwise.

#![cfg(feature = "kv")]

use durable_mq::backends::kv::KvBackend;
use durable_mq::config::KvConfig;
use durable_mq::{Backend, BinaryCodec, Message};

fn backend() -> KvBackend {
    let host_port = std::env::var("DURABLE_MQ_TEST_REDIS_URL")
        .expect("set DURABLE_MQ_TEST_REDIS_URL to run kv backend tests");
    KvBackend::connect(
        KvConfig {
            host_port,
            hash_name: format!("durable_mq_test_h_{}", std::process::id()),
            list_name: format!("durable_mq_test_l_{}", std::process::id()),
            sorted_set_name: format!("durable_mq_test_s_{}", std::process::id()),
            ..Default::default()
        },
        Box::new(BinaryCodec),
    )
    .unwrap()
}

#[test]
#[ignore = "requires a running Redis reachable via DURABLE_MQ_TEST_REDIS_URL"]
fn push_then_take_roundtrips_and_tracks_ephemeral() {
    let backend = backend();
    let msg = Message::new(1, "hi");
    assert!(backend.push(&msg).unwrap());
    assert_eq!(backend.count_queued(), 1);

    let taken = backend.pop().unwrap().unwrap();
    assert_eq!(taken.id(), 1);

    // `pop` only removes from the queued store; recording the entry as
    // in-flight is `stash`'s job, mirroring `Queue::take`'s two-step
    // pop-then-stash sequence.
    backend.stash(&taken, chrono::Utc::now()).unwrap();
    assert_eq!(backend.count_ephemeral(), 1);

    backend.unstash(1).unwrap();
    assert_eq!(backend.count_ephemeral(), 0);
}

#[test]
#[ignore = "requires a running Redis reachable via DURABLE_MQ_TEST_REDIS_URL"]
fn move_ephemeral_to_queued_requeues_orphan() {
    let backend = backend();
    let msg = Message::new(2, "orphan");
    backend.push(&msg).unwrap();
    let taken = backend.pop().unwrap().unwrap();
    backend.stash(&taken, chrono::Utc::now()).unwrap();
    assert!(backend.move_ephemeral_to_queued(2).unwrap());
    assert_eq!(backend.count_queued(), 1);
    assert_eq!(backend.count_ephemeral(), 0);
}

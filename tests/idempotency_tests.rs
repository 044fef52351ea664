//! Property 6 (idempotent `finish`) from spec.md §8.

use durable_mq::backends::memory::MemoryBackend;
use durable_mq::config::MemoryConfig;
use durable_mq::{Backend, Message, Queue};

fn memory_queue() -> Queue<MemoryBackend> {
    Queue::open(MemoryBackend::new(MemoryConfig::default()).unwrap())
}

#[test]
fn finish_twice_on_the_same_message_is_not_an_error() {
    let queue = memory_queue();
    queue.queue(&Message::new(1, "a")).unwrap();
    let taken = queue.take().unwrap().unwrap();

    queue.finish(&taken).unwrap();
    queue.finish(&taken).unwrap();
    assert_eq!(queue.ephemeral_size(), 0);
}

#[test]
fn finish_on_an_id_that_was_never_taken_is_a_noop() {
    let queue = memory_queue();
    let ghost = Message::new(999, "never taken");
    queue.finish(&ghost).unwrap();
}

#[test]
fn duplicate_stash_for_the_same_id_keeps_the_first_entry_and_warns() {
    let backend = MemoryBackend::new(MemoryConfig::default()).unwrap();
    let first = Message::new(1, "first");
    let second = Message::new(1, "second");

    backend.stash(&first, chrono::Utc::now()).unwrap();
    backend.stash(&second, chrono::Utc::now()).unwrap();

    assert_eq!(backend.count_ephemeral(), 1);
}

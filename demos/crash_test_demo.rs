//! Demonstrates orphan recovery (spec.md C6): a consumer takes a message
//! and then "crashes" without finishing it. A second pass — standing in
//! for a scheduled recovery sweep — moves the abandoned message back to
//! the queued store so another consumer can pick it up.

use durable_mq::backends::memory::MemoryBackend;
use durable_mq::config::MemoryConfig;
use durable_mq::{recover_orphans, Message, Queue};
use std::thread;
use std::time::Duration;

fn main() {
    env_logger::init();

    let queue = Queue::open(MemoryBackend::new(MemoryConfig::default()).unwrap());
    queue.queue(&Message::new(0, "critical-task")).unwrap();

    let taken = queue.take().unwrap().expect("message available");
    println!("consumer: took {:?}, then crashed before finishing", taken.payload());
    drop(taken); // the consumer never calls finish()

    println!("recovery: waiting past the orphan threshold...");
    thread::sleep(Duration::from_millis(50));

    let recovered = recover_orphans(&queue, chrono::Duration::milliseconds(10)).unwrap();
    println!("recovery: moved {recovered} orphaned message(s) back to queued");

    if let Some(retried) = queue.take().unwrap() {
        println!(
            "consumer 2: picked up {:?} (num_requeues={})",
            retried.payload(),
            retried.num_requeues()
        );
        queue.finish(&retried).unwrap();
    }
}

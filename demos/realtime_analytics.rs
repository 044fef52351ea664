//! Demonstrates bounded backpressure (spec.md C8): a fixed-capacity queued
//! store models a fast-producing analytics pipeline feeding a consumer that
//! can't always keep up, so producers must react to `queue()` returning
//! `Ok(false)` instead of blocking indefinitely.

use durable_mq::backends::memory::MemoryBackend;
use durable_mq::config::MemoryConfig;
use durable_mq::{Message, Queue};

fn main() {
    env_logger::init();

    let queue = Queue::open(
        MemoryBackend::new(MemoryConfig {
            boundary: 16,
            ..Default::default()
        })
        .unwrap(),
    );

    let mut accepted = 0;
    let mut rejected = 0;
    for i in 0..100u64 {
        let accepted_this_event = queue
            .queue(&Message::new(0, format!("event-{i}")))
            .unwrap();
        if accepted_this_event {
            accepted += 1;
        } else {
            rejected += 1;
        }
    }

    println!("producer: accepted {accepted}, rejected {rejected} (queue at capacity)");

    let mut drained = 0;
    while queue.take().unwrap().is_some() {
        drained += 1;
    }
    println!("consumer: drained {drained} events");
}

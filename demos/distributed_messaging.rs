//! Demonstrates a producer/consumer handoff through an in-memory queue: one
//! thread enqueues work, another takes and finishes it.

use durable_mq::backends::memory::MemoryBackend;
use durable_mq::config::MemoryConfig;
use durable_mq::{Message, Queue};
use std::sync::Arc;
use std::thread;

fn main() {
    env_logger::init();

    let backend = Arc::new(MemoryBackend::new(MemoryConfig::default()).unwrap());
    let producer_queue = Queue::open_borrowed(backend.clone());
    let consumer_queue = Queue::open_borrowed(backend);

    let producer = thread::spawn(move || {
        for i in 0..20u64 {
            let payload = format!("order-{i}");
            producer_queue
                .queue(&Message::new(0, payload))
                .expect("queue should accept the message");
        }
        println!("producer: enqueued 20 messages");
    });
    producer.join().unwrap();

    let mut processed = 0;
    while let Some(msg) = consumer_queue.take().unwrap() {
        println!(
            "consumer: processing {:?} (requeues={})",
            msg.payload(),
            msg.num_requeues()
        );
        consumer_queue.finish(&msg).unwrap();
        processed += 1;
    }

    println!("consumer: processed {processed} messages");
}

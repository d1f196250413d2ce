// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::MemoryQueue;
use crate::domain::models::message::{EncryptPayload, Envelope};
use crate::queue::service::QueueService;

fn envelope(filename: &str) -> Envelope<EncryptPayload> {
    Envelope::new(EncryptPayload {
        filename: filename.to_string(),
        username: "alice".to_string(),
        encryption_success: false,
    })
}

#[tokio::test]
async fn test_enqueue_then_dequeue_roundtrip() {
    let queue = MemoryQueue::new();
    let message = envelope("a.bin");

    let length = queue.enqueue("encrypt-in", &message).await.unwrap();
    assert_eq!(length, 1);

    let popped = queue
        .dequeue("encrypt-in", Duration::from_millis(100))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(popped.message_id, message.message_id);
    assert_eq!(popped.payload.filename, "a.bin");
}

#[tokio::test]
async fn test_dequeue_timeout_on_empty_queue() {
    let queue: MemoryQueue<EncryptPayload> = MemoryQueue::new();

    let started = Instant::now();
    let result = queue
        .dequeue("encrypt-in", Duration::from_millis(100))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(result.is_none());
    assert!(elapsed >= Duration::from_millis(90));
    assert!(elapsed < Duration::from_secs(1));
}

#[tokio::test]
async fn test_fifo_order_within_a_queue() {
    let queue = MemoryQueue::new();
    for index in 0..5 {
        queue
            .enqueue("encrypt-in", &envelope(&format!("{index}.bin")))
            .await
            .unwrap();
    }

    for index in 0..5 {
        let popped = queue
            .dequeue("encrypt-in", Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped.payload.filename, format!("{index}.bin"));
    }
}

#[tokio::test]
async fn test_remove_deletes_at_most_one_match() {
    let queue = MemoryQueue::new();
    let messages: Vec<_> = (0..10).map(|i| envelope(&format!("{i}.bin"))).collect();
    for message in &messages {
        queue.enqueue("encrypt-in", message).await.unwrap();
    }
    assert_eq!(queue.len("encrypt-in"), 10);

    let removed = queue.remove("encrypt-in", &messages[4]).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(queue.len("encrypt-in"), 9);

    // Removing the same envelope again matches nothing.
    let removed = queue.remove("encrypt-in", &messages[4]).await.unwrap();
    assert_eq!(removed, 0);
    assert_eq!(queue.len("encrypt-in"), 9);
}

#[tokio::test]
async fn test_zero_timeout_blocks_until_a_message_lands() {
    let queue = Arc::new(MemoryQueue::new());

    let consumer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.dequeue("encrypt-in", Duration::ZERO).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!consumer.is_finished());

    let message = envelope("late.bin");
    queue.enqueue("encrypt-in", &message).await.unwrap();

    let popped = consumer.await.unwrap().unwrap().unwrap();
    assert_eq!(popped.message_id, message.message_id);
}

#[tokio::test]
async fn test_queues_are_isolated_by_name() {
    let queue = MemoryQueue::new();
    queue.enqueue("encrypt-in", &envelope("a.bin")).await.unwrap();

    let other = queue
        .dequeue("encrypt-out", Duration::from_millis(50))
        .await
        .unwrap();
    assert!(other.is_none());
    assert_eq!(queue.len("encrypt-in"), 1);
}

#[tokio::test]
async fn test_competing_consumers_each_message_delivered_once() {
    let queue = Arc::new(MemoryQueue::new());
    for index in 0..20 {
        queue
            .enqueue("encrypt-in", &envelope(&format!("{index}.bin")))
            .await
            .unwrap();
    }

    let mut consumers = Vec::new();
    for _ in 0..4 {
        let queue = queue.clone();
        consumers.push(tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(message) = queue
                .dequeue("encrypt-in", Duration::from_millis(50))
                .await
                .unwrap()
            {
                seen.push(message.payload.filename);
            }
            seen
        }));
    }

    let mut all: Vec<String> = Vec::new();
    for consumer in consumers {
        all.extend(consumer.await.unwrap());
    }
    all.sort();

    let mut expected: Vec<String> = (0..20).map(|i| format!("{i}.bin")).collect();
    expected.sort();
    assert_eq!(all, expected);
}

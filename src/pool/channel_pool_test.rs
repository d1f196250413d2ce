// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::StreamExt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::{ChannelPool, WorkerOutcome};
use crate::pool::retry_policy::RetryPolicy;

#[derive(Error, Debug)]
#[error("task error: {0}")]
struct TestError(String);

fn fast_retry() -> RetryPolicy {
    RetryPolicy::fixed(3, Duration::from_millis(1))
}

#[tokio::test]
async fn test_all_items_complete() {
    let pool = ChannelPool::new(4, fast_retry());
    let items: Vec<u32> = (0..17).collect();

    let outcomes: Vec<_> = pool
        .run(items, Arc::new(()), |item, _| async move {
            Ok::<_, TestError>(item + 100)
        })
        .collect()
        .await;

    let mut values: Vec<u32> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            WorkerOutcome::Completed(value) => Some(*value),
            WorkerOutcome::Exhausted { .. } => None,
        })
        .collect();
    values.sort_unstable();

    let expected: Vec<u32> = (0..17).map(|i| i + 100).collect();
    assert_eq!(values, expected);
}

#[tokio::test]
async fn test_exhausted_retries_keep_the_error() {
    let pool = ChannelPool::new(2, fast_retry());
    let attempts = Arc::new(AtomicU32::new(0));

    let outcomes: Vec<_> = pool
        .run(vec!["bad"], attempts.clone(), |item, attempts| async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>(TestError(format!("{item} is unreachable")))
        })
        .collect()
        .await;

    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        WorkerOutcome::Exhausted { attempts: seen, error } => {
            assert_eq!(*seen, 3);
            assert!(error.to_string().contains("bad is unreachable"));
        }
        WorkerOutcome::Completed(_) => panic!("expected exhaustion"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_flaky_task_recovers_before_giving_up() {
    let pool = ChannelPool::new(1, fast_retry());
    let attempts = Arc::new(AtomicU32::new(0));

    let outcomes: Vec<_> = pool
        .run(vec![7u32], attempts.clone(), |item, attempts| async move {
            // Fail the first two attempts, succeed on the third.
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(TestError("transient".to_string()))
            } else {
                Ok(item)
            }
        })
        .collect()
        .await;

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_completed());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_mixed_outcomes_are_distinguishable() {
    let pool = ChannelPool::new(3, fast_retry());
    let items: Vec<u32> = (0..6).collect();

    let outcomes: Vec<_> = pool
        .run(items, Arc::new(()), |item, _| async move {
            if item % 3 == 0 {
                Err(TestError(format!("item {item}")))
            } else {
                Ok(item)
            }
        })
        .collect()
        .await;

    let completed = outcomes.iter().filter(|o| o.is_completed()).count();
    let exhausted = outcomes.len() - completed;
    assert_eq!(completed, 4);
    assert_eq!(exhausted, 2);
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::domain::models::message::Envelope;

use super::service::{QueueError, QueueService};

/// 内存消息队列实现
///
/// 满足与Redis实现相同的契约，用于测试和单进程部署
pub struct MemoryQueue<P> {
    queues: DashMap<String, VecDeque<String>>,
    notify: Notify,
    _payload: PhantomData<fn() -> P>,
}

impl<P> MemoryQueue<P> {
    /// 创建新的内存消息队列实例
    pub fn new() -> Self {
        Self {
            queues: DashMap::new(),
            notify: Notify::new(),
            _payload: PhantomData,
        }
    }

    /// 指定队列当前的长度
    pub fn len(&self, queue_name: &str) -> usize {
        self.queues
            .get(queue_name)
            .map(|queue| queue.len())
            .unwrap_or(0)
    }

    /// 指定队列是否为空
    pub fn is_empty(&self, queue_name: &str) -> bool {
        self.len(queue_name) == 0
    }

    fn pop_front(&self, queue_name: &str) -> Option<String> {
        self.queues
            .get_mut(queue_name)
            .and_then(|mut queue| queue.pop_front())
    }
}

impl<P> Default for MemoryQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P> QueueService<P> for MemoryQueue<P>
where
    P: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn enqueue(&self, queue_name: &str, message: &Envelope<P>) -> Result<usize, QueueError> {
        let body = message.to_json()?;
        let length = {
            let mut queue = self.queues.entry(queue_name.to_string()).or_default();
            queue.push_back(body);
            queue.len()
        };
        self.notify.notify_waiters();
        Ok(length)
    }

    async fn dequeue(
        &self,
        queue_name: &str,
        timeout: Duration,
    ) -> Result<Option<Envelope<P>>, QueueError> {
        // Zero timeout blocks indefinitely, mirroring BLPOP.
        let deadline = (timeout > Duration::ZERO).then(|| Instant::now() + timeout);

        loop {
            // Register for wakeups before checking, so an enqueue landing
            // between the check and the await is not missed.
            let notified = self.notify.notified();

            if let Some(body) = self.pop_front(queue_name) {
                return Ok(Some(Envelope::from_json(&body)?));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        let last = self.pop_front(queue_name);
                        return Ok(last.map(|body| Envelope::from_json(&body)).transpose()?);
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn remove(&self, queue_name: &str, message: &Envelope<P>) -> Result<usize, QueueError> {
        let body = message.to_json()?;
        let Some(mut queue) = self.queues.get_mut(queue_name) else {
            return Ok(0);
        };
        match queue.iter().position(|entry| *entry == body) {
            Some(index) => {
                queue.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
#[path = "memory_queue_test.rs"]
mod tests;

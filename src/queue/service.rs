// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::message::Envelope;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// Redis错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// 消息序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 消息队列特质
///
/// 按名称寻址的持久FIFO队列；队列名是生产者和消费者之间
/// 线下约定的普通字符串。同一队列上的多个消费者互相竞争，
/// 任一消息恰好被一个消费者取走；没有队列层的自动重投递。
#[async_trait]
pub trait QueueService<P>: Send + Sync
where
    P: Send + 'static,
{
    /// 序列化消息并追加到队尾，返回新的队列长度
    async fn enqueue(&self, queue_name: &str, message: &Envelope<P>) -> Result<usize, QueueError>;

    /// 从队头阻塞弹出一条消息
    ///
    /// 最多等待 `timeout`；零超时表示无限等待。队列为空且超时
    /// 到达时返回 `None`
    async fn dequeue(
        &self,
        queue_name: &str,
        timeout: Duration,
    ) -> Result<Option<Envelope<P>>, QueueError>;

    /// 删除至多一条序列化形式相同的消息，返回删除数量
    async fn remove(&self, queue_name: &str, message: &Envelope<P>) -> Result<usize, QueueError>;
}

#[async_trait]
impl<P, T> QueueService<P> for Arc<T>
where
    T: QueueService<P> + ?Sized,
    P: Send + Sync + 'static,
{
    async fn enqueue(&self, queue_name: &str, message: &Envelope<P>) -> Result<usize, QueueError> {
        (**self).enqueue(queue_name, message).await
    }

    async fn dequeue(
        &self,
        queue_name: &str,
        timeout: Duration,
    ) -> Result<Option<Envelope<P>>, QueueError> {
        (**self).dequeue(queue_name, timeout).await
    }

    async fn remove(&self, queue_name: &str, message: &Envelope<P>) -> Result<usize, QueueError> {
        (**self).remove(queue_name, message).await
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Duration;

use crate::domain::models::message::Envelope;

use super::service::{QueueError, QueueService};

/// Redis消息队列实现
///
/// 以Redis列表实现持久FIFO：RPUSH入队、BLPOP出队、LREM删除。
/// 竞争消费者之间不需要额外协调，BLPOP的原子弹出保证任一消息
/// 只被一个消费者取走。
pub struct RedisQueue<P> {
    /// Redis客户端
    client: redis::Client,
    _payload: PhantomData<fn() -> P>,
}

impl<P> RedisQueue<P> {
    /// 创建新的Redis消息队列实例
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    ///
    /// # 返回值
    ///
    /// * `Ok(RedisQueue)` - 队列实例
    /// * `Err(QueueError)` - 连接URL无效
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            _payload: PhantomData,
        })
    }
}

#[async_trait]
impl<P> QueueService<P> for RedisQueue<P>
where
    P: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn enqueue(&self, queue_name: &str, message: &Envelope<P>) -> Result<usize, QueueError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let body = message.to_json()?;
        let length: usize = con.rpush(queue_name, body).await?;
        Ok(length)
    }

    async fn dequeue(
        &self,
        queue_name: &str,
        timeout: Duration,
    ) -> Result<Option<Envelope<P>>, QueueError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        // BLPOP treats a zero timeout as "block indefinitely".
        let reply: Option<(String, String)> =
            con.blpop(queue_name, timeout.as_secs_f64()).await?;
        match reply {
            Some((_, body)) => Ok(Some(Envelope::from_json(&body)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, queue_name: &str, message: &Envelope<P>) -> Result<usize, QueueError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let body = message.to_json()?;
        let removed: usize = con.lrem(queue_name, 1, body).await?;
        Ok(removed)
    }
}

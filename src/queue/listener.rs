// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::domain::models::message::{Envelope, ErrorInfo};

use super::service::{QueueError, QueueService};

/// 消息处理失败
///
/// 处理器内部失败的结构化描述，会被记录到信封的错误字段上
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct HandlerError {
    /// 错误描述
    pub message: String,
    /// 处理器是否应当重试
    pub retry: bool,
    /// 是否应当向用户展示
    pub surface: bool,
    /// 原始错误类型名称
    pub exception_type: Option<String>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry: false,
            surface: false,
            exception_type: None,
        }
    }

    pub fn with_kind(message: impl Into<String>, exception_type: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry: false,
            surface: false,
            exception_type: Some(exception_type.into()),
        }
    }
}

impl From<&HandlerError> for ErrorInfo {
    fn from(error: &HandlerError) -> Self {
        ErrorInfo {
            message: error.message.clone(),
            retry: error.retry,
            surface: error.surface,
            exception_type: error.exception_type.clone(),
        }
    }
}

/// 消息的最终去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// 转发到输出队列（若配置了输出队列）
    Forward,
    /// 处理完毕，丢弃
    Drop,
}

/// 消息处理器特质
///
/// 每条消息的抽象处理钩子。实现应当把内部失败表达为
/// `HandlerError` 而不是panic；监听循环负责把错误记录到
/// 信封上并继续运行。
#[async_trait]
pub trait MessageHandler<P>: Send + Sync {
    async fn handle(&self, message: &mut Envelope<P>) -> Result<Disposition, HandlerError>;
}

/// 队列监听器
///
/// 轮询式消费循环：出队、处理、按需转发、固定间隔休眠。
/// 单条消息的处理失败永远不会终止循环；循环只随进程结束。
pub struct Listener<P, Q, H> {
    queue: Arc<Q>,
    queue_name: String,
    out_queue_name: Option<String>,
    poll_interval: Duration,
    dequeue_timeout: Duration,
    handler: H,
    _payload: PhantomData<fn() -> P>,
}

impl<P, Q, H> Listener<P, Q, H>
where
    P: Send + Sync + 'static,
    Q: QueueService<P>,
    H: MessageHandler<P>,
{
    /// 创建新的队列监听器实例
    ///
    /// # 参数
    ///
    /// * `queue` - 队列服务
    /// * `queue_name` - 输入队列名称
    /// * `out_queue_name` - 输出队列名称（可选）
    /// * `poll_interval` - 每次迭代之间的休眠时间
    /// * `dequeue_timeout` - 阻塞出队超时（零为无限等待）
    /// * `handler` - 消息处理器
    pub fn new(
        queue: Arc<Q>,
        queue_name: impl Into<String>,
        out_queue_name: Option<String>,
        poll_interval: Duration,
        dequeue_timeout: Duration,
        handler: H,
    ) -> Self {
        Self {
            queue,
            queue_name: queue_name.into(),
            out_queue_name,
            poll_interval,
            dequeue_timeout,
            handler,
            _payload: PhantomData,
        }
    }

    /// 处理至多一条消息
    ///
    /// 返回是否取到了消息。处理器失败被捕获并记录到信封上；
    /// 若配置了输出队列，带错误的信封照常转发。
    pub async fn poll_once(&self) -> Result<bool, QueueError> {
        let Some(mut message) = self
            .queue
            .dequeue(&self.queue_name, self.dequeue_timeout)
            .await?
        else {
            return Ok(false);
        };

        let message_id = message.message_id;
        message.start = Some(epoch_seconds());

        let disposition = match self.handler.handle(&mut message).await {
            Ok(disposition) => disposition,
            Err(handler_error) => {
                warn!("handler failed for message {message_id}: {handler_error}");
                counter!("listener_messages_failed_total").increment(1);
                message.error = Some(ErrorInfo::from(&handler_error));
                Disposition::Forward
            }
        };

        message.stop = Some(epoch_seconds());
        counter!("listener_messages_processed_total").increment(1);

        if disposition == Disposition::Forward {
            if let Some(out_queue) = &self.out_queue_name {
                self.queue.enqueue(out_queue, &message).await?;
            }
        }

        Ok(true)
    }

    /// 运行监听循环
    ///
    /// 无论本次迭代是否取到消息，每次迭代后都休眠固定间隔。
    /// 队列层错误被记录后继续下一次迭代。
    pub async fn listen(&self) {
        info!("listener started on queue {}", self.queue_name);
        loop {
            if let Err(queue_error) = self.poll_once().await {
                error!("listener iteration failed: {queue_error}");
            }
            sleep(self.poll_interval).await;
        }
    }
}

/// 当前时刻的epoch秒
fn epoch_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
#[path = "listener_test.rs"]
mod tests;

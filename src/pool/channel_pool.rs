// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::{stream, Future, Stream};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use super::retry_policy::RetryPolicy;

/// 持久工作器的单条处理结果
///
/// 重试耗尽不会被折叠成空结果：`Exhausted` 保留原始错误，
/// 下游可以区分"确实为空"和"重试耗尽"
#[derive(Debug)]
pub enum WorkerOutcome<T, E> {
    /// 任务成功完成
    Completed(T),
    /// 所有尝试均失败
    Exhausted { attempts: u32, error: E },
}

impl<T, E> WorkerOutcome<T, E> {
    pub fn is_completed(&self) -> bool {
        matches!(self, WorkerOutcome::Completed(_))
    }
}

/// 生产者/消费者工作池
///
/// 有界输入通道供给 `num_workers` 个持久工作器；
/// 通道关闭即为输入结束信号。每个工作器对失败的调用
/// 按固定延迟重试，超过次数后产出带错误的耗尽结果。
pub struct ChannelPool {
    num_workers: usize,
    retry: RetryPolicy,
}

impl ChannelPool {
    /// 创建新的生产者/消费者工作池
    pub fn new(num_workers: usize, retry: RetryPolicy) -> Self {
        Self {
            num_workers: num_workers.max(1),
            retry,
        }
    }

    /// 将条目送入工作器并返回输出流
    ///
    /// 输出按完成顺序产出；当所有工作器退出后流结束。
    /// 工作器任务被派生到运行时上，丢弃输出流不会中止它们。
    pub fn run<I, S, T, E, F, Fut>(
        &self,
        items: Vec<I>,
        shared: Arc<S>,
        task: F,
    ) -> impl Stream<Item = WorkerOutcome<T, E>>
    where
        I: Clone + Send + 'static,
        S: Send + Sync + 'static,
        T: Send + 'static,
        E: std::error::Error + Send + 'static,
        F: Fn(I, Arc<S>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (in_tx, in_rx) = mpsc::channel::<I>(self.num_workers * 2);
        let in_rx = Arc::new(Mutex::new(in_rx));
        let (out_tx, out_rx) = mpsc::channel::<WorkerOutcome<T, E>>(self.num_workers * 2);

        tokio::spawn(async move {
            for item in items {
                if in_tx.send(item).await.is_err() {
                    break;
                }
            }
            // Dropping the sender closes the channel; that closure is the
            // end-of-input signal every worker waits on.
        });

        for worker_id in 0..self.num_workers {
            let in_rx = in_rx.clone();
            let out_tx = out_tx.clone();
            let shared = shared.clone();
            let task = task.clone();
            let retry = self.retry.clone();
            tokio::spawn(async move {
                loop {
                    let item = { in_rx.lock().await.recv().await };
                    let Some(item) = item else { break };
                    let outcome = run_with_retry(&retry, item, shared.clone(), &task).await;
                    if out_tx.send(outcome).await.is_err() {
                        break;
                    }
                }
                debug!("worker {worker_id} finished");
            });
        }

        // The stream ends once every worker has hung up its sender clone.
        stream::unfold(out_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
    }
}

async fn run_with_retry<I, S, T, E, F, Fut>(
    retry: &RetryPolicy,
    item: I,
    shared: Arc<S>,
    task: &F,
) -> WorkerOutcome<T, E>
where
    I: Clone,
    E: std::error::Error,
    F: Fn(I, Arc<S>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match task(item.clone(), shared.clone()).await {
            Ok(value) => return WorkerOutcome::Completed(value),
            Err(error) => {
                if attempt >= retry.max_attempts {
                    warn!("giving up after {attempt} attempts: {error}");
                    return WorkerOutcome::Exhausted { attempts: attempt, error };
                }
                debug!("attempt {attempt} failed: {error}, retrying");
                tokio::time::sleep(retry.delay).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "channel_pool_test.rs"]
mod tests;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::stream::{self, FuturesUnordered};
use futures::{Future, Stream, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

/// 每轮提交的任务数上限，限制已排程但未开始的工作量
const CHUNK_SIZE: usize = 10;

/// 单个任务的失败
///
/// `index` 是该任务在输入中的位置，用于乱序完成后定位失败项
#[derive(Error, Debug)]
#[error("task {index} failed: {source}")]
pub struct TaskFailure<E>
where
    E: std::error::Error + 'static,
{
    pub index: usize,
    #[source]
    pub source: E,
}

/// 有界并发工作池
///
/// 以信号量限制同时在途的任务数；并发是单线程协作式交错，
/// 上限约束的是在途操作数而不是CPU核数
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    num_workers: usize,
}

impl WorkerPool {
    /// 创建新的工作池实例
    ///
    /// # 参数
    ///
    /// * `num_workers` - 同时在途任务上限
    pub fn new(num_workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(num_workers)),
            num_workers,
        }
    }

    /// 同时在途任务上限
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// 对每个条目运行一次任务函数，最多 `num_workers` 个同时在途
    ///
    /// 返回惰性结果流：单遍、不可重启，按完成顺序产出而不是提交顺序。
    /// 条目按固定大小分块提交；一个块完全排空后才开始下一个块，
    /// 块内的慢任务不会阻塞同块的快任务。
    ///
    /// 单个任务的失败以 `Err(TaskFailure)` 元素出现在流中，
    /// 不会中止整个批次。
    ///
    /// 没有取消机制：调用方应消费到流结束。提前丢弃流会停止
    /// 排程新的块，但已在途的调用会继续完成。
    pub fn work<I, S, T, E, F, Fut>(
        &self,
        items: Vec<I>,
        shared: Arc<S>,
        task: F,
    ) -> impl Stream<Item = Result<T, TaskFailure<E>>>
    where
        I: Send + 'static,
        S: Send + Sync + 'static,
        T: Send + 'static,
        E: std::error::Error + Send + 'static,
        F: Fn(I, Arc<S>) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let permits = self.permits.clone();

        stream::iter(partition(items, CHUNK_SIZE)).flat_map(move |chunk| {
            let set = FuturesUnordered::new();
            for (index, item) in chunk {
                let permits = permits.clone();
                let shared = shared.clone();
                let task = task.clone();
                set.push(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .expect("worker pool semaphore closed");
                    task(item, shared)
                        .await
                        .map_err(|source| TaskFailure { index, source })
                });
            }
            set
        })
    }
}

/// 把条目切分为带原始下标的固定大小块
fn partition<I>(items: Vec<I>, size: usize) -> Vec<Vec<(usize, I)>> {
    let mut chunks = Vec::new();
    let mut current = Vec::with_capacity(size);
    for pair in items.into_iter().enumerate() {
        current.push(pair);
        if current.len() == size {
            chunks.push(current);
            current = Vec::with_capacity(size);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
#[path = "worker_pool_test.rs"]
mod tests;

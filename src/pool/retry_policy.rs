// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

/// 重试策略配置
///
/// 固定延迟重试，用于持久工作器在放弃之前的本地重试
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大尝试次数（含首次调用）
    pub max_attempts: u32,
    /// 尝试之间的固定延迟
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// 创建固定延迟重试策略
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use thiserror::Error;

/// 流式字节块
///
/// 下载层以块流的形式把响应体交给存储层
pub type ByteChunks = BoxStream<'static, std::io::Result<Bytes>>;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 存储错误
    #[error("Store error: {0}")]
    Other(String),
}

/// 文件元信息
#[derive(Debug, Clone, PartialEq)]
pub struct FileStat {
    /// 最后修改时间
    pub last_modified: Option<DateTime<Utc>>,
    /// 内容校验和（本地存储为sha256，对象存储为服务端ETag）
    pub checksum: String,
}

/// 存储服务特质
///
/// 按路径寻址的字节持久化抽象；文件系统、对象存储和内存实现
/// 都满足同一契约，由配置选择
#[async_trait]
pub trait StoreService: Send + Sync {
    /// 将字节流持久化到指定路径，返回存储路径
    async fn persist(&self, path: &str, stream: ByteChunks) -> Result<String, StoreError>;

    /// 将字节切片持久化到指定路径，返回存储路径
    async fn persist_bytes(&self, path: &str, data: &[u8]) -> Result<String, StoreError>;

    /// 检查指定路径是否已有文件
    async fn exists(&self, path: &str) -> Result<bool, StoreError>;

    /// 删除指定路径的文件，文件不存在时返回false
    async fn remove(&self, path: &str) -> Result<bool, StoreError>;

    /// 返回文件元信息，文件不存在时返回None
    async fn stat(&self, path: &str) -> Result<Option<FileStat>, StoreError>;
}

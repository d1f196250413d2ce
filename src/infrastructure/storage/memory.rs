// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::repositories::store_repository::{
    ByteChunks, FileStat, StoreError, StoreService,
};

struct StoredEntry {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// 内存存储实现（用于测试和单进程部署）
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// 当前持有的所有路径
    pub async fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        entries.keys().cloned().collect()
    }

    /// 读取指定路径的内容副本
    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().await;
        entries.get(path).map(|entry| entry.data.clone())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreService for InMemoryStore {
    async fn persist(&self, path: &str, mut stream: ByteChunks) -> Result<String, StoreError> {
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }
        self.persist_bytes(path, &data).await
    }

    async fn persist_bytes(&self, path: &str, data: &[u8]) -> Result<String, StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            path.to_string(),
            StoredEntry {
                data: data.to_vec(),
                last_modified: Utc::now(),
            },
        );
        Ok(path.to_string())
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.contains_key(path))
    }

    async fn remove(&self, path: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(path).is_some())
    }

    async fn stat(&self, path: &str) -> Result<Option<FileStat>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(path).map(|entry| FileStat {
            last_modified: Some(entry.last_modified),
            checksum: hex::encode(Sha256::digest(&entry.data)),
        }))
    }
}

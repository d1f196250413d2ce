// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::domain::repositories::store_repository::{
    ByteChunks, FileStat, StoreError, StoreService,
};

const CHECKSUM_CHUNK_SIZE: usize = 8192;

/// 本地文件系统存储实现
pub struct LocalStore {
    base_path: String,
}

impl LocalStore {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn full_path(&self, key: &str) -> PathBuf {
        Path::new(&self.base_path).join(key)
    }

    async fn ensure_parent(full_path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// 分块计算文件内容的sha256校验和
    async fn checksum(full_path: &Path) -> Result<String, StoreError> {
        let mut file = fs::File::open(full_path).await?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; CHECKSUM_CHUNK_SIZE];
        loop {
            let read = file.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

#[async_trait]
impl StoreService for LocalStore {
    async fn persist(&self, path: &str, mut stream: ByteChunks) -> Result<String, StoreError> {
        let full_path = self.full_path(path);
        Self::ensure_parent(&full_path).await?;

        let mut file = fs::File::create(&full_path).await?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(path.to_string())
    }

    async fn persist_bytes(&self, path: &str, data: &[u8]) -> Result<String, StoreError> {
        let full_path = self.full_path(path);
        Self::ensure_parent(&full_path).await?;

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(path.to_string())
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.full_path(path).exists())
    }

    async fn remove(&self, path: &str) -> Result<bool, StoreError> {
        match fs::remove_file(self.full_path(path)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn stat(&self, path: &str) -> Result<Option<FileStat>, StoreError> {
        let full_path = self.full_path(path);
        let metadata = match fs::metadata(&full_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        let checksum = Self::checksum(&full_path).await?;

        Ok(Some(FileStat {
            last_modified,
            checksum,
        }))
    }
}

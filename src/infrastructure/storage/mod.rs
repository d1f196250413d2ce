// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;

use crate::config::settings::StorageSettings;
use crate::domain::repositories::store_repository::{StoreError, StoreService};

pub mod local;
pub mod memory;
pub mod s3;

pub use local::LocalStore;
pub use memory::InMemoryStore;
pub use s3::S3Store;

/// 存储工厂函数
///
/// 根据配置选择存储实现
pub fn create_store(settings: &StorageSettings) -> Result<Arc<dyn StoreService>, StoreError> {
    match settings.storage_type.as_str() {
        "local" => {
            let base_path = settings
                .local_path
                .as_ref()
                .cloned()
                .unwrap_or_else(|| "./storage".to_string());
            Ok(Arc::new(LocalStore::new(base_path)))
        }

        "s3" => {
            let bucket = settings
                .s3_bucket
                .as_ref()
                .cloned()
                .ok_or_else(|| StoreError::Other("s3_bucket is required".to_string()))?;
            let region = settings
                .s3_region
                .as_ref()
                .cloned()
                .unwrap_or_else(|| "us-east-1".to_string());
            let access_key = settings
                .s3_access_key
                .as_ref()
                .cloned()
                .ok_or_else(|| StoreError::Other("s3_access_key is required".to_string()))?;
            let secret_key = settings
                .s3_secret_key
                .as_ref()
                .cloned()
                .ok_or_else(|| StoreError::Other("s3_secret_key is required".to_string()))?;
            Ok(Arc::new(S3Store::new(
                region,
                bucket,
                access_key,
                secret_key,
                settings.s3_endpoint.clone(),
            )))
        }

        "memory" => Ok(Arc::new(InMemoryStore::new())),

        other => Err(StoreError::Other(format!(
            "Unsupported storage type: {}",
            other
        ))),
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;

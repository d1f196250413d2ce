// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use chrono::DateTime;
use futures::StreamExt;

use crate::domain::repositories::store_repository::{
    ByteChunks, FileStat, StoreError, StoreService,
};

/// S3 对象存储实现
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub fn new(
        region: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        endpoint: Option<String>,
    ) -> Self {
        let credentials =
            aws_sdk_s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let mut config_builder = aws_sdk_s3::config::Builder::new()
            .region(aws_sdk_s3::config::Region::new(region))
            .credentials_provider(credentials);

        if let Some(ep) = endpoint {
            config_builder = config_builder.endpoint_url(ep).force_path_style(true);
        }

        let config = config_builder.build();
        let client = aws_sdk_s3::Client::from_conf(config);

        Self { client, bucket }
    }
}

#[async_trait]
impl StoreService for S3Store {
    async fn persist(&self, path: &str, mut stream: ByteChunks) -> Result<String, StoreError> {
        // put_object wants the full body up front, so the chunks are buffered
        // before upload.
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }
        self.persist_bytes(path, &data).await
    }

    async fn persist_bytes(&self, path: &str, data: &[u8]) -> Result<String, StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;
        Ok(path.to_string())
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(StoreError::Other(service_error.to_string()))
                }
            }
        }
    }

    async fn remove(&self, path: &str) -> Result<bool, StoreError> {
        // DeleteObject is a silent no-op on absent keys, so probe first to
        // honor the "false when absent" contract.
        let existed = self.exists(path).await?;
        if !existed {
            return Ok(false);
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;
        Ok(true)
    }

    async fn stat(&self, path: &str) -> Result<Option<FileStat>, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(output) => {
                let last_modified = output
                    .last_modified()
                    .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()));
                let checksum = output
                    .e_tag()
                    .map(|tag| tag.trim_matches('"').to_string())
                    .unwrap_or_default();
                Ok(Some(FileStat {
                    last_modified,
                    checksum,
                }))
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(None)
                } else {
                    Err(StoreError::Other(service_error.to_string()))
                }
            }
        }
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;

/// 应用程序配置设置
///
/// 包含数据库、Redis、存储、HTTP、工作池和监听器等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// Redis配置
    pub redis: RedisSettings,
    /// 存储配置
    pub storage: StorageSettings,
    /// HTTP客户端配置
    pub http: HttpSettings,
    /// 工作池配置
    pub pool: PoolSettings,
    /// 监听器配置
    pub listener: ListenerSettings,
}

/// 数据库配置设置
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// Redis配置设置
#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    /// Redis连接URL
    pub url: String,
}

/// 存储配置设置
#[derive(Debug, Deserialize)]
pub struct StorageSettings {
    /// 存储类型 (local, s3, memory)
    pub storage_type: String,
    /// 本地存储路径 (当 type=local 时使用)
    pub local_path: Option<String>,
    /// S3 区域
    pub s3_region: Option<String>,
    /// S3 存储桶名称
    pub s3_bucket: Option<String>,
    /// S3 访问密钥
    pub s3_access_key: Option<String>,
    /// S3 密钥
    pub s3_secret_key: Option<String>,
    /// S3 端点 (可选，用于 MinIO 等兼容服务)
    pub s3_endpoint: Option<String>,
}

/// HTTP客户端配置设置
#[derive(Debug, Deserialize)]
pub struct HttpSettings {
    /// 每个主机的最大空闲连接数
    pub max_connections: usize,
    /// 统一请求超时时间（秒）
    pub timeout_secs: u64,
    /// User-Agent请求头
    pub user_agent: String,
    /// 附加到每个请求的默认请求头
    #[serde(default)]
    pub default_headers: HashMap<String, String>,
}

/// 工作池配置设置
#[derive(Debug, Deserialize)]
pub struct PoolSettings {
    /// 同时在途任务上限
    pub num_workers: usize,
    /// 重试之间的固定延迟（毫秒）
    pub retry_delay_ms: u64,
}

/// 监听器配置设置
#[derive(Debug, Deserialize)]
pub struct ListenerSettings {
    /// 输入队列名称
    pub in_queue: String,
    /// 输出队列名称（可选）
    pub out_queue: Option<String>,
    /// 每次迭代之间的休眠时间（秒）
    pub poll_interval_secs: u64,
    /// 阻塞出队超时时间（秒，0为无限等待）
    pub dequeue_timeout_secs: u64,
    /// 下载文件的目标目录
    pub download_path: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Default DB pool settings
            .set_default("database.url", "sqlite://fetchrs.db?mode=rwc")?
            .set_default("database.max_connections", 100)?
            .set_default("database.min_connections", 10)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default Redis settings
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            // Default Storage settings
            .set_default("storage.storage_type", "local")?
            .set_default("storage.local_path", "./storage")?
            // Default HTTP client settings
            .set_default("http.max_connections", 100)?
            .set_default("http.timeout_secs", 100)?
            .set_default("http.user_agent", "fetchrs/0.1.0")?
            // Default pool settings
            .set_default("pool.num_workers", 10)?
            .set_default("pool.retry_delay_ms", 1000)?
            // Default listener settings
            .set_default("listener.in_queue", "fetch-in")?
            .set_default("listener.out_queue", "fetch-out")?
            .set_default("listener.poll_interval_secs", 1)?
            .set_default("listener.dequeue_timeout_secs", 10)?
            .set_default("listener.download_path", "./downloads")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("FETCHRS").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 消息处理错误描述
///
/// 处理器失败时记录到信封上的结构化错误对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// 错误描述
    pub message: String,
    /// 处理器是否应当重试该消息
    #[serde(default)]
    pub retry: bool,
    /// 是否应当向用户展示该错误
    #[serde(default)]
    pub surface: bool,
    /// 原始错误类型名称
    #[serde(default)]
    pub exception_type: Option<String>,
}

/// 消息信封
///
/// 队列消息的包装记录，携带簿记字段（id、时间戳、重试计数、错误）。
/// 线格式为扁平JSON对象；反序列化时容忍未识别的额外字段。
/// `retry_count` 由处理器自行管理，队列层没有自动重投递。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<P> {
    /// 构造时分配的全局唯一消息ID
    pub message_id: Uuid,
    /// 处理开始时间（epoch秒）
    #[serde(default)]
    pub start: Option<f64>,
    /// 处理结束时间（epoch秒）
    #[serde(default)]
    pub stop: Option<f64>,
    /// 处理错误
    #[serde(default)]
    pub error: Option<ErrorInfo>,
    /// 同一处理器内的重试次数
    #[serde(default)]
    pub retry_count: u32,
    /// 消息负载，平铺进同一个JSON对象
    #[serde(flatten)]
    pub payload: P,
}

impl<P> Envelope<P> {
    /// 创建新的消息信封
    pub fn new(payload: P) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            start: None,
            stop: None,
            error: None,
            retry_count: 0,
            payload,
        }
    }
}

impl<P> Envelope<P>
where
    P: Serialize + DeserializeOwned,
{
    /// 序列化为线格式JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// 从线格式JSON反序列化
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }
}

/// 默认消息负载（无业务字段）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultPayload {}

/// 加密任务负载
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncryptPayload {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub encryption_success: bool,
}

/// 下载任务负载
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadPayload {
    /// 资源URL，同时作为对账的业务唯一键
    pub url: String,
    /// 目标文件名
    #[serde(default)]
    pub filename: Option<String>,
    /// 处理完成后写回的存储路径
    #[serde(default)]
    pub vid_path: Option<String>,
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

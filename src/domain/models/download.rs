// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 下载请求
///
/// 描述单个下载目标；`idx`、`total` 和 `filename` 是调用方的关联字段，
/// 会原样回传到结果中，用于在乱序完成后重新对应结果与请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// 资源URL
    pub url: String,
    /// 目标目录（缺省为存储根目录）
    #[serde(default)]
    pub dir: Option<String>,
    /// 目标文件名（缺省时生成随机令牌）
    #[serde(default)]
    pub filename: Option<String>,
    /// 调用方序号
    #[serde(default)]
    pub idx: Option<u32>,
    /// 批次总数
    #[serde(default)]
    pub total: Option<u32>,
}

impl DownloadRequest {
    /// 构造回传关联字段的下载结果
    pub(crate) fn result(&self, path: String, kind: ContentKind) -> FetchResult {
        FetchResult {
            path,
            kind,
            filename: self.filename.clone(),
            idx: self.idx,
            total: self.total,
        }
    }
}

/// 下载内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Image,
    Video,
}

/// 下载结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    /// 存储中的目标路径
    pub path: String,
    /// 内容类型
    pub kind: ContentKind,
    /// 回传的文件名
    #[serde(default)]
    pub filename: Option<String>,
    /// 回传的序号
    #[serde(default)]
    pub idx: Option<u32>,
    /// 回传的批次总数
    #[serde(default)]
    pub total: Option<u32>,
}

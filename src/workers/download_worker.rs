// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::domain::models::download::DownloadRequest;
use crate::domain::models::message::{DownloadPayload, Envelope};
use crate::fetch::client::FetchClient;
use crate::infrastructure::database::entities::media_item::{self, MediaCandidate};
use crate::queue::listener::{Disposition, HandlerError, MessageHandler};
use crate::reconcile::service::ReconcileService;

/// 下载工作器
///
/// 消费下载消息：通过抓取客户端拉取视频（已存在则跳过），
/// 把产物按URL业务键对账进数据库，并把存储路径写回信封。
pub struct DownloadWorker {
    /// 抓取客户端
    fetch: FetchClient,
    /// 对账服务
    reconcile: Arc<ReconcileService>,
    /// 下载目标目录
    download_path: String,
}

impl DownloadWorker {
    /// 创建新的下载工作器实例
    pub fn new(fetch: FetchClient, reconcile: Arc<ReconcileService>, download_path: String) -> Self {
        Self {
            fetch,
            reconcile,
            download_path,
        }
    }
}

#[async_trait]
impl MessageHandler<DownloadPayload> for DownloadWorker {
    async fn handle(
        &self,
        message: &mut Envelope<DownloadPayload>,
    ) -> Result<Disposition, HandlerError> {
        let request = DownloadRequest {
            url: message.payload.url.clone(),
            dir: Some(self.download_path.clone()),
            filename: message.payload.filename.clone(),
            idx: None,
            total: None,
        };

        let fetched = self
            .fetch
            .download_vid(&request)
            .await
            .map_err(|e| HandlerError::with_kind(e.to_string(), "FetchError"))?;
        info!("stored {} for message {}", fetched.path, message.message_id);

        let candidate = MediaCandidate {
            url: message.payload.url.clone(),
            title: message.payload.filename.clone().unwrap_or_default(),
            pic_path: None,
            vid_path: Some(fetched.path.clone()),
        };
        self.reconcile
            .bulk_upsert::<_, media_item::ActiveModel>(
                vec![candidate],
                &[media_item::Column::VidPath],
            )
            .await
            .map_err(|e| HandlerError::with_kind(e.to_string(), "ReconcileError"))?;

        message.payload.vid_path = Some(fetched.path);
        Ok(Disposition::Forward)
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::{Stream, StreamExt, TryStreamExt};
use metrics::{counter, histogram};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Response, StatusCode};
use scraper::Html;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::settings::HttpSettings;
use crate::domain::models::download::{ContentKind, DownloadRequest, FetchResult};
use crate::domain::repositories::store_repository::{StoreError, StoreService};
use crate::pool::worker_pool::{TaskFailure, WorkerPool};

/// 重定向跟随的最大跳数
const MAX_REDIRECTS: usize = 10;

/// 抓取错误类型
#[derive(Error, Debug)]
pub enum FetchError {
    /// 非成功状态码，立即失败，状态码随错误携带
    #[error("response status code: {status}")]
    NonSuccessStatus { status: StatusCode },

    /// 内容类型不匹配，不可重试
    #[error("expected {expected} content, got {actual}")]
    ContentTypeMismatch {
        expected: &'static str,
        actual: String,
    },

    /// 存储层错误
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// 网络错误
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 无效的重定向目标
    #[error("invalid redirect target: {0}")]
    InvalidRedirect(#[from] url::ParseError),

    /// 无效的请求头配置
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

/// 抓取客户端
///
/// 持有一个共享连接池和默认请求头，处理所有出站HTTP请求，
/// 并通过存储服务落盘下载产物。超时统一由构造时的配置决定；
/// 本层不做重试，重试是调用方的责任。
#[derive(Clone)]
pub struct FetchClient {
    client: Client,
    headers: HeaderMap,
    store: Arc<dyn StoreService>,
}

impl FetchClient {
    /// 创建新的抓取客户端实例
    ///
    /// # 参数
    ///
    /// * `settings` - HTTP客户端配置
    /// * `store` - 下载产物的存储后端
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchClient)` - 客户端实例
    /// * `Err(FetchError)` - 配置的默认请求头无效
    pub fn new(settings: &HttpSettings, store: Arc<dyn StoreService>) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for (key, value) in &settings.default_headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| FetchError::InvalidHeader(e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::InvalidHeader(e.to_string()))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .pool_max_idle_per_host(settings.max_connections)
            .timeout(Duration::from_secs(settings.timeout_secs))
            // Redirects are followed manually so each call can opt in.
            .redirect(Policy::none())
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            headers,
            store,
        })
    }

    /// 发送请求并校验状态码
    ///
    /// 非200响应立即失败并携带状态码
    async fn request(
        &self,
        method: Method,
        url: &str,
        follow_redirects: bool,
        form: Option<&HashMap<String, String>>,
        extra_headers: Option<&HeaderMap>,
    ) -> Result<Response, FetchError> {
        info!("going to send a {method} request to {url}");
        counter!("fetch_requests_total", "method" => method.to_string()).increment(1);

        let mut builder = self
            .client
            .request(method.clone(), url)
            .headers(self.headers.clone());
        if let Some(extra) = extra_headers {
            for (name, value) in extra {
                builder = builder.header(name, value.clone());
            }
        }
        if let Some(form) = form {
            builder = builder.form(form);
        }

        let mut response = builder.send().await?;

        if follow_redirects {
            let mut hops = 0;
            while response.status().is_redirection() && hops < MAX_REDIRECTS {
                let Some(location) = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                else {
                    break;
                };
                let next = response.url().join(location)?;
                debug!("following redirect to {next}");
                let mut builder = self
                    .client
                    .request(method.clone(), next)
                    .headers(self.headers.clone());
                if let Some(extra) = extra_headers {
                    for (name, value) in extra {
                        builder = builder.header(name, value.clone());
                    }
                }
                response = builder.send().await?;
                hops += 1;
            }
        }

        if response.status() != StatusCode::OK {
            return Err(FetchError::NonSuccessStatus {
                status: response.status(),
            });
        }
        Ok(response)
    }

    /// GET请求并解析JSON响应
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        follow_redirects: bool,
    ) -> Result<T, FetchError> {
        let response = self
            .request(Method::GET, url, follow_redirects, None, None)
            .await?;
        Ok(response.json().await?)
    }

    /// POST表单请求并解析JSON响应
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &HashMap<String, String>,
        follow_redirects: bool,
    ) -> Result<T, FetchError> {
        let response = self
            .request(Method::POST, url, follow_redirects, Some(form), None)
            .await?;
        Ok(response.json().await?)
    }

    /// GET请求并返回响应文本
    pub async fn get_text(&self, url: &str, follow_redirects: bool) -> Result<String, FetchError> {
        let response = self
            .request(Method::GET, url, follow_redirects, None, None)
            .await?;
        Ok(response.text().await?)
    }

    /// GET请求并返回响应字节
    pub async fn get_bytes(
        &self,
        url: &str,
        follow_redirects: bool,
    ) -> Result<bytes::Bytes, FetchError> {
        let response = self
            .request(Method::GET, url, follow_redirects, None, None)
            .await?;
        Ok(response.bytes().await?)
    }

    /// GET请求并返回解析后的HTML文档
    pub async fn get_html(&self, url: &str, follow_redirects: bool) -> Result<Html, FetchError> {
        let text = self.get_text(url, follow_redirects).await?;
        Ok(Html::parse_document(&text))
    }

    /// 流式下载一张图片并持久化
    ///
    /// 响应内容类型必须以 `image` 开头，否则立即失败且不写存储
    pub async fn download_img(&self, request: &DownloadRequest) -> Result<FetchResult, FetchError> {
        self.download_img_with_headers(request, &HeaderMap::new())
            .await
    }

    pub(crate) async fn download_img_with_headers(
        &self,
        request: &DownloadRequest,
        extra_headers: &HeaderMap,
    ) -> Result<FetchResult, FetchError> {
        let start = Instant::now();
        let response = self
            .request(Method::GET, &request.url, false, None, Some(extra_headers))
            .await?;

        let content_type = content_type_of(&response);
        if !content_type.starts_with("image") {
            return Err(FetchError::ContentTypeMismatch {
                expected: "image",
                actual: content_type,
            });
        }

        let path = destination_path(
            &content_type,
            request.dir.as_deref(),
            request.filename.as_deref(),
        );
        let stream = response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed();
        let stored = self.store.persist(&path, stream).await?;

        histogram!("fetch_download_duration_seconds").record(start.elapsed().as_secs_f64());
        Ok(request.result(stored, ContentKind::Image))
    }

    /// 下载一个视频并持久化，保证同一目标路径只下载一次
    ///
    /// 先用HEAD探测校验内容类型并解析目标路径；若存储中已有
    /// 该路径的文件则直接返回，不发起完整的GET——即使跨进程、
    /// 跨多次调用也只下载一次
    pub async fn download_vid(&self, request: &DownloadRequest) -> Result<FetchResult, FetchError> {
        let head = self
            .request(Method::HEAD, &request.url, false, None, None)
            .await?;

        let content_type = content_type_of(&head);
        if !content_type.starts_with("video") {
            return Err(FetchError::ContentTypeMismatch {
                expected: "video",
                actual: content_type,
            });
        }

        let path = destination_path(
            &content_type,
            request.dir.as_deref(),
            request.filename.as_deref(),
        );
        if self.store.exists(&path).await? {
            debug!("{path} already stored, skipping download");
            counter!("fetch_downloads_skipped_total").increment(1);
            return Ok(request.result(path, ContentKind::Video));
        }

        let start = Instant::now();
        let response = self
            .request(Method::GET, &request.url, false, None, None)
            .await?;
        let stream = response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed();
        let stored = self.store.persist(&path, stream).await?;

        histogram!("fetch_download_duration_seconds").record(start.elapsed().as_secs_f64());
        Ok(request.result(stored, ContentKind::Video))
    }

    /// 通过工作池并发下载多张图片
    ///
    /// `extra_headers`（例如Referer）会附加到每个子请求上；
    /// 结果按完成顺序产出，调用方用回传的关联字段重新对应
    pub fn download_many(
        &self,
        pool: &WorkerPool,
        items: Vec<DownloadRequest>,
        extra_headers: HeaderMap,
    ) -> impl Stream<Item = Result<FetchResult, TaskFailure<FetchError>>> {
        let client = self.clone();
        pool.work(items, Arc::new(extra_headers), move |request, headers| {
            let client = client.clone();
            async move { client.download_img_with_headers(&request, &headers).await }
        })
    }
}

/// 响应的内容类型，缺失时为空串
fn content_type_of(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// 由内容子类型和调用方文件名（或生成的令牌）推导目标路径
fn destination_path(content_type: &str, dir: Option<&str>, filename: Option<&str>) -> String {
    let subtype = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .split('/')
        .next_back()
        .unwrap_or("bin");
    let name = filename
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    match dir {
        Some(dir) => format!("{}/{}.{}", dir.trim_end_matches('/'), name, subtype),
        None => format!("{name}.{subtype}"),
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

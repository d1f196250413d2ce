// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// 初始化指标系统
///
/// 配置并注册应用所需的各类监控指标
pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    builder
        .install()
        .expect("failed to install Prometheus recorder");

    // Register metrics
    describe_counter!("fetch_requests_total", "Total number of HTTP requests issued");
    describe_counter!(
        "fetch_downloads_skipped_total",
        "Downloads skipped because the artifact already exists in the store"
    );
    describe_histogram!(
        "fetch_download_duration_seconds",
        "Duration of streamed downloads in seconds"
    );
    describe_counter!(
        "listener_messages_processed_total",
        "Messages taken off a queue and handled"
    );
    describe_counter!(
        "listener_messages_failed_total",
        "Messages whose handler reported an error"
    );
}

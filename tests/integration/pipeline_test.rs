// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use fetchrs::config::settings::HttpSettings;
use fetchrs::domain::models::message::{DownloadPayload, Envelope};
use fetchrs::fetch::client::FetchClient;
use fetchrs::infrastructure::database::entities::media_item;
use fetchrs::infrastructure::storage::InMemoryStore;
use fetchrs::queue::listener::Listener;
use fetchrs::queue::memory_queue::MemoryQueue;
use fetchrs::queue::service::QueueService;
use fetchrs::reconcile::service::ReconcileService;
use fetchrs::workers::download_worker::DownloadWorker;

const MP4_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42fake video body";
const IN_QUEUE: &str = "fetch-in";
const OUT_QUEUE: &str = "fetch-out";

async fn start_video_server(get_counter: Arc<AtomicUsize>) -> String {
    let app = Router::new().route(
        "/clip",
        get(move |method: Method| {
            let counter = get_counter.clone();
            async move {
                if method == Method::GET {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                ([(header::CONTENT_TYPE, "video/mp4")], MP4_BYTES.to_vec())
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn setup_db() -> Arc<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let backend = db.get_database_backend();
    let schema = sea_orm::Schema::new(backend);
    let stmt = schema.create_table_from_entity(media_item::Entity);
    db.execute(backend.build(&stmt)).await.unwrap();
    Arc::new(db)
}

fn http_settings() -> HttpSettings {
    HttpSettings {
        max_connections: 10,
        timeout_secs: 5,
        user_agent: "fetchrs-test/0.1".to_string(),
        default_headers: HashMap::new(),
    }
}

#[tokio::test]
async fn test_download_message_flows_through_the_whole_pipeline() {
    let get_counter = Arc::new(AtomicUsize::new(0));
    let server = start_video_server(get_counter.clone()).await;
    let db = setup_db().await;

    let store = Arc::new(InMemoryStore::new());
    let fetch = FetchClient::new(&http_settings(), store.clone()).unwrap();
    let reconcile = Arc::new(ReconcileService::new(db.clone()));
    let queue = Arc::new(MemoryQueue::new());

    let handler = DownloadWorker::new(fetch, reconcile, "downloads".to_string());
    let listener = Listener::new(
        queue.clone(),
        IN_QUEUE,
        Some(OUT_QUEUE.to_string()),
        Duration::from_millis(10),
        Duration::from_millis(50),
        handler,
    );

    let url = format!("{server}/clip");
    let mut message = Envelope::new(DownloadPayload {
        url: url.clone(),
        filename: Some("episode-1".to_string()),
        vid_path: None,
    });
    queue.enqueue(IN_QUEUE, &message).await.unwrap();

    assert!(listener.poll_once().await.unwrap());

    // The forwarded envelope carries the stored path and the timestamps.
    let forwarded = queue
        .dequeue(OUT_QUEUE, Duration::from_millis(50))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(forwarded.message_id, message.message_id);
    assert_eq!(
        forwarded.payload.vid_path.as_deref(),
        Some("downloads/episode-1.mp4")
    );
    assert!(forwarded.error.is_none());
    assert!(forwarded.stop.unwrap() >= forwarded.start.unwrap());

    // The artifact is in the store and exactly one row was reconciled.
    assert_eq!(
        store.get("downloads/episode-1.mp4").await.unwrap(),
        MP4_BYTES
    );
    let rows = media_item::Entity::find().count(db.as_ref()).await.unwrap();
    assert_eq!(rows, 1);
    assert_eq!(get_counter.load(Ordering::SeqCst), 1);

    // Re-enqueueing the same URL skips the network GET and reconciles onto
    // the same row.
    message.message_id = uuid::Uuid::new_v4();
    queue.enqueue(IN_QUEUE, &message).await.unwrap();
    assert!(listener.poll_once().await.unwrap());

    let second = queue
        .dequeue(OUT_QUEUE, Duration::from_millis(50))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        second.payload.vid_path.as_deref(),
        Some("downloads/episode-1.mp4")
    );
    assert_eq!(get_counter.load(Ordering::SeqCst), 1);

    let rows = media_item::Entity::find().count(db.as_ref()).await.unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_unreachable_url_is_reported_on_the_envelope() {
    let db = setup_db().await;
    let store = Arc::new(InMemoryStore::new());
    let fetch = FetchClient::new(&http_settings(), store.clone()).unwrap();
    let reconcile = Arc::new(ReconcileService::new(db.clone()));
    let queue = Arc::new(MemoryQueue::new());

    let handler = DownloadWorker::new(fetch, reconcile, "downloads".to_string());
    let listener = Listener::new(
        queue.clone(),
        IN_QUEUE,
        Some(OUT_QUEUE.to_string()),
        Duration::from_millis(10),
        Duration::from_millis(50),
        handler,
    );

    let message = Envelope::new(DownloadPayload {
        url: "http://127.0.0.1:1/unreachable".to_string(),
        filename: None,
        vid_path: None,
    });
    queue.enqueue(IN_QUEUE, &message).await.unwrap();

    // The failure never escapes the poll; it lands on the envelope instead.
    assert!(listener.poll_once().await.unwrap());

    let forwarded = queue
        .dequeue(OUT_QUEUE, Duration::from_millis(50))
        .await
        .unwrap()
        .unwrap();
    let error = forwarded.error.unwrap();
    assert_eq!(error.exception_type.as_deref(), Some("FetchError"));
    assert!(forwarded.payload.vid_path.is_none());

    let rows = media_item::Entity::find().count(db.as_ref()).await.unwrap();
    assert_eq!(rows, 0);
    assert!(store.keys().await.is_empty());
}

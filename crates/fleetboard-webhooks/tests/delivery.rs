//! Delivery worker tests against an in-process HTTP receiver.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use fleetboard_webhooks::{
    DeliveryJob, DeliveryStore, DeliveryWorker, Disposition, JobQueue, PayloadRow, WebhookRow,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default, Clone)]
struct MemStore {
    webhooks: HashMap<String, WebhookRow>,
    payloads: HashMap<String, PayloadRow>,
    urls: HashMap<String, String>,
}

#[async_trait]
impl DeliveryStore for MemStore {
    async fn webhook(&self, id: &str) -> anyhow::Result<Option<WebhookRow>> {
        Ok(self.webhooks.get(id).cloned())
    }

    async fn payload(&self, id: &str) -> anyhow::Result<Option<PayloadRow>> {
        Ok(self.payloads.get(id).cloned())
    }

    async fn delivery_url(&self, webhook_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.urls.get(webhook_id).cloned())
    }
}

/// A store whose lookups always fail, to exercise mid-delivery errors.
struct BrokenStore;

#[async_trait]
impl DeliveryStore for BrokenStore {
    async fn webhook(&self, _id: &str) -> anyhow::Result<Option<WebhookRow>> {
        anyhow::bail!("database unavailable")
    }

    async fn payload(&self, _id: &str) -> anyhow::Result<Option<PayloadRow>> {
        anyhow::bail!("database unavailable")
    }

    async fn delivery_url(&self, _webhook_id: &str) -> anyhow::Result<Option<String>> {
        anyhow::bail!("kv unavailable")
    }
}

#[derive(Default)]
struct RecordingQueue {
    acks: Mutex<Vec<u32>>,
    retries: Mutex<Vec<(u32, Duration)>>,
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn ack(&self, job: &DeliveryJob) -> anyhow::Result<()> {
        self.acks.lock().unwrap().push(job.attempt);
        Ok(())
    }

    async fn retry(&self, job: &DeliveryJob, delay: Duration) -> anyhow::Result<()> {
        self.retries.lock().unwrap().push((job.attempt, delay));
        Ok(())
    }
}

struct Received {
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Received {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Start a receiver that answers every POST with the given status and records
/// what it saw.
async fn spawn_receiver(status: StatusCode) -> (String, Arc<Mutex<Vec<Received>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    let app = Router::new().route(
        "/hook",
        post(move |headers: HeaderMap, body: Bytes| {
            let sink = sink.clone();
            async move {
                let headers = headers
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.as_str().to_string(),
                            String::from_utf8_lossy(value.as_bytes()).to_string(),
                        )
                    })
                    .collect();
                sink.lock().unwrap().push(Received {
                    headers,
                    body: body.to_vec(),
                });
                status
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/hook"), received)
}

/// A URL with nothing listening behind it.
fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/hook")
}

fn store_with(url: &str, enabled: bool, content_type: Option<&str>) -> MemStore {
    let mut store = MemStore::default();
    store.webhooks.insert(
        "wh-1".into(),
        WebhookRow {
            id: "wh-1".into(),
            enabled,
            description: "ci results".into(),
        },
    );
    store.payloads.insert(
        "pl-1".into(),
        PayloadRow {
            id: "pl-1".into(),
            webhook_id: "wh-1".into(),
            body: br#"{"event":"build.finished"}"#.to_vec(),
            headers: vec![("x-original-signature".into(), "sig-abc".into())],
            content_type: content_type.map(String::from),
        },
    );
    store.urls.insert("wh-1".into(), url.into());
    store
}

fn job() -> DeliveryJob {
    DeliveryJob::new("wh-1", "pl-1", "board-1")
}

#[tokio::test]
async fn test_successful_delivery_acks_with_injected_headers() {
    let (url, received) = spawn_receiver(StatusCode::OK).await;
    let worker = DeliveryWorker::new(store_with(&url, true, Some("text/plain"))).unwrap();

    let mut job = job();
    assert_eq!(worker.process(&mut job).await, Disposition::Ack);
    assert_eq!(job.attempt, 1);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    let request = &received[0];
    assert_eq!(request.body, br#"{"event":"build.finished"}"#);
    assert_eq!(request.header("x-webhook-id"), Some("wh-1"));
    assert_eq!(request.header("x-attempt"), Some("1"));
    assert_eq!(request.header("content-type"), Some("text/plain"));
    // Captured original headers are forwarded alongside.
    assert_eq!(request.header("x-original-signature"), Some("sig-abc"));
}

#[tokio::test]
async fn test_content_type_falls_back_to_application_json() {
    let (url, received) = spawn_receiver(StatusCode::OK).await;
    let worker = DeliveryWorker::new(store_with(&url, true, None)).unwrap();

    let mut job = job();
    assert_eq!(worker.process(&mut job).await, Disposition::Ack);

    let received = received.lock().unwrap();
    assert_eq!(received[0].header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_disabled_webhook_is_acked_without_delivery() {
    let (url, received) = spawn_receiver(StatusCode::OK).await;
    let worker = DeliveryWorker::new(store_with(&url, false, None)).unwrap();

    let mut job = job();
    assert_eq!(worker.process(&mut job).await, Disposition::Ack);
    // No delivery attempt was even counted.
    assert_eq!(job.attempt, 0);
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_webhook_is_acked() {
    let worker = DeliveryWorker::new(MemStore::default()).unwrap();

    let mut job = job();
    assert_eq!(worker.process(&mut job).await, Disposition::Ack);
}

#[tokio::test]
async fn test_missing_payload_is_acked() {
    let (url, received) = spawn_receiver(StatusCode::OK).await;
    let mut store = store_with(&url, true, None);
    store.payloads.clear();
    let worker = DeliveryWorker::new(store).unwrap();

    let mut job = job();
    assert_eq!(worker.process(&mut job).await, Disposition::Ack);
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_delivery_url_is_acked() {
    let (url, received) = spawn_receiver(StatusCode::OK).await;
    let mut store = store_with(&url, true, None);
    store.urls.clear();
    let worker = DeliveryWorker::new(store).unwrap();

    let mut job = job();
    assert_eq!(worker.process(&mut job).await, Disposition::Ack);
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_delivery_backs_off_five_then_ten_seconds() {
    let (url, received) = spawn_receiver(StatusCode::INTERNAL_SERVER_ERROR).await;
    let worker = DeliveryWorker::new(store_with(&url, true, None)).unwrap();

    let mut job = job();
    assert_eq!(
        worker.process(&mut job).await,
        Disposition::Retry(Duration::from_secs(5))
    );
    assert_eq!(
        worker.process(&mut job).await,
        Disposition::Retry(Duration::from_secs(10))
    );
    assert_eq!(job.attempt, 2);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].header("x-attempt"), Some("1"));
    assert_eq!(received[1].header("x-attempt"), Some("2"));
}

#[tokio::test]
async fn test_tenth_consecutive_failure_is_capped_at_five_minutes() {
    let (url, _received) = spawn_receiver(StatusCode::INTERNAL_SERVER_ERROR).await;
    let worker = DeliveryWorker::new(store_with(&url, true, None)).unwrap();

    let mut job = job();
    job.attempt = 9;
    assert_eq!(
        worker.process(&mut job).await,
        Disposition::Retry(Duration::from_secs(300))
    );
}

#[tokio::test]
async fn test_success_on_a_later_attempt_acks() {
    let (url, _received) = spawn_receiver(StatusCode::ACCEPTED).await;
    let worker = DeliveryWorker::new(store_with(&url, true, None)).unwrap();

    let mut job = job();
    job.attempt = 3;
    assert_eq!(worker.process(&mut job).await, Disposition::Ack);
    assert_eq!(job.attempt, 4);
}

#[tokio::test]
async fn test_network_failure_schedules_retry() {
    let worker = DeliveryWorker::new(store_with(&dead_url(), true, None)).unwrap();

    let mut job = job();
    assert_eq!(
        worker.process(&mut job).await,
        Disposition::Retry(Duration::from_secs(5))
    );
}

#[tokio::test]
async fn test_store_error_schedules_retry_without_counting_an_attempt() {
    let worker = DeliveryWorker::new(BrokenStore).unwrap();

    let mut job = job();
    assert_eq!(
        worker.process(&mut job).await,
        Disposition::Retry(Duration::from_secs(5))
    );
    // Nothing was POSTed, so the delivery counter is untouched.
    assert_eq!(job.attempt, 0);
}

#[tokio::test]
async fn test_first_delivery_after_store_outage_is_attempt_one() {
    let broken = DeliveryWorker::new(BrokenStore).unwrap();

    let mut job = job();
    assert_eq!(
        broken.process(&mut job).await,
        Disposition::Retry(Duration::from_secs(5))
    );

    let (url, received) = spawn_receiver(StatusCode::OK).await;
    let recovered = DeliveryWorker::new(store_with(&url, true, None)).unwrap();
    assert_eq!(recovered.process(&mut job).await, Disposition::Ack);

    let received = received.lock().unwrap();
    assert_eq!(received[0].header("x-attempt"), Some("1"));
}

#[tokio::test]
async fn test_run_applies_disposition_to_queue() {
    let (url, _received) = spawn_receiver(StatusCode::OK).await;
    let worker = DeliveryWorker::new(store_with(&url, true, None)).unwrap();
    let queue = RecordingQueue::default();

    worker.run(job(), &queue).await.unwrap();
    assert_eq!(queue.acks.lock().unwrap().as_slice(), &[1]);
    assert!(queue.retries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_batch_continues_past_a_failing_job() {
    let (good_url, _received) = spawn_receiver(StatusCode::OK).await;
    let mut store = store_with(&good_url, true, None);
    store.webhooks.insert(
        "wh-bad".into(),
        WebhookRow {
            id: "wh-bad".into(),
            enabled: true,
            description: String::new(),
        },
    );
    store.payloads.insert(
        "pl-bad".into(),
        PayloadRow {
            id: "pl-bad".into(),
            webhook_id: "wh-bad".into(),
            body: b"{}".to_vec(),
            headers: vec![],
            content_type: None,
        },
    );
    store.urls.insert("wh-bad".into(), dead_url());
    let worker = DeliveryWorker::new(store).unwrap();
    let queue = RecordingQueue::default();

    let jobs = vec![DeliveryJob::new("wh-bad", "pl-bad", "board-1"), job()];
    worker.run_batch(jobs, &queue).await;

    // The failing job was retried, the healthy one delivered.
    assert_eq!(queue.retries.lock().unwrap().as_slice(), &[(1, Duration::from_secs(5))]);
    assert_eq!(queue.acks.lock().unwrap().as_slice(), &[1]);
}

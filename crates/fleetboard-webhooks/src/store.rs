//! Read-only storage and queue-substrate seams for the delivery worker.
//!
//! Rows and delivery URLs are owned by external collaborators (the relational
//! store and a small key-value namespace); this layer only reads them. The
//! queue substrate owns redelivery and its own max-retry ceiling — jobs that
//! exhaust it are dead-lettered outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A configured webhook (read-only to this layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRow {
    pub id: String,
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
}

/// A previously ingested inbound payload (read-only to this layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadRow {
    pub id: String,
    pub webhook_id: String,
    /// Raw body, forwarded verbatim.
    pub body: Vec<u8>,
    /// Captured subset of the original request headers.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Captured content type, if any was present on ingestion.
    #[serde(default)]
    pub content_type: Option<String>,
}

/// One unit of delivery work.
///
/// `attempt` is the application-level counter the worker increments before
/// each delivery attempt (first attempt = 1). It rides along in the job data
/// and is distinct from any transport-level redelivery counter the queue
/// substrate tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryJob {
    pub webhook_id: String,
    pub payload_id: String,
    /// Owning board, carried for log context only.
    pub board_id: String,
    #[serde(default)]
    pub attempt: u32,
}

impl DeliveryJob {
    pub fn new(
        webhook_id: impl Into<String>,
        payload_id: impl Into<String>,
        board_id: impl Into<String>,
    ) -> Self {
        Self {
            webhook_id: webhook_id.into(),
            payload_id: payload_id.into(),
            board_id: board_id.into(),
            attempt: 0,
        }
    }
}

/// Key under which a webhook's delivery URL lives in the side KV namespace.
pub fn url_key(webhook_id: &str) -> String {
    format!("webhook:{webhook_id}:url")
}

/// Read access to webhook rows, payload rows, and delivery URLs.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Look up a webhook row by id.
    async fn webhook(&self, id: &str) -> anyhow::Result<Option<WebhookRow>>;

    /// Look up a stored payload row by id.
    async fn payload(&self, id: &str) -> anyhow::Result<Option<PayloadRow>>;

    /// Resolve the delivery URL for a webhook from the KV namespace
    /// (see [`url_key`]).
    async fn delivery_url(&self, webhook_id: &str) -> anyhow::Result<Option<String>>;
}

/// The queue substrate's per-job contract.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Permanently remove the job from the queue.
    async fn ack(&self, job: &DeliveryJob) -> anyhow::Result<()>;

    /// Redeliver the job after the given delay. The substrate applies its own
    /// max-retry ceiling before dead-lettering.
    async fn retry(&self, job: &DeliveryJob, delay: Duration) -> anyhow::Result<()>;
}

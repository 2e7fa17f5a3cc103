//! The webhook delivery worker.
//!
//! One job flows `received → validating → delivering → {acked |
//! retry-scheduled}`. Validation failures (disabled webhook, purged payload,
//! missing destination) are acked, not retried: retrying cannot change the
//! outcome, so silently discarding them is correct — they are logged for
//! operational visibility only. Delivery failures go back to the queue with
//! exponential backoff until the substrate's own retry ceiling dead-letters
//! the job.

use crate::backoff::backoff_delay;
use crate::config::DeliveryConfig;
use crate::store::{DeliveryJob, DeliveryStore, JobQueue, PayloadRow};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use tracing::{debug, error, info, warn};

/// What to tell the queue substrate about a processed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Permanently remove the job.
    Ack,
    /// Redeliver after the given delay.
    Retry(std::time::Duration),
}

/// Delivers queued webhook jobs to their third-party destinations.
pub struct DeliveryWorker<S> {
    store: S,
    http: reqwest::Client,
}

impl<S: DeliveryStore> DeliveryWorker<S> {
    pub fn new(store: S) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DeliveryConfig::REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { store, http })
    }

    /// Process one job and decide its disposition.
    ///
    /// Never errors: unexpected failures mid-delivery become a scheduled
    /// retry, so one bad job cannot abort a batch.
    pub async fn process(&self, job: &mut DeliveryJob) -> Disposition {
        let webhook = match self.store.webhook(&job.webhook_id).await {
            Ok(row) => row,
            Err(e) => return self.retry_after_error(job, &format!("webhook lookup failed: {e:#}")),
        };
        match webhook {
            Some(row) if row.enabled => {}
            Some(_) => {
                info!(webhook = %job.webhook_id, board = %job.board_id, "webhook disabled, dropping job");
                return Disposition::Ack;
            }
            None => {
                info!(webhook = %job.webhook_id, board = %job.board_id, "webhook missing, dropping job");
                return Disposition::Ack;
            }
        }

        let payload = match self.store.payload(&job.payload_id).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                // Purged by retention; redelivery is impossible.
                info!(webhook = %job.webhook_id, payload = %job.payload_id, "payload missing, dropping job");
                return Disposition::Ack;
            }
            Err(e) => return self.retry_after_error(job, &format!("payload lookup failed: {e:#}")),
        };

        let url = match self.store.delivery_url(&job.webhook_id).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                info!(webhook = %job.webhook_id, "no delivery URL configured, dropping job");
                return Disposition::Ack;
            }
            Err(e) => return self.retry_after_error(job, &format!("url lookup failed: {e:#}")),
        };

        job.attempt += 1;
        self.deliver(job, &payload, &url).await
    }

    /// Issue one HTTP POST: raw body verbatim, captured headers, forced
    /// content type, and the two injected idempotency headers.
    async fn deliver(&self, job: &DeliveryJob, payload: &PayloadRow, url: &str) -> Disposition {
        let headers = self.build_headers(job, payload);
        let result = self
            .http
            .post(url)
            .headers(headers)
            .body(payload.body.clone())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!(
                    webhook = %job.webhook_id,
                    attempt = job.attempt,
                    status = %response.status(),
                    "delivery succeeded"
                );
                Disposition::Ack
            }
            Ok(response) => {
                let delay = backoff_delay(job.attempt);
                warn!(
                    webhook = %job.webhook_id,
                    attempt = job.attempt,
                    status = %response.status(),
                    delay_secs = delay.as_secs(),
                    "delivery rejected, scheduling retry"
                );
                Disposition::Retry(delay)
            }
            Err(e) => {
                let delay = backoff_delay(job.attempt);
                warn!(
                    webhook = %job.webhook_id,
                    attempt = job.attempt,
                    delay_secs = delay.as_secs(),
                    "delivery failed: {e}, scheduling retry"
                );
                Disposition::Retry(delay)
            }
        }
    }

    fn build_headers(&self, job: &DeliveryJob, payload: &PayloadRow) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for (name, value) in &payload.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => debug!(header = %name, "skipping unforwardable captured header"),
            }
        }

        // The forced content type and injected headers win over captured ones.
        let content_type = payload
            .content_type
            .as_deref()
            .unwrap_or(DeliveryConfig::DEFAULT_CONTENT_TYPE);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(content_type)
                .unwrap_or(HeaderValue::from_static(DeliveryConfig::DEFAULT_CONTENT_TYPE)),
        );
        if let Ok(value) = HeaderValue::from_str(&job.webhook_id) {
            headers.insert(HeaderName::from_static(DeliveryConfig::WEBHOOK_ID_HEADER), value);
        }
        headers.insert(
            HeaderName::from_static(DeliveryConfig::ATTEMPT_HEADER),
            HeaderValue::from(job.attempt),
        );

        headers
    }

    /// An unexpected error (store outage, not a validation miss) is scheduled
    /// for retry. The attempt counter is left alone: nothing was delivered,
    /// and `X-Attempt` counts actual POSTs.
    fn retry_after_error(&self, job: &DeliveryJob, reason: &str) -> Disposition {
        let delay = backoff_delay(job.attempt + 1);
        warn!(
            webhook = %job.webhook_id,
            attempt = job.attempt,
            delay_secs = delay.as_secs(),
            "{reason}, scheduling retry"
        );
        Disposition::Retry(delay)
    }

    /// Process one job and apply its disposition to the queue substrate.
    pub async fn run(&self, mut job: DeliveryJob, queue: &impl JobQueue) -> anyhow::Result<()> {
        match self.process(&mut job).await {
            Disposition::Ack => queue.ack(&job).await,
            Disposition::Retry(delay) => queue.retry(&job, delay).await,
        }
    }

    /// Process a batch strictly sequentially. A failing job is scheduled for
    /// retry without affecting its siblings; queue errors are logged and the
    /// batch continues (the substrate will redeliver an unacked job anyway).
    pub async fn run_batch(&self, jobs: Vec<DeliveryJob>, queue: &impl JobQueue) {
        for job in jobs {
            let webhook_id = job.webhook_id.clone();
            if let Err(e) = self.run(job, queue).await {
                error!(webhook = %webhook_id, "queue operation failed: {e:#}");
            }
        }
    }
}

//! Fleetboard webhook delivery worker.
//!
//! Consumes queued delivery jobs, resolves the stored payload and destination
//! for each, pushes the payload to the third-party URL, and applies
//! exponential backoff on failure. Delivery is at-least-once: receivers must
//! tolerate duplicates and out-of-order arrival, which is what the injected
//! `X-Webhook-Id` and `X-Attempt` headers are for.
//!
//! Storage rows and the queue substrate are external collaborators behind
//! the [`DeliveryStore`] and [`JobQueue`] traits.

pub mod backoff;
pub mod config;
pub mod store;
pub mod worker;

pub use backoff::backoff_delay;
pub use config::DeliveryConfig;
pub use store::{url_key, DeliveryJob, DeliveryStore, JobQueue, PayloadRow, WebhookRow};
pub use worker::{DeliveryWorker, Disposition};

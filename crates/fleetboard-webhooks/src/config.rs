//! Centralized configuration for webhook delivery.

use std::time::Duration;

/// Delivery-related constants.
pub struct DeliveryConfig;

impl DeliveryConfig {
    /// First retry delay.
    pub const BACKOFF_BASE: Duration = Duration::from_secs(5);
    /// Retry delay ceiling.
    pub const BACKOFF_MAX: Duration = Duration::from_secs(300);

    /// Timeout for one outbound POST.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Forced content type when no original one was captured.
    pub const DEFAULT_CONTENT_TYPE: &'static str = "application/json";

    /// Injected header naming the webhook (idempotency aid for receivers).
    pub const WEBHOOK_ID_HEADER: &'static str = "x-webhook-id";
    /// Injected header carrying the 1-indexed attempt number.
    pub const ATTEMPT_HEADER: &'static str = "x-attempt";
}

//! Retry backoff for failed deliveries.

use crate::config::DeliveryConfig;
use std::time::Duration;

/// Delay before redelivering a job whose `attempt`-th try failed (1-indexed):
/// `min(BASE * 2^(attempt-1), MAX)`.
///
/// Deliberately unjittered, unlike the reconnection backoff used elsewhere in
/// the product: per-organization webhook volume is low enough that
/// thundering-herd retries are not a practical concern.
pub fn backoff_delay(attempt: u32) -> Duration {
    // Clamp the exponent so large attempt numbers cannot overflow the shift.
    let exponent = attempt.saturating_sub(1).min(32);
    let secs = DeliveryConfig::BACKOFF_BASE
        .as_secs()
        .saturating_mul(1u64 << exponent);
    Duration::from_secs(secs.min(DeliveryConfig::BACKOFF_MAX.as_secs()))
}

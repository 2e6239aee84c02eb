mod client;
mod config;
mod limit;
mod retry;

use std::num::NonZeroU32;

pub use client::ComprehendDetector;
pub use config::{DetectorConfig, DetectorConfigError, StaticCredentials};
pub use limit::ThrottledDetector;
pub use retry::{RetryPolicy, RetryingDetector};

use crate::ingest::EntityDetector;

/// Wraps a network detector with the configured throttle and retry policy.
///
/// Each attempt passes through the throttle, so backoff sleeps do not hold
/// an in-flight slot.
#[must_use]
pub fn guarded(detector: Box<dyn EntityDetector>, config: &DetectorConfig) -> RetryingDetector {
    let mut throttled = ThrottledDetector::new(detector, config.max_in_flight);
    if let Some(rate) = config.requests_per_second.and_then(NonZeroU32::new) {
        throttled = throttled.with_rate(rate);
    }
    RetryingDetector::new(Box::new(throttled), config.retry)
}

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entity::DetectedEntity;
use crate::ingest::{DetectionResult, EntityDetector};

/// Bounded exponential backoff for detector calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based), without jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(20);
        let millis = self.base_delay_ms.saturating_mul(1 << shift);
        Duration::from_millis(millis.min(self.max_delay_ms))
    }

    /// `delay_for` plus up to 20% random jitter.
    fn jittered_delay(&self, retry: u32) -> Duration {
        let delay = self.delay_for(retry);
        let spread = u64::try_from(delay.as_millis() / 5).unwrap_or(0);
        if spread == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::rng().random_range(0..=spread))
    }
}

/// Retries transient detector failures according to a [`RetryPolicy`].
///
/// Non-retryable errors are returned on the first occurrence; retryable
/// ones are returned once the attempt budget is spent.
pub struct RetryingDetector {
    inner: Box<dyn EntityDetector>,
    policy: RetryPolicy,
}

impl RetryingDetector {
    #[must_use]
    pub fn new(inner: Box<dyn EntityDetector>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait::async_trait]
impl EntityDetector for RetryingDetector {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn detect(&self, text: &str, language: &str) -> DetectionResult<Vec<DetectedEntity>> {
        let mut attempt = 1;

        loop {
            match self.inner.detect(text, language).await {
                Ok(entities) => return Ok(entities),
                Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.jittered_delay(attempt);
                    warn!(
                        detector = self.inner.name(),
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "detector call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::ingest::DetectionError;

    struct FlakyDetector {
        calls: Arc<AtomicU32>,
        failures: u32,
        retryable: bool,
    }

    #[async_trait::async_trait]
    impl EntityDetector for FlakyDetector {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn detect(&self, _text: &str, _language: &str) -> DetectionResult<Vec<DetectedEntity>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                if self.retryable {
                    return Err(DetectionError::Unavailable("503".into()));
                }
                return Err(DetectionError::Rejected("bad request".into()));
            }
            Ok(vec![DetectedEntity::new("SSN", 0.9, 0, 9)])
        }
    }

    fn flaky(failures: u32, retryable: bool) -> (Arc<AtomicU32>, Box<dyn EntityDetector>) {
        let calls = Arc::new(AtomicU32::new(0));
        let detector = FlakyDetector {
            calls: Arc::clone(&calls),
            failures,
            retryable,
        };
        (calls, Box::new(detector))
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_from_transient_failures() {
        let (calls, inner) = flaky(2, true);
        let detector = RetryingDetector::new(inner, RetryPolicy::default());

        let found = detector.detect("123456789", "en").await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let (calls, inner) = flaky(u32::MAX, true);
        let policy = RetryPolicy {
            max_attempts: 3,
            ..Default::default()
        };
        let detector = RetryingDetector::new(inner, policy);

        let result = detector.detect("text", "en").await;

        assert!(matches!(result, Err(DetectionError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_rejections() {
        let (calls, inner) = flaky(1, false);
        let detector = RetryingDetector::new(inner, RetryPolicy::default());

        let result = detector.detect("text", "en").await;

        assert!(matches!(result, Err(DetectionError::Rejected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let (_, inner) = flaky(2, true);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
        };
        let detector = RetryingDetector::new(inner, policy);

        let start = tokio::time::Instant::now();
        detector.detect("text", "en").await.unwrap();

        // 1s + 2s, plus at most 20% jitter on each
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(3));
        assert!(waited <= Duration::from_millis(3_600));
    }

    #[test]
    fn test_delay_is_exponential_and_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay_ms: 500,
            max_delay_ms: 5_000,
        };

        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(4_000));
        assert_eq!(policy.delay_for(5), Duration::from_millis(5_000));
        assert_eq!(policy.delay_for(64), Duration::from_millis(5_000));
    }
}

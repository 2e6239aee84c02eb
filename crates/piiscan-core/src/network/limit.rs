use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tokio::sync::Semaphore;

use crate::entity::DetectedEntity;
use crate::ingest::{DetectionError, DetectionResult, EntityDetector};

/// Caps concurrent calls to a detector and optionally paces them.
///
/// The cap is independent of how many documents are scanned in parallel,
/// so the external service sees at most `max_in_flight` requests.
pub struct ThrottledDetector {
    inner: Box<dyn EntityDetector>,
    permits: Semaphore,
    pacing: Option<DefaultDirectRateLimiter>,
}

impl ThrottledDetector {
    #[must_use]
    pub fn new(inner: Box<dyn EntityDetector>, max_in_flight: usize) -> Self {
        Self {
            inner,
            permits: Semaphore::new(max_in_flight.max(1)),
            pacing: None,
        }
    }

    #[must_use]
    pub fn with_rate(mut self, per_second: NonZeroU32) -> Self {
        self.pacing = Some(RateLimiter::direct(Quota::per_second(per_second)));
        self
    }
}

#[async_trait::async_trait]
impl EntityDetector for ThrottledDetector {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn detect(&self, text: &str, language: &str) -> DetectionResult<Vec<DetectedEntity>> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| DetectionError::Unavailable("detector throttle closed".into()))?;

        if let Some(pacing) = &self.pacing {
            pacing.until_ready().await;
        }

        self.inner.detect(text, language).await
    }
}

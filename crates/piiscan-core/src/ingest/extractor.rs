use thiserror::Error;
use tracing::warn;

use crate::entity::{DetectedEntity, EntityMatch, SSN};

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Detector unavailable: {0}")]
    Unavailable(String),
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Credentials error: {0}")]
    Credentials(String),
}

impl DetectionError {
    /// Throttling and transient service faults.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Unavailable(_))
    }
}

pub type DetectionResult<T> = Result<T, DetectionError>;

#[async_trait::async_trait]
pub trait EntityDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Offsets in the returned entities are character offsets into `text`.
    async fn detect(&self, text: &str, language: &str) -> DetectionResult<Vec<DetectedEntity>>;
}

pub struct ExtractionPattern {
    pub entity_type: String,
    pub regex: regex::Regex,
    pub confidence: f64,
}

impl ExtractionPattern {
    pub fn new(entity_type: &str, pattern: &str, confidence: f64) -> Result<Self, regex::Error> {
        Ok(Self {
            entity_type: entity_type.to_string(),
            regex: regex::Regex::new(pattern)?,
            confidence,
        })
    }
}

/// Offline detector driven by regular expressions.
pub struct PatternDetector {
    patterns: Vec<ExtractionPattern>,
}

impl PatternDetector {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: ExtractionPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// US social security number shapes, most specific first.
    #[must_use]
    pub fn with_default_patterns() -> Self {
        let mut detector = Self::new();

        let shapes = [
            (r"\b\d{3}-\d{2}-\d{4}\b", 0.9),
            (r"\b\d{3} \d{2} \d{4}\b", 0.7),
            (r"\b\d{9}\b", 0.5),
        ];

        for (pattern, confidence) in shapes {
            if let Ok(p) = ExtractionPattern::new(SSN, pattern, confidence) {
                detector.patterns.push(p);
            }
        }

        detector
    }
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::with_default_patterns()
    }
}

#[async_trait::async_trait]
impl EntityDetector for PatternDetector {
    fn name(&self) -> &'static str {
        "pattern"
    }

    async fn detect(&self, text: &str, _language: &str) -> DetectionResult<Vec<DetectedEntity>> {
        let mut entities = Vec::new();

        for pattern in &self.patterns {
            for found in pattern.regex.find_iter(text) {
                let begin = text[..found.start()].chars().count();
                let end = begin + found.as_str().chars().count();
                entities.push(DetectedEntity::new(
                    pattern.entity_type.as_str(),
                    pattern.confidence,
                    begin,
                    end,
                ));
            }
        }

        entities.sort_by_key(|e| e.begin_offset);
        Ok(entities)
    }
}

/// Keeps entities of `target_type`, attaching the matched text and source.
///
/// Offsets stay relative to `segment`. Entities whose offsets fall outside
/// the segment cannot be localized and are dropped.
pub fn localize(
    raw: Vec<DetectedEntity>,
    segment: &str,
    target_type: &str,
    source_file: &str,
) -> Vec<EntityMatch> {
    raw.into_iter()
        .filter(|entity| entity.is_type(target_type))
        .filter_map(|entity| {
            let Some(matched) = char_slice(segment, entity.begin_offset, entity.end_offset) else {
                warn!(
                    file = source_file,
                    begin = entity.begin_offset,
                    end = entity.end_offset,
                    "entity offsets outside segment, dropping"
                );
                return None;
            };

            Some(EntityMatch {
                entity_type: entity.entity_type,
                score: entity.score,
                begin_offset: entity.begin_offset,
                end_offset: entity.end_offset,
                matched_string: matched.to_string(),
                source_file: source_file.to_string(),
            })
        })
        .collect()
}

/// Slices `text` by character positions `[begin, end)`.
pub fn char_slice(text: &str, begin: usize, end: usize) -> Option<&str> {
    if begin > end {
        return None;
    }

    let mut boundaries = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));

    let start = boundaries.nth(begin)?;
    let stop = if end == begin {
        start
    } else {
        boundaries.nth(end - begin - 1)?
    };

    Some(&text[start..stop])
}

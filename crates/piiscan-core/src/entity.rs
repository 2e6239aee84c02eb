use serde::{Deserialize, Serialize};

/// Entity type reported by Comprehend for US social security numbers.
pub const SSN: &str = "SSN";

/// A raw detection as returned by an [`EntityDetector`](crate::ingest::EntityDetector).
///
/// Offsets count characters (Unicode scalar values), not bytes, and are
/// relative to the text that was submitted to the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedEntity {
    pub entity_type: String,
    pub score: f64,
    pub begin_offset: usize,
    pub end_offset: usize,
}

impl DetectedEntity {
    #[must_use]
    pub fn new(entity_type: impl Into<String>, score: f64, begin_offset: usize, end_offset: usize) -> Self {
        Self {
            entity_type: entity_type.into(),
            score,
            begin_offset,
            end_offset,
        }
    }

    pub fn is_type(&self, target: &str) -> bool {
        self.entity_type == target
    }
}

/// A detection of the target type, localized to its matched text and source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMatch {
    pub entity_type: String,
    pub score: f64,
    /// Character offset into the segment the entity was detected in.
    pub begin_offset: usize,
    pub end_offset: usize,
    pub matched_string: String,
    pub source_file: String,
}

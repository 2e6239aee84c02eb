mod extractor;
mod parser;
mod pipeline;
mod segmenter;

pub use extractor::{
    char_slice, localize, DetectionError, DetectionResult, EntityDetector, ExtractionPattern,
    PatternDetector,
};
pub use parser::{Page, PageReader, ParseError, ParseResult, PdfTextSource, TextSource};
pub use pipeline::{
    DocumentFailure, ProgressFn, ScanOptions, ScanSummary, Scanner, SkippedPage, StopSignal,
};
pub use segmenter::{Segment, SegmentError, Segmenter, DEFAULT_SEGMENT_BYTES};

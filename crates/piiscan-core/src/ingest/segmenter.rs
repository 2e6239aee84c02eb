use thiserror::Error;

/// Default per-call text budget in UTF-8 bytes, well under Comprehend's own
/// request size limit. Override with `segment_bytes`.
pub const DEFAULT_SEGMENT_BYTES: usize = 5000;

/// Smallest limit that can always hold one UTF-8 encoded character.
const MIN_SEGMENT_BYTES: usize = 4;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Segment limit too small: {0} bytes (min: {MIN_SEGMENT_BYTES})")]
    LimitTooSmall(usize),
}

/// A contiguous, size-bounded slice of a page's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub index: usize,
    pub text: &'a str,
    /// Characters of the page that precede this segment.
    pub char_offset: usize,
}

/// Splits page text into segments no larger than `max_bytes`.
///
/// Concatenating the segments of a page reproduces the page exactly: cuts
/// land just after a whitespace character (which stays with the earlier
/// segment) or, for long unbroken runs, on a character boundary.
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    max_bytes: usize,
}

impl Segmenter {
    pub fn new(max_bytes: usize) -> Result<Self, SegmentError> {
        if max_bytes < MIN_SEGMENT_BYTES {
            return Err(SegmentError::LimitTooSmall(max_bytes));
        }
        Ok(Self { max_bytes })
    }

    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    #[must_use]
    pub fn segment<'a>(&self, text: &'a str) -> Vec<Segment<'a>> {
        let mut segments = Vec::new();
        let mut rest = text;
        let mut char_offset = 0;

        while !rest.is_empty() {
            let cut = if rest.len() <= self.max_bytes {
                rest.len()
            } else {
                split_point(rest, self.max_bytes)
            };

            let (head, tail) = rest.split_at(cut);
            segments.push(Segment {
                index: segments.len(),
                text: head,
                char_offset,
            });
            char_offset += head.chars().count();
            rest = tail;
        }

        segments
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_SEGMENT_BYTES,
        }
    }
}

/// Byte index to cut `rest` at, given `rest.len() > max_bytes`.
fn split_point(rest: &str, max_bytes: usize) -> usize {
    let mut window = max_bytes;
    while !rest.is_char_boundary(window) {
        window -= 1;
    }

    // Whitespace in the first half of the window would leave a tiny segment.
    rest[..window]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(pos, c)| pos + c.len_utf8())
        .filter(|cut| *cut >= window / 2)
        .unwrap_or(window)
}

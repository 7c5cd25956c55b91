//! Timed transcript segments.
//!
//! A transcript is the ordered list of caption nodes for one video, exactly
//! as the caption track delivered them.

use serde::{Deserialize, Serialize};

/// A single caption node: when it starts, how long it stays up, and what it says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    /// Start offset in seconds
    pub start: f64,

    /// Display duration in seconds
    pub duration: f64,

    /// Decoded caption text
    pub text: String,
}

impl TimedSegment {
    pub fn new(start: f64, duration: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            duration,
            text: text.into(),
        }
    }

    /// End offset in seconds
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Ordered caption segments scoped to one video identity.
///
/// Segment order is the source order; it is never re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Video this transcript belongs to
    pub video_id: String,

    /// Segments in source order
    pub segments: Vec<TimedSegment>,
}

impl Transcript {
    pub fn new(video_id: impl Into<String>, segments: Vec<TimedSegment>) -> Self {
        Self {
            video_id: video_id.into(),
            segments,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// End of the last segment, or 0 for an empty transcript
    pub fn duration_seconds(&self) -> f64 {
        self.segments.last().map(TimedSegment::end).unwrap_or(0.0)
    }
}

//! Domain types for veritrack.
//!
//! This module contains the core data structures:
//! - Segments: Timed caption text making up a transcript
//! - Claims: Verified assertions and the per-video claim set
//! - Session: State of the video currently being watched

pub mod claim;
pub mod segment;
pub mod session;

// Re-export commonly used types
pub use claim::{format_timestamp, Claim, ClaimSet, ScoreBand, Verdict, MAX_SCORE};
pub use segment::{TimedSegment, Transcript};
pub use session::{FailureKind, SessionState, VideoSession};

//! Core pipeline logic.
//!
//! This module contains:
//! - Extractor: Caption descriptor slicing and timed-text decoding
//! - Normalizer: Prompt rendering and verifier response validation
//! - Synchronizer: Active-claim resolution against playback time
//! - Controller: Per-video session state machine

pub mod controller;
pub mod extractor;
pub mod normalizer;
pub mod synchronizer;

// Re-export commonly used types
pub use controller::{
    ControllerCommand, ControllerHandle, PageHost, PlaybackClock, SessionController, StageOutcome,
};
pub use extractor::{
    locate_caption_tracks, parse_timed_text, select_track, CaptionTrack, ExtractionFailure,
    TranscriptExtractor,
};
pub use normalizer::{
    build_prompt, parse_claim_set, render_transcript, strip_code_fences, ClaimNormalizer,
    NormalizationFailure,
};
pub use synchronizer::{resolve_active, HighlightChange, PlaybackSynchronizer, DEFAULT_LOOKAHEAD_SECONDS};

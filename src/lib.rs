//! veritrack - Truth-score timeline for videos
//!
//! Pulls a video's caption track, has an external verifier fact-check the
//! transcript, and keeps the claim matching the current playback position
//! highlighted while the video plays.
//!
//! # Architecture
//!
//! The pipeline runs once per video identity:
//! - Extract: slice the caption descriptor out of the watch page and decode the track
//! - Normalize: send the transcript to the verifier and validate its answer
//! - Synchronize: map playback time onto the sorted claim timeline
//!
//! A session controller sequences the stages and throws away results that
//! arrive after the viewer has moved on to another video.
//!
//! # Modules
//!
//! - `adapters`: External services (caption source, Gemini verifier)
//! - `core`: Extractor, Normalizer, Synchronizer, Session Controller
//! - `domain`: Data structures (TimedSegment, Claim, VideoSession)
//! - `presentation`: Presentation surface contract
//! - `settings`: Credential storage
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Store the verifier key
//! veritrack key set <API_KEY>
//!
//! # Fact-check a video once
//! veritrack analyze https://www.youtube.com/watch?v=<id>
//!
//! # Follow a simulated playback
//! veritrack watch <id>
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod presentation;
pub mod settings;

// Re-export main types at crate root for convenience
pub use crate::core::{
    ClaimNormalizer, ExtractionFailure, NormalizationFailure, PlaybackSynchronizer,
    SessionController, TranscriptExtractor,
};
pub use adapters::{CaptionSource, GeminiVerifier, HttpCaptionSource, Verifier};
pub use domain::{Claim, ClaimSet, SessionState, TimedSegment, Transcript, VideoSession};
pub use presentation::{PresentationSurface, TerminalSurface};
pub use settings::{FileSettingsStore, MemorySettingsStore, SettingsStore};

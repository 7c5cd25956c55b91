//! Per-video session state.
//!
//! A `VideoSession` holds everything known about the video currently being
//! watched. It is created when a new video identity is detected and dropped
//! as a whole when the identity changes again; fields are only advanced
//! within the same identity.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::claim::{Claim, ClaimSet};
use super::segment::Transcript;

/// Lifecycle stage of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SessionState {
    /// No video being watched
    Idle,

    /// Fetching and decoding the caption track
    Extracting,

    /// Waiting on the verifier
    Normalizing,

    /// Claims loaded, following playback
    Synchronizing,

    /// Pipeline ended for this video; waits for the next identity change
    Failed { kind: FailureKind, message: String },
}

impl SessionState {
    /// True while a stage is in flight
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionState::Extracting | SessionState::Normalizing)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SessionState::Failed { .. })
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Why a session's pipeline ended early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Captions missing or undecodable
    NoTranscript,

    /// Verifier unreachable, misconfigured, or answered with garbage
    AnalysisError,
}

/// Everything known about the video currently being watched.
#[derive(Debug, Clone)]
pub struct VideoSession {
    /// Identity of the watched video
    pub video_id: String,

    /// Monotonic counter distinguishing this session from earlier ones,
    /// even when the same video is reopened
    pub generation: u64,

    /// Current stage
    pub state: SessionState,

    /// When the identity was first seen
    pub started_at: DateTime<Utc>,

    transcript: Option<Transcript>,
    claim_set: Option<ClaimSet>,
    active_claim: Option<usize>,
}

impl VideoSession {
    /// Start a session for a freshly detected identity
    pub fn new(video_id: impl Into<String>, generation: u64) -> Self {
        Self {
            video_id: video_id.into(),
            generation,
            state: SessionState::Extracting,
            started_at: Utc::now(),
            transcript: None,
            claim_set: None,
            active_claim: None,
        }
    }

    /// Time since the identity was first seen
    pub fn elapsed(&self) -> Duration {
        Utc::now() - self.started_at
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        self.transcript.as_ref()
    }

    pub fn claim_set(&self) -> Option<&ClaimSet> {
        self.claim_set.as_ref()
    }

    /// Claims in timestamp order, empty until analysis finished
    pub fn claims(&self) -> &[Claim] {
        self.claim_set
            .as_ref()
            .map(|set| set.claims.as_slice())
            .unwrap_or(&[])
    }

    pub fn active_claim(&self) -> Option<usize> {
        self.active_claim
    }

    /// Record the decoded transcript and move on to analysis
    pub fn begin_normalizing(&mut self, transcript: Transcript) {
        self.transcript = Some(transcript);
        self.state = SessionState::Normalizing;
    }

    /// Record the verified claims and start following playback.
    ///
    /// Claims are re-sorted here regardless of what the producer did.
    pub fn begin_synchronizing(&mut self, mut claim_set: ClaimSet) {
        claim_set.sort_claims();
        self.claim_set = Some(claim_set);
        self.active_claim = None;
        self.state = SessionState::Synchronizing;
    }

    pub fn fail(&mut self, kind: FailureKind, message: impl Into<String>) {
        self.state = SessionState::Failed {
            kind,
            message: message.into(),
        };
    }

    /// Set the active claim. Out-of-range indices are treated as "none".
    pub fn set_active_claim(&mut self, index: Option<usize>) {
        self.active_claim = index.filter(|i| *i < self.claims().len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimedSegment;

    #[test]
    fn test_session_lifecycle() {
        let mut session = VideoSession::new("abc", 1);
        assert_eq!(session.state, SessionState::Extracting);
        assert!(session.state.is_pending());

        session.begin_normalizing(Transcript::new(
            "abc",
            vec![TimedSegment::new(0.0, 1.0, "hi")],
        ));
        assert_eq!(session.state, SessionState::Normalizing);
        assert_eq!(session.transcript().map(Transcript::len), Some(1));

        session.begin_synchronizing(ClaimSet::new(
            60,
            vec![Claim::new(30.0, "b", 10, ""), Claim::new(5.0, "a", 90, "")],
        ));
        assert_eq!(session.state, SessionState::Synchronizing);
        assert_eq!(session.claims()[0].text, "a");
        assert_eq!(session.active_claim(), None);
    }

    #[test]
    fn test_elapsed_counts_from_start() {
        let mut session = VideoSession::new("abc", 1);
        session.started_at = Utc::now() - Duration::seconds(30);
        assert!(session.elapsed().num_seconds() >= 30);
    }

    #[test]
    fn test_active_claim_rejects_out_of_range() {
        let mut session = VideoSession::new("abc", 1);
        session.begin_synchronizing(ClaimSet::new(60, vec![Claim::new(1.0, "a", 50, "")]));

        session.set_active_claim(Some(0));
        assert_eq!(session.active_claim(), Some(0));

        session.set_active_claim(Some(3));
        assert_eq!(session.active_claim(), None);
    }

    #[test]
    fn test_failed_state_serialization() {
        let state = SessionState::Failed {
            kind: FailureKind::NoTranscript,
            message: "No captions".to_string(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"status\":\"failed\""));
        assert!(json.contains("no_transcript"));
    }
}

//! Playback synchronization.
//!
//! Maps the live playback position onto the claim timeline. Resolution is
//! recomputed from scratch on every tick so seeks in either direction are
//! always correct; the previous index is only used to decide whether a
//! highlight change needs to be emitted.

use crate::domain::{Claim, VideoSession};

/// Default tolerance added to the playback position, in seconds
pub const DEFAULT_LOOKAHEAD_SECONDS: f64 = 2.0;

/// Index of the last claim with `timestamp <= current_time + lookahead`.
///
/// `claims` must be sorted ascending by timestamp; the scan stops at the
/// first claim past the threshold.
pub fn resolve_active(claims: &[Claim], current_time: f64, lookahead: f64) -> Option<usize> {
    let threshold = current_time + lookahead;
    claims
        .iter()
        .take_while(|claim| claim.timestamp <= threshold)
        .count()
        .checked_sub(1)
}

/// Emitted when the active claim changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightChange {
    pub previous: Option<usize>,
    pub current: Option<usize>,
}

/// Resolves the active claim and reports transitions.
#[derive(Debug, Clone)]
pub struct PlaybackSynchronizer {
    lookahead: f64,
    reported: Option<usize>,
}

impl Default for PlaybackSynchronizer {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKAHEAD_SECONDS)
    }
}

impl PlaybackSynchronizer {
    pub fn new(lookahead: f64) -> Self {
        Self {
            lookahead,
            reported: None,
        }
    }

    /// Last index reported through [`PlaybackSynchronizer::update`]
    pub fn reported(&self) -> Option<usize> {
        self.reported
    }

    pub fn resolve_active(&self, claims: &[Claim], current_time: f64) -> Option<usize> {
        resolve_active(claims, current_time, self.lookahead)
    }

    /// Resolve and return a change only when the index differs from the last report.
    pub fn update(&mut self, claims: &[Claim], current_time: f64) -> Option<HighlightChange> {
        let current = self.resolve_active(claims, current_time);
        if current == self.reported {
            return None;
        }

        let change = HighlightChange {
            previous: self.reported,
            current,
        };
        self.reported = current;
        Some(change)
    }

    /// Sync a session's active claim with the playback position.
    ///
    /// The session's own index is the reference, so a synchronizer shared
    /// across sessions can never carry a stale index into a new one.
    pub fn sync_session(&mut self, session: &mut VideoSession, current_time: f64) -> Option<HighlightChange> {
        self.reported = session.active_claim();
        let change = self.update(session.claims(), current_time)?;
        session.set_active_claim(change.current);
        Some(change)
    }

    /// Forget the last report
    pub fn reset(&mut self) {
        self.reported = None;
    }
}

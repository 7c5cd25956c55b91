//! Playback Synchronization Integration Tests
//!
//! Tests for active-claim resolution, seeks and highlight emission.

use veritrack::core::{resolve_active, HighlightChange, PlaybackSynchronizer};
use veritrack::domain::Claim;

fn claims_at(timestamps: &[f64]) -> Vec<Claim> {
    timestamps
        .iter()
        .map(|t| Claim::new(*t, format!("claim at {}", t), 50, "reason"))
        .collect()
}

#[test]
fn test_seek_invariance() {
    let claims = claims_at(&[5.0, 20.0, 45.0]);
    let sync = PlaybackSynchronizer::new(2.0);

    assert_eq!(sync.resolve_active(&claims, 30.0), Some(1));
    // Seek backwards: the earlier answer must not leak in
    assert_eq!(sync.resolve_active(&claims, 3.0), None);
    // And forward past the end
    assert_eq!(sync.resolve_active(&claims, 600.0), Some(2));
}

#[test]
fn test_lookahead_boundary() {
    let claims = claims_at(&[10.0]);

    assert_eq!(resolve_active(&claims, 7.9, 2.0), None);
    assert_eq!(resolve_active(&claims, 8.0, 2.0), Some(0));
}

#[test]
fn test_resolution_is_idempotent() {
    let claims = claims_at(&[5.0, 20.0, 45.0]);
    let mut sync = PlaybackSynchronizer::new(2.0);

    assert_eq!(sync.resolve_active(&claims, 21.0), sync.resolve_active(&claims, 21.0));

    let first = sync.update(&claims, 21.0);
    let second = sync.update(&claims, 21.0);

    assert_eq!(
        first,
        Some(HighlightChange {
            previous: None,
            current: Some(1)
        })
    );
    assert_eq!(second, None);
    assert_eq!(sync.reported(), Some(1));
}

#[test]
fn test_seek_back_emits_clear() {
    let claims = claims_at(&[5.0, 20.0, 45.0]);
    let mut sync = PlaybackSynchronizer::new(2.0);

    sync.update(&claims, 30.0);
    assert_eq!(
        sync.update(&claims, 1.0),
        Some(HighlightChange {
            previous: Some(1),
            current: None
        })
    );
}

#[test]
fn test_jitter_within_claim_is_silent() {
    let claims = claims_at(&[5.0, 20.0, 45.0]);
    let mut sync = PlaybackSynchronizer::new(2.0);

    sync.update(&claims, 25.0);
    let emitted: Vec<_> = [25.2, 24.9, 25.4, 30.0, 29.7]
        .iter()
        .filter_map(|t| sync.update(&claims, *t))
        .collect();
    assert!(emitted.is_empty());
}

#[test]
fn test_duplicate_timestamps_pick_last() {
    let claims = claims_at(&[5.0, 5.0, 9.0]);
    assert_eq!(resolve_active(&claims, 4.0, 2.0), Some(1));
}

#[test]
fn test_restart_from_zero() {
    let claims = claims_at(&[0.0, 20.0]);
    let mut sync = PlaybackSynchronizer::default();

    sync.update(&claims, 50.0);
    let change = sync.update(&claims, 0.0).unwrap();
    assert_eq!(change.current, Some(0));
}

//! Session controller.
//!
//! Drives one video view at a time through
//! `Idle → Extracting → Normalizing → Synchronizing`, with `Failed` ending
//! the pipeline for the current identity until the next identity change.
//!
//! Stage work runs in spawned tasks; their outcomes come back over a
//! channel tagged with the session generation that requested them. An
//! outcome for any generation other than the live one is dropped, which is
//! all the cancellation a superseded video needs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::domain::{ClaimSet, FailureKind, SessionState, Transcript, VideoSession};
use crate::presentation::PresentationSurface;

use super::extractor::{ExtractionFailure, TranscriptExtractor};
use super::normalizer::{ClaimNormalizer, NormalizationFailure};
use super::synchronizer::PlaybackSynchronizer;

pub const STATUS_READY: &str = "Ready";
pub const STATUS_NEW_VIDEO: &str = "New video detected. Analyzing...";
pub const STATUS_ANALYZING: &str = "Analysing facts with AI...";
pub const STATUS_COMPLETE: &str = "Analysis complete.";

/// Reports which video the host is currently showing
pub trait PageHost: Send + Sync {
    fn current_video_id(&self) -> Option<String>;
}

/// The playback element: position in seconds and a seek actuator
pub trait PlaybackClock: Send + Sync {
    fn current_time(&self) -> f64;

    fn seek_to(&self, position: f64);
}

/// Result of a stage, tagged with the generation that started it
#[derive(Debug)]
pub enum StageOutcome {
    Extracted {
        generation: u64,
        result: Result<Transcript, ExtractionFailure>,
    },
    Normalized {
        generation: u64,
        result: Result<ClaimSet, NormalizationFailure>,
    },
}

impl StageOutcome {
    pub fn generation(&self) -> u64 {
        match self {
            StageOutcome::Extracted { generation, .. } | StageOutcome::Normalized { generation, .. } => {
                *generation
            }
        }
    }
}

/// Requests sent to a running controller
#[derive(Debug, Clone, Copy)]
pub enum ControllerCommand {
    /// Click-to-seek on a claim
    SeekToClaim(usize),
    Stop,
}

/// Owns the live session and the presentation surface
pub struct SessionController {
    host: Arc<dyn PageHost>,
    clock: Arc<dyn PlaybackClock>,
    extractor: Arc<TranscriptExtractor>,
    normalizer: Arc<ClaimNormalizer>,
    surface: Box<dyn PresentationSurface>,
    synchronizer: PlaybackSynchronizer,
    session: Option<VideoSession>,
    last_identity: Option<String>,
    generation: u64,
    status: String,
    outcome_tx: mpsc::UnboundedSender<StageOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<StageOutcome>,
}

impl SessionController {
    pub fn new(
        host: Arc<dyn PageHost>,
        clock: Arc<dyn PlaybackClock>,
        extractor: Arc<TranscriptExtractor>,
        normalizer: Arc<ClaimNormalizer>,
        mut surface: Box<dyn PresentationSurface>,
        lookahead_seconds: f64,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        surface.show();
        surface.set_status(STATUS_READY);

        Self {
            host,
            clock,
            extractor,
            normalizer,
            surface,
            synchronizer: PlaybackSynchronizer::new(lookahead_seconds),
            session: None,
            last_identity: None,
            generation: 0,
            status: STATUS_READY.to_string(),
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn session(&self) -> Option<&VideoSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(|s| s.state.clone())
            .unwrap_or(SessionState::Idle)
    }

    /// Last status line shown on the surface
    pub fn status(&self) -> &str {
        &self.status
    }

    /// One periodic check: heal the surface, then look for an identity change.
    pub fn tick(&mut self) -> bool {
        self.ensure_surface();
        self.check_identity()
    }

    /// Recreate and repaint the surface if the host destroyed it.
    pub fn ensure_surface(&mut self) {
        if self.surface.is_present() {
            return;
        }

        warn!("Presentation surface missing, recreating");
        self.surface.recreate();
        self.surface.show();
        self.repaint();
    }

    fn repaint(&mut self) {
        self.surface.set_status(&self.status);
        match &self.session {
            Some(session) => {
                self.surface
                    .set_overall_score(session.claim_set().map(|set| set.overall_score));
                self.surface.render_claims(session.claims());
                self.surface.set_active_claim(session.active_claim());
            }
            None => {
                self.surface.set_overall_score(None);
                self.surface.render_claims(&[]);
            }
        }
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.status = text.into();
        self.surface.set_status(&self.status);
    }

    /// Compare the host's identity with the recorded one; on change, drop
    /// all per-video state and start extraction. Returns true on change.
    pub fn check_identity(&mut self) -> bool {
        let identity = self.host.current_video_id();
        if identity == self.last_identity {
            return false;
        }

        self.last_identity = identity.clone();
        self.generation += 1;
        self.synchronizer.reset();

        match identity {
            Some(video_id) => {
                info!(%video_id, generation = self.generation, "New video detected");
                self.session = Some(VideoSession::new(video_id.clone(), self.generation));
                self.set_status(STATUS_NEW_VIDEO);
                self.surface.set_overall_score(None);
                self.surface.render_claims(&[]);
                self.surface.set_active_claim(None);
                self.spawn_extraction(self.generation, video_id);
            }
            None => {
                info!("No video on page");
                self.session = None;
                self.set_status(STATUS_READY);
                self.surface.set_overall_score(None);
                self.surface.render_claims(&[]);
            }
        }
        true
    }

    fn spawn_extraction(&self, generation: u64, video_id: String) {
        let extractor = Arc::clone(&self.extractor);
        let tx = self.outcome_tx.clone();

        tokio::spawn(async move {
            let result = extractor.fetch(&video_id).await;
            let _ = tx.send(StageOutcome::Extracted { generation, result });
        });
    }

    fn spawn_normalization(&self, generation: u64, transcript: Transcript) {
        let normalizer = Arc::clone(&self.normalizer);
        let tx = self.outcome_tx.clone();

        tokio::spawn(async move {
            let result = normalizer.normalize(&transcript).await;
            let _ = tx.send(StageOutcome::Normalized { generation, result });
        });
    }

    /// Wait for the next stage outcome
    pub async fn next_outcome(&mut self) -> Option<StageOutcome> {
        self.outcome_rx.recv().await
    }

    /// Apply a stage outcome to the live session.
    ///
    /// Returns false when the outcome was discarded as stale.
    #[instrument(skip(self, outcome), fields(generation = outcome.generation()))]
    pub fn apply(&mut self, outcome: StageOutcome) -> bool {
        let live = self.session.as_ref().map(|s| (s.generation, s.state.clone()));

        match (outcome, live) {
            (StageOutcome::Extracted { generation, result }, Some((live_gen, SessionState::Extracting)))
                if generation == live_gen =>
            {
                self.on_extracted(result);
                true
            }
            (StageOutcome::Normalized { generation, result }, Some((live_gen, SessionState::Normalizing)))
                if generation == live_gen =>
            {
                self.on_normalized(result);
                true
            }
            (outcome, _) => {
                debug!(
                    live = self.session.as_ref().map(|s| s.generation),
                    "Discarding stale stage outcome"
                );
                drop(outcome);
                false
            }
        }
    }

    fn on_extracted(&mut self, result: Result<Transcript, ExtractionFailure>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match result {
            Ok(transcript) => {
                info!(video_id = %session.video_id, segments = transcript.len(), "Transcript ready");
                session.begin_normalizing(transcript.clone());
                let generation = session.generation;
                self.set_status(STATUS_ANALYZING);
                self.spawn_normalization(generation, transcript);
            }
            Err(failure) => {
                warn!(video_id = %session.video_id, error = %failure, "No transcript");
                session.fail(FailureKind::NoTranscript, failure.to_string());
                self.set_status(format!("No transcript found: {}", failure));
            }
        }
    }

    fn on_normalized(&mut self, result: Result<ClaimSet, NormalizationFailure>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match result {
            Ok(claim_set) => {
                info!(
                    video_id = %session.video_id,
                    claims = claim_set.claims.len(),
                    elapsed_ms = session.elapsed().num_milliseconds(),
                    "Synchronizing claims with playback"
                );
                session.begin_synchronizing(claim_set);
                self.set_status(STATUS_COMPLETE);
                self.repaint();
                let position = self.clock.current_time();
                self.on_time_update(position);
            }
            Err(failure) => {
                warn!(video_id = %session.video_id, error = %failure, "Analysis failed");
                session.fail(FailureKind::AnalysisError, failure.to_string());
                self.set_status(format!("Error: {}", failure));
            }
        }
    }

    /// Clock notification: re-resolve the active claim. Never starts stages.
    pub fn on_time_update(&mut self, current_time: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.state != SessionState::Synchronizing {
            return;
        }

        if let Some(change) = self.synchronizer.sync_session(session, current_time) {
            debug!(previous = ?change.previous, current = ?change.current, current_time, "Active claim changed");
            self.surface.set_active_claim(change.current);
        }
    }

    /// Seek playback to a claim's timestamp. Returns false for unknown claims.
    pub fn seek_to_claim(&mut self, index: usize) -> bool {
        let Some(timestamp) = self
            .session
            .as_ref()
            .and_then(|s| s.claims().get(index))
            .map(|c| c.timestamp)
        else {
            return false;
        };

        self.clock.seek_to(timestamp);
        self.on_time_update(timestamp);
        true
    }

    /// Run until stopped, driven by the identity poll interval, clock
    /// notifications and stage outcomes.
    pub async fn run(
        mut self,
        poll_interval: Duration,
        mut clock_updates: mpsc::Receiver<f64>,
        mut commands: mpsc::Receiver<ControllerCommand>,
    ) -> Self {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(poll_ms = poll_interval.as_millis() as u64, "Session controller running");

        loop {
            let event = tokio::select! {
                _ = ticker.tick() => LoopEvent::Tick,
                Some(outcome) = self.outcome_rx.recv() => LoopEvent::Outcome(outcome),
                Some(position) = clock_updates.recv() => LoopEvent::Clock(position),
                command = commands.recv() => LoopEvent::Command(command.unwrap_or(ControllerCommand::Stop)),
            };

            match event {
                LoopEvent::Tick => {
                    self.tick();
                }
                LoopEvent::Outcome(outcome) => {
                    self.apply(outcome);
                }
                LoopEvent::Clock(position) => self.on_time_update(position),
                LoopEvent::Command(ControllerCommand::SeekToClaim(index)) => {
                    if !self.seek_to_claim(index) {
                        warn!(index, "No such claim");
                    }
                }
                LoopEvent::Command(ControllerCommand::Stop) => {
                    info!("Session controller stopping");
                    break;
                }
            }
        }

        self
    }

    /// Spawn [`SessionController::run`] and return a handle to control it
    pub fn spawn(self, poll_interval: Duration, clock_updates: mpsc::Receiver<f64>) -> ControllerHandle {
        let (command_tx, command_rx) = mpsc::channel(16);
        let task = tokio::spawn(self.run(poll_interval, clock_updates, command_rx));

        ControllerHandle { command_tx, task }
    }
}

enum LoopEvent {
    Tick,
    Outcome(StageOutcome),
    Clock(f64),
    Command(ControllerCommand),
}

/// Handle to a spawned controller
pub struct ControllerHandle {
    command_tx: mpsc::Sender<ControllerCommand>,
    task: JoinHandle<SessionController>,
}

impl ControllerHandle {
    pub async fn seek_to_claim(&self, index: usize) -> anyhow::Result<()> {
        self.command_tx
            .send(ControllerCommand::SeekToClaim(index))
            .await
            .map_err(|_| anyhow::anyhow!("Session controller is not running"))
    }

    /// Stop the controller and get it back
    pub async fn stop(self) -> anyhow::Result<SessionController> {
        let _ = self.command_tx.send(ControllerCommand::Stop).await;
        Ok(self.task.await?)
    }
}

//! Simulated playback host for `veritrack watch`.
//!
//! Stands in for the browser page: holds the current video identity, a
//! clock that advances in real time from the last seek, and emits position
//! notifications at a fixed cadence.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::adapters::youtube::parse_video_id;
use crate::core::{PageHost, PlaybackClock};

#[derive(Debug)]
struct PlayerState {
    video_id: Option<String>,
    position: f64,
    anchored_at: Instant,
}

/// Host page plus video element, driven from stdin
#[derive(Debug)]
pub struct SimulatedPlayer {
    state: Mutex<PlayerState>,
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlayerState {
                video_id: None,
                position: 0.0,
                anchored_at: Instant::now(),
            }),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut PlayerState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Navigate to another video; playback restarts at 0
    pub fn open(&self, video_id: impl Into<String>) {
        let video_id = video_id.into();
        self.with_state(|s| {
            s.video_id = Some(video_id);
            s.position = 0.0;
            s.anchored_at = Instant::now();
        });
    }

    /// Leave the watch page
    pub fn close(&self) {
        self.with_state(|s| s.video_id = None);
    }

    /// Emit the current position every `every` until the receiver goes away
    pub fn spawn_ticker(self: std::sync::Arc<Self>, every: Duration, tx: mpsc::Sender<f64>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if self.with_state(|s| s.video_id.is_none()) {
                    continue;
                }
                if tx.send(self.current_time()).await.is_err() {
                    break;
                }
            }
        })
    }
}

impl PageHost for SimulatedPlayer {
    fn current_video_id(&self) -> Option<String> {
        self.with_state(|s| s.video_id.clone())
    }
}

impl PlaybackClock for SimulatedPlayer {
    fn current_time(&self) -> f64 {
        self.with_state(|s| s.position + s.anchored_at.elapsed().as_secs_f64())
    }

    fn seek_to(&self, position: f64) {
        self.with_state(|s| {
            s.position = position.max(0.0);
            s.anchored_at = Instant::now();
        });
    }
}

/// A line typed at the `watch` prompt
#[derive(Debug, Clone, PartialEq)]
pub enum WatchCommand {
    Open(String),
    Close,
    Seek(f64),
    Claim(usize),
    Quit,
}

impl WatchCommand {
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };
        let arg = parts.next();

        let command = match (verb, arg) {
            ("open", Some(video)) => WatchCommand::Open(
                parse_video_id(video).with_context(|| format!("Not a video URL or id: {}", video))?,
            ),
            ("close", None) => WatchCommand::Close,
            ("seek", Some(seconds)) => {
                let seconds: f64 = seconds
                    .parse()
                    .with_context(|| format!("Invalid position: {}", seconds))?;
                if !seconds.is_finite() || seconds < 0.0 {
                    anyhow::bail!("Position must be a non-negative number");
                }
                WatchCommand::Seek(seconds)
            }
            ("claim", Some(index)) => WatchCommand::Claim(
                index
                    .parse()
                    .with_context(|| format!("Invalid claim number: {}", index))?,
            ),
            ("quit" | "exit", None) => WatchCommand::Quit,
            _ => anyhow::bail!(
                "Unknown command '{}'. Use: open <video>, close, seek <seconds>, claim <n>, quit",
                line.trim()
            ),
        };
        Ok(Some(command))
    }
}

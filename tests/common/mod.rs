//! Fakes for the collaborator traits shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use veritrack::adapters::{CaptionSource, SourceError, Verifier, VerifierError};
use veritrack::core::{PageHost, PlaybackClock};
use veritrack::domain::Claim;
use veritrack::presentation::PresentationSurface;

/// Watch page embedding a caption descriptor that points at `track_url`
pub fn watch_page(video_id: &str, track_url: &str) -> String {
    format!(
        r#"<html><script>var ytInitialPlayerResponse = {{"responseContext":{{}},"captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":[{{"baseUrl":"{}","name":{{"simpleText":"English"}},"languageCode":"en"}}],"audioTracks":[]}}}},"videoDetails":{{"videoId":"{}","title":"Test"}}}};</script></html>"#,
        track_url, video_id
    )
}

/// Timed-text markup from `(start, dur, escaped text)` triples
pub fn track_markup(nodes: &[(&str, &str, &str)]) -> String {
    let body: String = nodes
        .iter()
        .map(|(start, dur, text)| format!(r#"<text start="{}" dur="{}">{}</text>"#, start, dur, text))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?><transcript>{}</transcript>"#,
        body
    )
}

/// Serves pages and tracks from memory
#[derive(Default)]
pub struct FakeSource {
    pages: HashMap<String, String>,
    tracks: HashMap<String, String>,
    pub track_requests: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a video whose single track has the given markup
    pub fn with_video(mut self, video_id: &str, markup: String) -> Self {
        let url = format!("https://captions.test/{}", video_id);
        self.pages
            .insert(video_id.to_string(), watch_page(video_id, &url));
        self.tracks.insert(url, markup);
        self
    }

    /// Register a raw page without any track behind it
    pub fn with_page(mut self, video_id: &str, page: &str) -> Self {
        self.pages.insert(video_id.to_string(), page.to_string());
        self
    }
}

#[async_trait]
impl CaptionSource for FakeSource {
    async fn fetch_watch_page(&self, video_id: &str) -> Result<String, SourceError> {
        self.pages
            .get(video_id)
            .cloned()
            .ok_or_else(|| SourceError::Status {
                url: format!("https://watch.test/{}", video_id),
                status: 404,
            })
    }

    async fn fetch_track(&self, url: &str) -> Result<String, SourceError> {
        self.track_requests.fetch_add(1, Ordering::SeqCst);
        self.tracks.get(url).cloned().ok_or_else(|| SourceError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// Verifier answering by prompt content, optionally holding an answer back
/// until released
#[derive(Default)]
pub struct ScriptedVerifier {
    replies: Vec<(String, Result<String, String>)>,
    gates: HashMap<String, Arc<Notify>>,
    pub calls: AtomicUsize,
}

impl ScriptedVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts containing `marker` with `reply`
    pub fn reply(mut self, marker: &str, reply: &str) -> Self {
        self.replies
            .push((marker.to_string(), Ok(reply.to_string())));
        self
    }

    /// Fail prompts containing `marker` with a service error
    pub fn fail(mut self, marker: &str, message: &str) -> Self {
        self.replies
            .push((marker.to_string(), Err(message.to_string())));
        self
    }

    /// Hold answers for `marker` until the returned notify fires
    pub fn gate(&mut self, marker: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.insert(marker.to_string(), notify.clone());
        notify
    }
}

#[async_trait]
impl Verifier for ScriptedVerifier {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn verify(&self, prompt: &str) -> Result<String, VerifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        for (marker, gate) in &self.gates {
            if prompt.contains(marker.as_str()) {
                gate.notified().await;
            }
        }

        let reply = self
            .replies
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(VerifierError::Api {
                status: 429,
                message,
            }),
            None => Err(VerifierError::UnexpectedResponse("no scripted reply".to_string())),
        }
    }
}

/// Page whose identity the test sets directly
#[derive(Default)]
pub struct FakeHost {
    video_id: Mutex<Option<String>>,
}

impl FakeHost {
    pub fn navigate(&self, video_id: Option<&str>) {
        *self.video_id.lock().unwrap() = video_id.map(str::to_string);
    }
}

impl PageHost for FakeHost {
    fn current_video_id(&self) -> Option<String> {
        self.video_id.lock().unwrap().clone()
    }
}

/// Clock that only moves when told to
#[derive(Default)]
pub struct FakeClock {
    position: Mutex<f64>,
    pub seeks: Mutex<Vec<f64>>,
}

impl FakeClock {
    pub fn set(&self, position: f64) {
        *self.position.lock().unwrap() = position;
    }
}

impl PlaybackClock for FakeClock {
    fn current_time(&self) -> f64 {
        *self.position.lock().unwrap()
    }

    fn seek_to(&self, position: f64) {
        self.seeks.lock().unwrap().push(position);
        self.set(position);
    }
}

/// What a recording surface has been told
#[derive(Debug, Default, Clone)]
pub struct SurfaceLog {
    pub shown: usize,
    pub recreated: usize,
    pub statuses: Vec<String>,
    pub score: Option<u8>,
    pub claims: Vec<Claim>,
    pub active_changes: Vec<Option<usize>>,
}

impl SurfaceLog {
    pub fn last_status(&self) -> Option<&str> {
        self.statuses.last().map(String::as_str)
    }
}

/// Surface that records calls into a shared log and can be "destroyed"
#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub log: Arc<Mutex<SurfaceLog>>,
    pub present: Arc<AtomicBool>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            log: Arc::default(),
            present: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn snapshot(&self) -> SurfaceLog {
        self.log.lock().unwrap().clone()
    }

    pub fn destroy(&self) {
        self.present.store(false, Ordering::SeqCst);
    }
}

impl PresentationSurface for RecordingSurface {
    fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    fn recreate(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.recreated += 1;
        log.claims.clear();
        log.score = None;
        self.present.store(true, Ordering::SeqCst);
    }

    fn show(&mut self) {
        self.log.lock().unwrap().shown += 1;
    }

    fn set_status(&mut self, text: &str) {
        self.log.lock().unwrap().statuses.push(text.to_string());
    }

    fn set_overall_score(&mut self, score: Option<u8>) {
        self.log.lock().unwrap().score = score;
    }

    fn render_claims(&mut self, claims: &[Claim]) {
        self.log.lock().unwrap().claims = claims.to_vec();
    }

    fn set_active_claim(&mut self, index: Option<usize>) {
        self.log.lock().unwrap().active_changes.push(index);
    }
}

//! Adapter interfaces for external systems.
//!
//! Adapters hide the two network collaborators behind traits: the caption
//! source that serves watch pages and caption tracks, and the verifier that
//! fact-checks a rendered transcript.

pub mod gemini;
pub mod youtube;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ConfigurationError;

pub use gemini::GeminiVerifier;
pub use youtube::HttpCaptionSource;

/// Failure talking to the verifier service
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Verifier request failed: {0}")]
    Request(String),

    /// Non-success status; `message` is the service's own explanation when it gave one
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Unexpected verifier response: {0}")]
    UnexpectedResponse(String),
}

/// Failure fetching a page or caption track
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Claim-verification service: one prompt in, free-form model text out
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    async fn verify(&self, prompt: &str) -> Result<String, VerifierError>;
}

/// Where watch pages and caption tracks come from
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Raw HTML of the watch page for a video
    async fn fetch_watch_page(&self, video_id: &str) -> Result<String, SourceError>;

    /// Timed-text markup behind a caption track URL
    async fn fetch_track(&self, url: &str) -> Result<String, SourceError>;
}

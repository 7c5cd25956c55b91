//! YouTube caption source over HTTP.

use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use super::{CaptionSource, SourceError};
use crate::config::CaptionSettings;

/// Fetches watch pages and caption tracks with a plain HTTP client
pub struct HttpCaptionSource {
    watch_url_base: String,
    client: reqwest::Client,
}

impl Default for HttpCaptionSource {
    fn default() -> Self {
        Self::new(&CaptionSettings::default())
    }
}

impl HttpCaptionSource {
    pub fn new(settings: &CaptionSettings) -> Self {
        Self {
            watch_url_base: settings.watch_url_base.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Watch page URL for a video id
    fn watch_url(&self, video_id: &str) -> String {
        match Url::parse_with_params(&self.watch_url_base, &[("v", video_id)]) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}?v={}", self.watch_url_base, video_id),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| SourceError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| SourceError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        debug!(%url, bytes = body.len(), "Fetched");
        Ok(body)
    }
}

#[async_trait]
impl CaptionSource for HttpCaptionSource {
    async fn fetch_watch_page(&self, video_id: &str) -> Result<String, SourceError> {
        let url = self.watch_url(video_id);
        self.get_text(&url).await
    }

    async fn fetch_track(&self, url: &str) -> Result<String, SourceError> {
        self.get_text(url).await
    }
}

/// Extract a video identity from a watch URL (`v=` parameter) or a bare id.
pub fn parse_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(input) {
        if url.host_str() == Some("youtu.be") {
            return url
                .path_segments()
                .and_then(|mut segments| segments.next())
                .filter(|id| is_video_id(id))
                .map(str::to_string);
        }
        return url
            .query_pairs()
            .find(|(name, _)| name == "v")
            .map(|(_, value)| value.into_owned())
            .filter(|id| is_video_id(id));
    }

    is_video_id(input).then(|| input.to_string())
}

fn is_video_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= 64
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

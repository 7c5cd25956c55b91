//! Transcript extraction from a watch page.
//!
//! The watch page embeds the player configuration as a large inline script.
//! The caption descriptor is cut out of it between two known markers and
//! parsed on its own; the chosen track's timed-text markup is then fetched
//! and decoded into segments.
//!
//! Every failure here is an expected outcome (plenty of videos have no
//! captions) and comes back as an [`ExtractionFailure`], never a panic and
//! never a partially filled transcript.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::adapters::{CaptionSource, SourceError};
use crate::domain::{TimedSegment, Transcript};

/// Marker immediately before the caption descriptor
const DESCRIPTOR_START: &str = "\"captions\":";

/// Marker immediately after the caption descriptor
const DESCRIPTOR_END: &str = ",\"videoDetails";

/// Empty XML caption nodes (`<text .../>`, `<p .../>`)
static SELF_CLOSING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(text|p)(\s[^<>]*?)?\s*/>").expect("valid regex")
});

/// Why no transcript could be produced
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("Could not load the watch page: {0}")]
    PageFetch(SourceError),

    #[error("No captions found for this video")]
    NoCaptionDescriptor,

    #[error("Caption descriptor could not be parsed: {0}")]
    DescriptorParse(String),

    #[error("Video has no caption tracks")]
    NoTracks,

    #[error("Could not load the caption track: {0}")]
    TrackFetch(SourceError),

    #[error("Caption track could not be decoded: {0}")]
    MalformedTrack(String),

    #[error("Caption node {index} has invalid '{attribute}' value {value:?}")]
    MalformedSegment {
        index: usize,
        attribute: &'static str,
        value: String,
    },

    #[error("Caption track contains no timed text")]
    EmptyTrack,
}

/// Descriptor cut out of the watch page
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionsDescriptor {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

/// One caption track listed by the player
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    /// Retrieval address of the timed-text markup
    pub base_url: String,

    #[serde(default)]
    pub language_code: Option<String>,

    /// "asr" for auto-generated tracks
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Find the caption tracks embedded in a watch page.
pub fn locate_caption_tracks(page: &str) -> Result<Vec<CaptionTrack>, ExtractionFailure> {
    let (_, after) = page
        .split_once(DESCRIPTOR_START)
        .ok_or(ExtractionFailure::NoCaptionDescriptor)?;

    let slice = after.split(DESCRIPTOR_END).next().unwrap_or(after);
    let slice = slice.replace('\n', "");

    let descriptor: CaptionsDescriptor = serde_json::from_str(&slice)
        .map_err(|e| ExtractionFailure::DescriptorParse(e.to_string()))?;

    let tracks = descriptor
        .player_captions_tracklist_renderer
        .map(|r| r.caption_tracks)
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(ExtractionFailure::NoTracks);
    }
    Ok(tracks)
}

/// Pick a track: first match in preference order, otherwise the first track.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], preferred: &[String]) -> Option<&'a CaptionTrack> {
    preferred
        .iter()
        .find_map(|lang| {
            tracks.iter().find(|t| {
                t.language_code
                    .as_deref()
                    .is_some_and(|code| code.eq_ignore_ascii_case(lang))
            })
        })
        .or_else(|| tracks.first())
}

/// Decode timed-text markup into segments.
///
/// Understands the classic `<text start=".." dur="..">` format (seconds) and
/// falls back to format 3 `<p t=".." d="..">` (milliseconds). A single
/// malformed node fails the whole track.
pub fn parse_timed_text(markup: &str) -> Result<Vec<TimedSegment>, ExtractionFailure> {
    let document = Html::parse_fragment(&expand_empty_nodes(markup));

    let segments = decode_nodes(&document, "text", ("start", "dur"), 1.0)?;
    let segments = if segments.is_empty() {
        decode_nodes(&document, "p[t]", ("t", "d"), 1000.0)?
    } else {
        segments
    };

    if segments.is_empty() {
        return Err(ExtractionFailure::EmptyTrack);
    }
    Ok(segments)
}

/// Rewrite `<text a="1"/>` as `<text a="1"></text>`.
///
/// The markup is XML, but the HTML parser ignores the self-closing slash on
/// unknown elements and would nest every later node inside an empty one.
fn expand_empty_nodes(markup: &str) -> std::borrow::Cow<'_, str> {
    SELF_CLOSING_RE.replace_all(markup, "<${1}${2}></${1}>")
}

fn decode_nodes(
    document: &Html,
    selector: &str,
    (start_attr, dur_attr): (&'static str, &'static str),
    units_per_second: f64,
) -> Result<Vec<TimedSegment>, ExtractionFailure> {
    let selector =
        Selector::parse(selector).map_err(|e| ExtractionFailure::MalformedTrack(e.to_string()))?;

    document
        .select(&selector)
        .enumerate()
        .map(|(index, node)| {
            let start = match node.value().attr(start_attr) {
                Some(raw) => parse_seconds(raw, index, start_attr)?,
                None => {
                    return Err(ExtractionFailure::MalformedSegment {
                        index,
                        attribute: start_attr,
                        value: String::new(),
                    })
                }
            };
            // Some tracks omit the duration on their final node
            let duration = match node.value().attr(dur_attr) {
                Some(raw) => parse_seconds(raw, index, dur_attr)?,
                None => 0.0,
            };

            Ok(TimedSegment::new(
                start / units_per_second,
                duration / units_per_second,
                node_text(node),
            ))
        })
        .collect()
}

fn parse_seconds(raw: &str, index: usize, attribute: &'static str) -> Result<f64, ExtractionFailure> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(ExtractionFailure::MalformedSegment {
            index,
            attribute,
            value: raw.to_string(),
        }),
    }
}

/// Node text with entities decoded and whitespace collapsed
fn node_text(node: ElementRef<'_>) -> String {
    let text: String = node.text().collect();
    let text = decode_entities(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve entities left over after the parser's own decoding.
///
/// Caption tracks routinely escape twice (`&amp;#39;`), so one parse leaves
/// `&#39;` behind.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') || text.contains('<') {
        return text.to_string();
    }
    Html::parse_fragment(text).root_element().text().collect()
}

/// Pulls transcripts for videos through a [`CaptionSource`].
pub struct TranscriptExtractor {
    source: Arc<dyn CaptionSource>,
    preferred_languages: Vec<String>,
}

impl TranscriptExtractor {
    pub fn new(source: Arc<dyn CaptionSource>, preferred_languages: Vec<String>) -> Self {
        Self {
            source,
            preferred_languages,
        }
    }

    /// Download the watch page for `video_id` and extract its transcript.
    #[instrument(skip(self))]
    pub async fn fetch(&self, video_id: &str) -> Result<Transcript, ExtractionFailure> {
        let page = self
            .source
            .fetch_watch_page(video_id)
            .await
            .map_err(ExtractionFailure::PageFetch)?;

        self.extract(&page, video_id).await
    }

    /// Extract the transcript from an already downloaded watch page.
    #[instrument(skip(self, page), fields(page_bytes = page.len()))]
    pub async fn extract(&self, page: &str, video_id: &str) -> Result<Transcript, ExtractionFailure> {
        let tracks = locate_caption_tracks(page)?;
        let track = select_track(&tracks, &self.preferred_languages)
            .ok_or(ExtractionFailure::NoTracks)?;

        debug!(
            tracks = tracks.len(),
            language = track.language_code.as_deref().unwrap_or("?"),
            auto_generated = track.is_auto_generated(),
            "Selected caption track"
        );

        let markup = self
            .source
            .fetch_track(&track.base_url)
            .await
            .map_err(ExtractionFailure::TrackFetch)?;

        let segments = parse_timed_text(&markup)?;
        info!(segments = segments.len(), "Transcript extracted");

        Ok(Transcript::new(video_id, segments))
    }
}

//! Claim normalization.
//!
//! Renders a transcript into a fact-checking prompt, sends it to the
//! verifier once, and turns the free-form reply into a validated
//! [`ClaimSet`]. The reply is untrusted: every field is type- and
//! range-checked, and a bad field fails the whole response with its path
//! (`claims[2].truth_score`) rather than being clamped or defaulted.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::adapters::{Verifier, VerifierError};
use crate::config::ConfigurationError;
use crate::domain::{Claim, ClaimSet, Transcript, MAX_SCORE};

/// Opening and closing markdown fences, with or without a language tag
static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("valid regex"));

const PROMPT_HEADER: &str = r#"You are a strict fact-checker. Analyze the following YouTube video transcript.
Identify distinct factual claims. For each claim, verify it against your knowledge base.
Return a JSON object with a "claims" array.
Each item in "claims" should have:
- "timestamp": number (start time in seconds)
- "text": string (the claim text)
- "truth_score": number (0-100, where 0 is false, 100 is true/verified)
- "reasoning": string (brief explanation)

Also include an "overall_score": number (0-100) for the whole video.

JSON ONLY. No markdown formatting.

Transcript:
"#;

/// Why a transcript could not be turned into claims
#[derive(Debug, Error)]
pub enum NormalizationFailure {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Transport, quota or service error, with the service's message
    #[error("{0}")]
    Verifier(String),

    #[error("Verifier response is not valid JSON: {0}")]
    MalformedResponse(String),

    #[error("Verifier response is missing '{field}'")]
    MissingField { field: String },

    #[error("Verifier response has invalid '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

impl NormalizationFailure {
    /// Path of the offending field, for field-level failures
    pub fn field(&self) -> Option<&str> {
        match self {
            NormalizationFailure::MissingField { field }
            | NormalizationFailure::InvalidField { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<VerifierError> for NormalizationFailure {
    fn from(error: VerifierError) -> Self {
        match error {
            VerifierError::Configuration(e) => NormalizationFailure::Configuration(e),
            other => NormalizationFailure::Verifier(other.to_string()),
        }
    }
}

/// Render segments as `[12.3s] text` lines.
///
/// With a budget (in characters, not bytes), whole trailing lines that
/// would exceed it are dropped.
pub fn render_transcript(transcript: &Transcript, max_chars: Option<usize>) -> String {
    let mut rendered = String::new();
    let mut rendered_chars = 0usize;
    let mut kept = 0usize;

    for segment in &transcript.segments {
        let line = format!("[{:.1}s] {}", segment.start, segment.text);
        let needed = line.chars().count() + usize::from(!rendered.is_empty());

        if let Some(limit) = max_chars {
            if rendered_chars + needed > limit {
                break;
            }
        }

        if !rendered.is_empty() {
            rendered.push('\n');
        }
        rendered.push_str(&line);
        rendered_chars += needed;
        kept += 1;
    }

    if kept < transcript.len() {
        warn!(
            kept,
            dropped = transcript.len() - kept,
            "Transcript truncated to fit prompt budget"
        );
    }

    rendered
}

/// Full verifier prompt around a rendered transcript
pub fn build_prompt(rendered_transcript: &str) -> String {
    format!("{}{}\n", PROMPT_HEADER, rendered_transcript)
}

/// Remove markdown code fences and surrounding whitespace
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE_RE.replace_all(raw, "").trim().to_string()
}

/// Slice from the first `{` to the last `}`
fn isolate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> NormalizationFailure {
    NormalizationFailure::InvalidField {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn required<'a>(object: &'a Map<String, Value>, key: &str, field: &str) -> Result<&'a Value, NormalizationFailure> {
    object.get(key).ok_or_else(|| NormalizationFailure::MissingField {
        field: field.to_string(),
    })
}

/// Integral number in [0, 100]
fn parse_score(value: &Value, field: &str) -> Result<u8, NormalizationFailure> {
    let number = value
        .as_f64()
        .ok_or_else(|| invalid(field, format!("expected a number, got {}", json_type(value))))?;

    if number.fract() != 0.0 {
        return Err(invalid(field, format!("expected an integer, got {}", number)));
    }
    if !(0.0..=f64::from(MAX_SCORE)).contains(&number) {
        return Err(invalid(
            field,
            format!("{} is outside 0..={}", number, MAX_SCORE),
        ));
    }
    Ok(number as u8)
}

fn parse_claim(index: usize, value: &Value) -> Result<Claim, NormalizationFailure> {
    let path = |key: &str| format!("claims[{}].{}", index, key);

    let object = value.as_object().ok_or_else(|| {
        invalid(
            &format!("claims[{}]", index),
            format!("expected an object, got {}", json_type(value)),
        )
    })?;

    let field = path("timestamp");
    let timestamp_value = required(object, "timestamp", &field)?;
    let timestamp = timestamp_value
        .as_f64()
        .ok_or_else(|| invalid(&field, format!("expected a number, got {}", json_type(timestamp_value))))?;
    if !timestamp.is_finite() || timestamp < 0.0 {
        return Err(invalid(&field, format!("{} is not a valid offset", timestamp)));
    }

    let field = path("text");
    let text_value = required(object, "text", &field)?;
    let text = text_value
        .as_str()
        .ok_or_else(|| invalid(&field, format!("expected a string, got {}", json_type(text_value))))?;

    let field = path("truth_score");
    let truth_score = parse_score(required(object, "truth_score", &field)?, &field)?;

    let reasoning = match object.get("reasoning") {
        None | Some(Value::Null) => "",
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            return Err(invalid(
                &path("reasoning"),
                format!("expected a string, got {}", json_type(other)),
            ))
        }
    };

    Ok(Claim::new(timestamp, text, truth_score, reasoning))
}

/// Clean, parse and validate a raw verifier reply.
///
/// Claims come back sorted ascending by timestamp.
pub fn parse_claim_set(raw: &str) -> Result<ClaimSet, NormalizationFailure> {
    let cleaned = strip_code_fences(raw);
    let body = isolate_object(&cleaned).ok_or_else(|| {
        NormalizationFailure::MalformedResponse("no JSON object found".to_string())
    })?;

    let value: Value = serde_json::from_str(body)
        .map_err(|e| NormalizationFailure::MalformedResponse(e.to_string()))?;
    let object = value.as_object().ok_or_else(|| {
        NormalizationFailure::MalformedResponse("top level is not an object".to_string())
    })?;

    let overall_score = parse_score(
        required(object, "overall_score", "overall_score")?,
        "overall_score",
    )?;

    let claims_value = required(object, "claims", "claims")?;
    let claims = claims_value
        .as_array()
        .ok_or_else(|| invalid("claims", format!("expected an array, got {}", json_type(claims_value))))?
        .iter()
        .enumerate()
        .map(|(index, item)| parse_claim(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    let mut claim_set = ClaimSet::new(overall_score, claims);
    claim_set.sort_claims();
    Ok(claim_set)
}

/// Turns transcripts into validated claim sets via a [`Verifier`].
pub struct ClaimNormalizer {
    verifier: Arc<dyn Verifier>,
    max_transcript_chars: Option<usize>,
}

impl ClaimNormalizer {
    pub fn new(verifier: Arc<dyn Verifier>) -> Self {
        Self {
            verifier,
            max_transcript_chars: None,
        }
    }

    /// Cap the rendered transcript at `limit` characters
    pub fn with_max_transcript_chars(mut self, limit: Option<usize>) -> Self {
        self.max_transcript_chars = limit;
        self
    }

    /// Verify a transcript. The verifier is called exactly once.
    #[instrument(skip(self, transcript), fields(video_id = %transcript.video_id, segments = transcript.len()))]
    pub async fn normalize(&self, transcript: &Transcript) -> Result<ClaimSet, NormalizationFailure> {
        let rendered = render_transcript(transcript, self.max_transcript_chars);
        let prompt = build_prompt(&rendered);

        info!(
            verifier = self.verifier.name(),
            chars = rendered.len(),
            "Requesting claim verification"
        );

        let raw = self.verifier.verify(&prompt).await?;
        let claim_set = parse_claim_set(&raw)?;

        info!(
            claims = claim_set.claims.len(),
            overall_score = claim_set.overall_score,
            "Claims verified"
        );
        Ok(claim_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimedSegment;

    fn transcript() -> Transcript {
        Transcript::new(
            "abc",
            vec![
                TimedSegment::new(0.0, 2.0, "The earth orbits the sun."),
                TimedSegment::new(2.3, 3.0, "It takes a year."),
            ],
        )
    }

    #[test]
    fn test_render_transcript() {
        assert_eq!(
            render_transcript(&transcript(), None),
            "[0.0s] The earth orbits the sun.\n[2.3s] It takes a year."
        );
    }

    #[test]
    fn test_render_transcript_budget_drops_whole_lines() {
        let rendered = render_transcript(&transcript(), Some(40));
        assert_eq!(rendered, "[0.0s] The earth orbits the sun.");
    }

    #[test]
    fn test_render_transcript_budget_counts_characters() {
        let transcript = Transcript::new(
            "abc",
            vec![
                TimedSegment::new(0.0, 1.0, "Ünïcödé"),
                TimedSegment::new(1.0, 1.0, "naïve"),
            ],
        );
        // 14 + 1 + 12 characters, 32 bytes
        let rendered = render_transcript(&transcript, Some(27));
        assert_eq!(rendered, "[0.0s] Ünïcödé\n[1.0s] naïve");
        assert_eq!(render_transcript(&transcript, Some(26)), "[0.0s] Ünïcödé");
    }

    #[test]
    fn test_prompt_contains_transcript() {
        let prompt = build_prompt("[0.0s] hi");
        assert!(prompt.contains("strict fact-checker"));
        assert!(prompt.ends_with("Transcript:\n[0.0s] hi\n"));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_prose_around_object_is_ignored() {
        let set = parse_claim_set("Here you go:\n{\"overall_score\": 40, \"claims\": []}\nThanks!")
            .unwrap();
        assert_eq!(set.overall_score, 40);
        assert!(set.claims.is_empty());
    }

    #[test]
    fn test_fractional_score_rejected() {
        let err = parse_claim_set(
            r#"{"overall_score": 50, "claims": [{"timestamp": 1, "text": "x", "truth_score": 50.5}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("claims[0].truth_score"));
    }

    #[test]
    fn test_missing_reasoning_is_empty() {
        let set = parse_claim_set(
            r#"{"overall_score": 50, "claims": [{"timestamp": 1, "text": "x", "truth_score": 50}]}"#,
        )
        .unwrap();
        assert_eq!(set.claims[0].reasoning, "");
    }

    #[test]
    fn test_negative_timestamp_rejected() {
        let err = parse_claim_set(
            r#"{"overall_score": 50, "claims": [{"timestamp": -3, "text": "x", "truth_score": 50}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("claims[0].timestamp"));
    }

    #[test]
    fn test_overall_score_required() {
        let err = parse_claim_set(r#"{"claims": []}"#).unwrap_err();
        assert!(matches!(err, NormalizationFailure::MissingField { .. }));
        assert_eq!(err.field(), Some("overall_score"));
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(
            parse_claim_set("I cannot help with that."),
            Err(NormalizationFailure::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_claim_set("{ not json }"),
            Err(NormalizationFailure::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_verifier_error_conversion() {
        let failure: NormalizationFailure = VerifierError::Api {
            status: 429,
            message: "Quota exceeded".to_string(),
        }
        .into();
        assert_eq!(failure.to_string(), "Quota exceeded");
    }
}

//! Gemini adapter for claim verification.
//!
//! Posts the prompt to `generateContent` and returns the first candidate's
//! text untouched; cleaning and validation happen in the normalizer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{Verifier, VerifierError};
use crate::config::{ConfigurationError, VerifierSettings, API_KEY_SETTING};
use crate::settings::SettingsStore;

/// Header carrying the API key, kept out of the URL
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini REST client
pub struct GeminiVerifier {
    settings: VerifierSettings,
    store: Arc<dyn SettingsStore>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl GeminiVerifier {
    /// Create a verifier reading its API key from `store` on every call
    pub fn new(settings: VerifierSettings, store: Arc<dyn SettingsStore>) -> Result<Self, VerifierError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| VerifierError::Request(e.to_string()))?;

        Ok(Self {
            settings,
            store,
            client,
        })
    }

    /// Build API URL for the configured model
    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.model
        )
    }

    async fn api_key(&self) -> Result<String, VerifierError> {
        let key = self
            .store
            .get(API_KEY_SETTING)
            .await
            .map_err(|e| ConfigurationError::Invalid(e.to_string()))?;

        match key {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigurationError::MissingCredential {
                key: API_KEY_SETTING.to_string(),
            }
            .into()),
        }
    }
}

/// Transport error text without the request URL
fn request_error(error: reqwest::Error) -> VerifierError {
    VerifierError::Request(error.without_url().to_string())
}

/// Pull the service's error message out of a failed response body
fn api_error_message(body: &str, status: u16) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("Gemini API request failed (HTTP {})", status))
}

/// Concatenate the text parts of the first candidate
fn first_candidate_text(response: GenerateResponse) -> Result<String, VerifierError> {
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| VerifierError::UnexpectedResponse("no candidates returned".to_string()))?;

    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() {
        return Err(VerifierError::UnexpectedResponse(
            "candidate contained no text".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl Verifier for GeminiVerifier {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, prompt), fields(model = %self.settings.model, prompt_chars = prompt.len()))]
    async fn verify(&self, prompt: &str) -> Result<String, VerifierError> {
        // Credential is checked before any request goes out
        let key = self.api_key().await?;

        let response = self
            .client
            .post(self.api_url())
            .header(API_KEY_HEADER, key.as_str())
            .json(&serde_json::json!({
                "contents": [{
                    "parts": [{ "text": prompt }]
                }]
            }))
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(request_error)?;

        if !status.is_success() {
            return Err(VerifierError::Api {
                status: status.as_u16(),
                message: api_error_message(&body, status.as_u16()),
            });
        }

        debug!(response_bytes = body.len(), "Verifier responded");

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| VerifierError::UnexpectedResponse(e.to_string()))?;
        first_candidate_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettingsStore;

    fn verifier(store: MemorySettingsStore) -> GeminiVerifier {
        GeminiVerifier::new(VerifierSettings::default(), Arc::new(store)).unwrap()
    }

    #[test]
    fn test_api_url() {
        let verifier = verifier(MemorySettingsStore::new());
        assert_eq!(
            verifier.api_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let verifier = verifier(MemorySettingsStore::new());
        let err = verifier.verify("prompt").await.unwrap_err();
        assert!(matches!(
            err,
            VerifierError::Configuration(ConfigurationError::MissingCredential { .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_expose_key() {
        let settings = VerifierSettings {
            api_base: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 5,
            ..VerifierSettings::default()
        };
        let store = MemorySettingsStore::with_api_key("SUPERSECRETKEY123");
        let verifier = GeminiVerifier::new(settings, Arc::new(store)).unwrap();

        let err = verifier.verify("prompt").await.unwrap_err();
        assert!(matches!(err, VerifierError::Request(_)));
        assert!(!err.to_string().contains("SUPERSECRETKEY123"));
    }

    #[test]
    fn test_api_error_message_prefers_service_text() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded for model"}}"#;
        assert_eq!(api_error_message(body, 429), "Quota exceeded for model");
        assert_eq!(
            api_error_message("<html>", 502),
            "Gemini API request failed (HTTP 502)"
        );
    }

    #[test]
    fn test_first_candidate_text() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"claims\":"},{"text":"[]}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_candidate_text(response).unwrap(), "{\"claims\":[]}");

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            first_candidate_text(empty),
            Err(VerifierError::UnexpectedResponse(_))
        ));
    }
}

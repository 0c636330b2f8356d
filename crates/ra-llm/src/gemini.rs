use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::generator::{GenerateError, Generator};
use crate::retry::with_retries;

const DEFAULT_MODEL: &str = "gemini-2.5-pro";
// The generateContent endpoint is slower than the chat-style APIs and its
// transport failures are transient often enough to be worth retrying.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_RETRIES: u32 = 2;

/// Backend for the Gemini generateContent API.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }

    /// Override the base URL (useful for testing with a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the JSON request body for generateContent.
    pub fn build_request_body(prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}],
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url,
            self.model,
            urlencoding::encode(&self.api_key)
        )
    }

    async fn generate_once(&self, prompt: &str, attempt: u32) -> Result<String, GenerateError> {
        tracing::debug!(model = %self.model, attempt, "gemini request");

        let resp = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&Self::build_request_body(prompt))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GenerateError::Api { status, message });
        }

        let body: GeminiResponse = resp
            .json()
            .await
            .map_err(|_| GenerateError::EmptyResponse)?;

        let combined = body
            .candidates
            .iter()
            .flat_map(|candidate| candidate.content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();

        if combined.is_empty() {
            return Err(GenerateError::EmptyResponse);
        }
        Ok(combined)
    }
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
}

#[derive(Deserialize, Default)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        with_retries(MAX_RETRIES, |attempt| self.generate_once(prompt, attempt)).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = GeminiGenerator::build_request_body("fix the bug");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "fix the bug");
    }

    #[test]
    fn api_key_is_url_encoded_in_endpoint() {
        let generator = GeminiGenerator::new("key with spaces&=", None);
        let endpoint = generator.endpoint();
        assert!(endpoint.contains("key=key%20with%20spaces%26%3D"));
        assert!(endpoint.contains(":generateContent"));
    }

    #[test]
    fn response_joins_candidate_parts() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "part one"}, {"text": "part two"}]}},
                {"content": {"parts": [{"text": "second candidate"}]}}
            ]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let combined: Vec<&str> = resp
            .candidates
            .iter()
            .flat_map(|c| c.content.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();
        assert_eq!(combined, vec!["part one", "part two", "second candidate"]);
    }

    #[test]
    fn empty_candidates_deserialize() {
        let resp: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.candidates.is_empty());
    }
}

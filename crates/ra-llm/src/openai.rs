use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::generator::{GenerateError, Generator};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend for the OpenAI Responses API.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: "https://api.openai.com".to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the JSON request body for the Responses API.
    pub fn build_request_body(model: &str, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": model,
            "input": prompt,
        })
    }
}

#[derive(Deserialize)]
struct OpenAiResponse {
    output_text: Option<String>,
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        "gpt"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let url = format!("{}/v1/responses", self.base_url);
        tracing::debug!(model = %self.model, "openai request");

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&Self::build_request_body(&self.model, prompt))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GenerateError::Api { status, message });
        }

        let body: OpenAiResponse = resp
            .json()
            .await
            .map_err(|_| GenerateError::EmptyResponse)?;

        match body.output_text {
            Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => Err(GenerateError::EmptyResponse),
        }
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
        let body = OpenAiGenerator::build_request_body("gpt-4o-mini", "summarize this");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["input"], "summarize this");
        assert!(body.get("messages").is_none());
    }

    #[test]
    fn response_missing_output_text_deserializes() {
        let resp: OpenAiResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.output_text.is_none());
    }

    #[tokio::test]
    async fn connection_failure_maps_to_network_error() {
        // Nothing listens on this port.
        let generator =
            OpenAiGenerator::new("key", None).with_base_url("http://127.0.0.1:19999");
        let err = generator.generate("hi").await.unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Network(_) | GenerateError::Timeout
        ));
    }
}

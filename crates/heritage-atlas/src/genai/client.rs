//! Gemini generation client.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use super::{GenAiError, TextGenerator};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub struct GeminiClient {
    api_key: String,
    model: String,
    http: Client,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            http,
        })
    }

    /// Build a client from the configured key or the `GEMINI_API_KEY`
    /// environment variable. `None` means generation is disabled and the
    /// queue will serve fallbacks only.
    pub fn from_key_or_env(configured: Option<&str>, model: &str) -> Option<Self> {
        let key = configured
            .map(str::to_string)
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty());

        match key {
            Some(key) => match Self::new(&key, model) {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::error!(error = %e, "failed to build generation client");
                    None
                }
            },
            None => {
                tracing::warn!("generation API key not found, AI summaries will use fallback content");
                None
            }
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        schema: Option<&JsonValue>,
    ) -> Result<String, GenAiError> {
        let mut generation_config = json!({ "temperature": 0.7 });
        if let Some(schema) = schema {
            generation_config["responseMimeType"] = json!("application/json");
            generation_config["responseSchema"] = schema.clone();
        }
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });

        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenAiError::Api(format!("request to {} timed out", endpoint))
                } else if e.is_connect() {
                    GenAiError::Api(format!("failed to connect to {}: {}", endpoint, e))
                } else {
                    GenAiError::Api(format!("request to {} failed: {}", endpoint, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || error.contains("RESOURCE_EXHAUSTED") {
                return Err(GenAiError::RateLimited(format!("HTTP {}: {}", status, error)));
            }
            return Err(GenAiError::Api(format!("API error ({}): {}", status, error)));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenAiError::Api(format!("failed to parse endpoint response: {}", e)))?;

        result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| GenAiError::Api("endpoint returned no candidates".into()))
    }
}

/// Response structures
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_disables_the_client() {
        std::env::remove_var(API_KEY_ENV);
        assert!(GeminiClient::from_key_or_env(None, DEFAULT_MODEL).is_none());
        assert!(GeminiClient::from_key_or_env(Some("  "), DEFAULT_MODEL).is_none());
    }

    #[test]
    fn candidate_payload_parses() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"xin chào"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.candidates[0].content.parts[0].text, "xin chào");
    }
}

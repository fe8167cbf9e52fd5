//! Generation-endpoint plumbing: the client trait, the FIFO request queue
//! with throttling and backoff, the per-key response cache, and the two
//! summary call sites built on top of them.

pub mod cache;
pub mod client;
pub mod queue;
pub mod summary;

pub use cache::ResponseCache;
pub use client::GeminiClient;
pub use queue::{GenerationRequest, QueuePolicy, RequestQueue};
pub use summary::SummaryService;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Failure classes of a generation call. Rate limits are the only retryable
/// class; everything else degrades to fallback content immediately.
#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("generation endpoint rate limited: {0}")]
    RateLimited(String),
    #[error("generation request failed: {0}")]
    Api(String),
}

impl GenAiError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GenAiError::RateLimited(_))
    }
}

/// A single call to the external language-model completion endpoint.
/// Passing a schema asks for a JSON-encoded structured response.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        schema: Option<&JsonValue>,
    ) -> Result<String, GenAiError>;
}

/// Strip the markdown code-fence wrapper the endpoint sometimes adds around
/// JSON payloads.
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        // Drop the info string ("json") up to the first newline.
        body = rest.split_once('\n').map(|(_, tail)| tail).unwrap_or("");
        body = body.trim_end();
        if let Some(inner) = body.strip_suffix("```") {
            body = inner;
        }
        body = body.trim();
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let fenced = "```json\n{\"a\":1}\n```";
        assert_eq!(strip_code_fence(fenced), "{\"a\":1}");
    }

    #[test]
    fn leaves_bare_text_alone() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }
}

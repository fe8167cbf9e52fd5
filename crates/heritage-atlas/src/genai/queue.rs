//! FIFO request queue for the generation endpoint.
//!
//! Guarantees at most one outstanding generation call at a time, a fixed
//! throttle interval between consecutive calls, and bounded
//! exponential-backoff retries on rate-limit errors. Every request resolves
//! to a value exactly once: failures degrade to the request's fallback, never
//! to an error the caller has to handle.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;

use super::TextGenerator;

/// Timing and retry policy for the queue worker.
#[derive(Debug, Clone)]
pub struct QueuePolicy {
    /// Minimum spacing between the end of one call and the start of the next,
    /// regardless of how fast the call itself was.
    pub throttle: Duration,
    /// Total attempts for a rate-limited request, first call included.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_jitter: Duration,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            throttle: Duration::from_millis(1_500),
            max_attempts: 5,
            initial_backoff: Duration::from_secs(10),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl From<&crate::config::GenAiConfig> for QueuePolicy {
    fn from(cfg: &crate::config::GenAiConfig) -> Self {
        Self {
            throttle: Duration::from_millis(cfg.throttle_ms),
            max_attempts: cfg.max_attempts,
            initial_backoff: Duration::from_millis(cfg.initial_backoff_ms),
            max_jitter: Duration::from_millis(cfg.max_jitter_ms),
        }
    }
}

/// One unit of queued generation work. `complete` is invoked exactly once:
/// with `Some(raw_text)` when the endpoint answered, or `None` when the
/// request degraded to its fallback.
pub struct GenerationRequest {
    pub id: String,
    pub prompt: String,
    pub schema: Option<JsonValue>,
    complete: Box<dyn FnOnce(Option<String>) + Send>,
}

impl GenerationRequest {
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        schema: Option<JsonValue>,
        complete: impl FnOnce(Option<String>) + Send + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            schema,
            complete: Box::new(complete),
        }
    }
}

/// Handle to the queue worker. Cloning shares the same worker; submission
/// from any task is safe and preserves FIFO order per sender.
#[derive(Clone)]
pub struct RequestQueue {
    tx: mpsc::UnboundedSender<GenerationRequest>,
}

impl RequestQueue {
    /// Spawn the worker loop on the current runtime. `client: None` puts the
    /// queue in fallback-only mode (no credential configured): every request
    /// resolves its fallback immediately without a network call.
    pub fn spawn(client: Option<Arc<dyn TextGenerator>>, policy: QueuePolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(worker(rx, client, policy));
        Self { tx }
    }

    /// Append a unit of work. The caller already holds the result future via
    /// the response cache; a dead worker drops the request, which the cache's
    /// safety net resolves to the fallback.
    pub fn enqueue(&self, request: GenerationRequest) {
        if let Err(mpsc::error::SendError(request)) = self.tx.send(request) {
            tracing::error!(id = %request.id, "generation queue worker is gone, dropping request");
        }
    }
}

async fn worker(
    mut rx: mpsc::UnboundedReceiver<GenerationRequest>,
    client: Option<Arc<dyn TextGenerator>>,
    policy: QueuePolicy,
) {
    while let Some(request) = rx.recv().await {
        let Some(client) = client.as_deref() else {
            tracing::warn!(id = %request.id, "no generation client available, resolving fallback");
            (request.complete)(None);
            continue;
        };
        process_one(request, client, &policy).await;
        tokio::time::sleep(policy.throttle).await;
    }
}

/// Issue one request, retrying rate-limit failures with exponential backoff.
async fn process_one(request: GenerationRequest, client: &dyn TextGenerator, policy: &QueuePolicy) {
    let GenerationRequest {
        id,
        prompt,
        schema,
        complete,
    } = request;

    let mut attempt = 0u32;
    loop {
        match client.generate(&prompt, schema.as_ref()).await {
            Ok(text) => {
                complete(Some(text));
                return;
            }
            Err(err) if err.is_rate_limit() => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    tracing::error!(
                        id = %id,
                        attempts = attempt,
                        "max retries reached for rate-limited request, resolving fallback"
                    );
                    break;
                }
                let backoff =
                    policy.initial_backoff * 2u32.pow(attempt - 1) + jitter(policy.max_jitter);
                tracing::warn!(
                    id = %id,
                    attempt,
                    delay_ms = backoff.as_millis() as u64,
                    "rate limit hit, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(err) => {
                tracing::error!(id = %id, error = %err, "non-retryable generation error, resolving fallback");
                break;
            }
        }
    }
    complete(None);
}

fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max.as_millis() as u64))
}

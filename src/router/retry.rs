use crate::error::OrchestratorError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    /// Extra substrings (beyond the taxonomy's own `is_recoverable`) that
    /// mark an otherwise-fatal error retryable, lowercased. Sourced from
    /// `messageRetryPolicy.retryableErrors`.
    pub retryable_substrings: Vec<String>,
}

impl RetryPolicy {
    pub fn new(retry_attempts: u32, base_delay_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_attempts: retry_attempts,
            base_delay: Duration::from_millis(base_delay_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
            backoff_multiplier: crate::constants::DEFAULT_BACKOFF_MULTIPLIER,
            retryable_substrings: Vec::new(),
        }
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_retryable_substrings(mut self, substrings: Vec<String>) -> Self {
        self.retryable_substrings = substrings.into_iter().map(|s| s.to_lowercase()).collect();
        self
    }

    /// `delay = min(max_backoff, base * multiplier^attempt)`, attempt is
    /// 0-indexed counting retries (not the initial try).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let scaled = scaled.max(0.0).round() as u64;
        Duration::from_millis(scaled).min(self.max_backoff)
    }

    /// Primary classification: `OrchestratorError::kind()`. A configured
    /// substring list (plus a legacy default set) covers third-party errors
    /// surfaced as `Fatal`/`Internal` text that still describe a transient
    /// condition (timeouts, connection resets).
    fn is_retryable(&self, error: &OrchestratorError) -> bool {
        if error.is_recoverable() {
            return true;
        }
        if !matches!(error, OrchestratorError::Fatal(_) | OrchestratorError::Internal(_)) {
            return false;
        }
        let text = error.to_string().to_lowercase();
        let defaults = ["timed out", "connection reset", "temporarily unavailable"];
        defaults.iter().any(|marker| text.contains(marker))
            || self.retryable_substrings.iter().any(|marker| text.contains(marker.as_str()))
    }
}

/// Runs `operation`, retrying on retryable failures up to
/// `policy.max_attempts` additional times (so `retry_attempts=1` means two
/// total tries) with exponential backoff between attempts. Each attempt is
/// bounded by `attempt_timeout`; a timed-out attempt is cancelled and
/// classified retryable.
pub async fn with_retry<F, Fut, T>(
    policy: RetryPolicy,
    attempt_timeout: Duration,
    mut operation: F,
) -> Result<T, OrchestratorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OrchestratorError>>,
{
    let mut attempt = 0u32;
    loop {
        let outcome = tokio::time::timeout(attempt_timeout, operation()).await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(OrchestratorError::Timeout(attempt_timeout.as_millis() as u64)),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(error) if attempt < policy.max_attempts && policy.is_retryable(&error) => {
                let delay = policy.backoff_for(attempt);
                warn!(attempt, ?delay, error = %error, "retrying after transient failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                debug!(attempt, error = %error, "giving up, not retrying");
                return Err(error);
            }
        }
    }
}

use std::time::Duration;

use tracing::{debug, warn};

use super::inference::{InferenceClient, InferenceError};
use super::limiter::RateLimiter;

/// Exponential backoff for rate-limited inference calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Growth factor applied to each further retry
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `retry` (1-based): base_delay * multiplier^(retry-1)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exponent = retry.saturating_sub(1) as i32;
        Duration::from_millis((base_ms * self.multiplier.powi(exponent)) as u64)
    }

    /// Whether another attempt may follow `attempts_made` attempts
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

/// How a sequence of attempts ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceOutcome {
    /// The service produced text
    Generated(String),
    /// Every attempt was rate limited
    RateLimited,
    /// A non-retryable failure stopped the attempts
    Failed(InferenceError),
}

/// Run `prompt` through the limiter, retrying only rate-limited attempts
///
/// Each attempt takes its own permit; the backoff sleep holds none.
pub async fn call_with_retry(
    client: &dyn InferenceClient,
    limiter: &RateLimiter,
    policy: &RetryPolicy,
    prompt: &str,
) -> InferenceOutcome {
    let mut attempt = 0;
    loop {
        attempt += 1;

        let permit = limiter.acquire().await;
        let result = client.complete(prompt).await;
        drop(permit);

        match result {
            Ok(text) => {
                debug!("Inference succeeded on attempt {}", attempt);
                return InferenceOutcome::Generated(text);
            }
            Err(InferenceError::RateLimited) if policy.should_retry(attempt) => {
                let delay = policy.delay_for_retry(attempt);
                warn!(
                    "Inference rate limited (attempt {}/{}), retrying in {:?}",
                    attempt, policy.max_attempts, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(InferenceError::RateLimited) => {
                warn!("Inference rate limited after {} attempts", attempt);
                return InferenceOutcome::RateLimited;
            }
            Err(err) => {
                warn!("Inference failed on attempt {}: {}", attempt, err);
                return InferenceOutcome::Failed(err);
            }
        }
    }
}

//! Bounded retry with exponential backoff for transient provider errors.
//!
//! Listing calls inside a pagination loop are retried a bounded number of
//! times; exhaustion surfaces a definitive failure instead of stalling a
//! worker slot behind an endless sleep-and-retry loop.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, instrument};

use crate::api::ApiError;

/// Default maximum attempts per listing call (including the initial attempt).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default base delay for the first retry (2 seconds).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Default maximum delay cap (32 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Maximum jitter added to delays (500ms).
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Classification of provider call failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, 5xx server errors, connection refused.
    Transient,

    /// Permanent failure that won't succeed regardless of retries.
    ///
    /// Examples: 400/404/409 responses, undecodable payloads.
    Permanent,

    /// Server rate limiting (HTTP 429). Retries with backoff, preferring
    /// the server-supplied Retry-After delay when present.
    RateLimited,
}

/// Decision on whether to retry a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// Delay formula: `min(base_delay * multiplier^attempt, max_delay) + jitter`.
/// With defaults, delays are approximately 2s, 4s, 8s, 16s before the
/// attempt budget runs out.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Base delay for the first retry.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,

    /// Multiplier applied each attempt.
    backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a retry policy with custom settings.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Creates a policy with a custom attempt budget, defaults elsewhere.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Determines whether to retry a failed call.
    ///
    /// `attempt` is the attempt number that just failed (1-indexed).
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::Transient | FailureType::RateLimited => {}
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Calculates the delay for a retry attempt with backoff and jitter.
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = f64::from(self.backoff_multiplier);

        // attempt is 1-indexed; attempt 1 gets 1x the base delay, and an
        // out-of-contract attempt 0 is treated the same rather than panicking
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * multiplier.powf(exponent);

        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_ms as u64) + calculate_jitter()
    }
}

/// Generates random jitter between 0 and `MAX_JITTER` to avoid retry
/// thundering herds across concurrent enumeration tasks.
fn calculate_jitter() -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_ms = rng.gen_range(0..=MAX_JITTER.as_millis() as u64);
    Duration::from_millis(jitter_ms)
}

/// Classifies a provider error into a failure type for retry decisions.
///
/// 429 responses are rate limited; 408 and 5xx are transient; other 4xx
/// and decode failures are permanent. Network errors are transient unless
/// they smell like a TLS/certificate problem, which retrying won't fix.
pub fn classify_error(error: &ApiError) -> FailureType {
    match error {
        ApiError::HttpStatus { status, .. } => classify_http_status(*status),

        ApiError::Timeout { .. } => FailureType::Transient,

        ApiError::Network { source, .. } => {
            if is_tls_error(source) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }

        ApiError::Decode { .. } | ApiError::InvalidHeader { .. } => FailureType::Permanent,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 => FailureType::Transient,
        429 => FailureType::RateLimited,
        status if (400..500).contains(&status) => FailureType::Permanent,
        status if (500..600).contains(&status) => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

/// Checks if a reqwest error is a TLS/certificate error.
fn is_tls_error(error: &reqwest::Error) -> bool {
    let error_string = error.to_string().to_lowercase();
    error_string.contains("certificate")
        || error_string.contains("tls")
        || error_string.contains("ssl")
        || error_string.contains("handshake")
}

/// Extracts a server-mandated delay from a rate-limited error.
///
/// The provider sends Retry-After as integer seconds; anything else is
/// ignored in favor of the backoff delay.
fn retry_after_delay(error: &ApiError) -> Option<Duration> {
    let ApiError::HttpStatus {
        retry_after: Some(value),
        ..
    } = error
    else {
        return None;
    };
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Runs an async provider call under a retry policy.
///
/// The operation is re-issued while failures classify as retryable and the
/// attempt budget allows. The last error is returned once the budget is
/// exhausted or a permanent failure is seen.
///
/// # Errors
///
/// Returns the final [`ApiError`] when retries are exhausted or the failure
/// is not retryable.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    op: F,
) -> Result<T, ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let failure_type = classify_error(&error);
                let server_delay = if failure_type == FailureType::RateLimited {
                    retry_after_delay(&error)
                } else {
                    None
                };

                match policy.should_retry(failure_type, attempt) {
                    RetryDecision::Retry {
                        delay: backoff_delay,
                        attempt: next_attempt,
                    } => {
                        let delay = server_delay.unwrap_or(backoff_delay);
                        info!(
                            what,
                            attempt = next_attempt,
                            max_attempts = policy.max_attempts(),
                            delay_ms = delay.as_millis(),
                            using_retry_after = server_delay.is_some(),
                            error = %error,
                            "retrying provider call"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::DoNotRetry { reason } => {
                        debug!(what, %reason, "not retrying provider call");
                        return Err(error);
                    }
                }
            }
        }
    }
}

//! Retry policy engine shared by every resource wrapper.
//!
//! Classification is a pure function of the remote error and the number of
//! attempts already made, so the policy is testable without sleeping. The
//! runner drives the retry chain as an explicit loop over a first-class
//! operation closure; the attempt counter is the loop variable, bounded by
//! `RetryConfig::max_attempts`.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::RetryConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::models::Envelope;

/// HTTP-like statuses worth another attempt
const TRANSIENT_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Platform sub-codes worth another attempt regardless of status:
/// 20429 request-rate exceeded, 20500 internal platform error
const TRANSIENT_CODES: [u32; 2] = [20429, 20500];

/// Outcome of classifying one failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp { reason: GiveUpReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// Error class is not recoverable by retrying (not-found, auth, validation)
    Permanent,
    /// Attempt budget spent; error class no longer matters
    AttemptsExhausted,
}

/// Pure classification and backoff policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Decide what to do with a failed attempt. `attempts` counts prior
    /// tries: 0 on the first failure. Once the budget is spent, the answer
    /// is GiveUp for every error kind.
    pub fn decide(&self, error: &RemoteError, attempts: u32) -> RetryDecision {
        if attempts >= self.config.max_attempts {
            return RetryDecision::GiveUp {
                reason: GiveUpReason::AttemptsExhausted,
            };
        }
        if Self::is_transient(error) {
            RetryDecision::Retry {
                delay: self.backoff_delay(attempts),
            }
        } else {
            RetryDecision::GiveUp {
                reason: GiveUpReason::Permanent,
            }
        }
    }

    /// Rate limits, temporary platform unavailability, and network-level
    /// failures (status 0) are worth retrying; everything else is permanent.
    pub fn is_transient(error: &RemoteError) -> bool {
        if error.status == 0 {
            return true;
        }
        if TRANSIENT_STATUSES.contains(&error.status) {
            return true;
        }
        error
            .code
            .is_some_and(|code| TRANSIENT_CODES.contains(&code))
    }

    /// Deterministic exponential backoff: initial_delay * base^attempts,
    /// capped at max_delay. Jitter is applied separately at sleep time so
    /// this stays a pure function of the attempt count.
    pub fn backoff_delay(&self, attempts: u32) -> Duration {
        let base = self.config.initial_delay_ms as f64;
        let scaled = base * self.config.backoff_base.powi(attempts as i32);
        let capped = scaled.min(self.config.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// Spread concurrent retry chains apart by +/- jitter_factor
    fn jittered(&self, delay: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return delay;
        }
        let factor = rand::thread_rng()
            .gen_range(1.0 - self.config.jitter_factor..=1.0 + self.config.jitter_factor);
        Duration::from_millis((delay.as_millis() as f64 * factor) as u64)
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }
}

/// Drives one logical call through its retry chain and produces the
/// terminal envelope. The operation is passed as a closure taking the
/// current attempt count, so every re-invocation sees the same validated
/// parameters plus the incremented counter.
#[derive(Debug, Clone)]
pub struct RetryRunner {
    policy: RetryPolicy,
}

impl RetryRunner {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            policy: RetryPolicy::new(config),
        }
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Envelope<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let mut attempts: u32 = 0;
        loop {
            match call(attempts).await {
                Ok(payload) => {
                    if attempts > 0 {
                        tracing::info!(operation, attempts, "operation succeeded after retry");
                    }
                    return Envelope::success(payload);
                }
                Err(error) => match self.policy.decide(&error, attempts) {
                    RetryDecision::Retry { delay } => {
                        attempts += 1;
                        let delay = self.policy.jittered(delay);
                        tracing::warn!(
                            operation,
                            attempt = attempts,
                            delay_ms = delay.as_millis() as u64,
                            status = error.status,
                            code = error.code,
                            "transient remote failure, retrying"
                        );
                        sleep(delay).await;
                    }
                    RetryDecision::GiveUp { reason } => {
                        tracing::warn!(
                            operation,
                            attempts,
                            ?reason,
                            status = error.status,
                            "remote call failed permanently"
                        );
                        return Envelope::failure(&error);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 8,
            backoff_base: 2.0,
            jitter_factor: 0.0,
        }
    }

    fn rate_limited() -> RemoteError {
        RemoteError {
            status: 429,
            code: Some(20429),
            message: "Too many requests".to_string(),
        }
    }

    fn not_found() -> RemoteError {
        RemoteError {
            status: 404,
            code: Some(20404),
            message: "The requested resource was not found".to_string(),
        }
    }

    #[test]
    fn transient_errors_retry_below_the_ceiling() {
        let policy = RetryPolicy::new(fast_config());
        for attempts in 0..3 {
            match policy.decide(&rate_limited(), attempts) {
                RetryDecision::Retry { .. } => {}
                other => panic!("expected retry at attempt {attempts}, got {other:?}"),
            }
        }
    }

    #[test]
    fn every_error_gives_up_at_the_ceiling() {
        let policy = RetryPolicy::new(fast_config());
        assert_eq!(
            policy.decide(&rate_limited(), 3),
            RetryDecision::GiveUp {
                reason: GiveUpReason::AttemptsExhausted
            }
        );
        assert_eq!(
            policy.decide(&not_found(), 5),
            RetryDecision::GiveUp {
                reason: GiveUpReason::AttemptsExhausted
            }
        );
    }

    #[test]
    fn permanent_errors_never_retry() {
        let policy = RetryPolicy::new(fast_config());
        for error in [
            not_found(),
            RemoteError {
                status: 401,
                code: None,
                message: "Authentication failed".to_string(),
            },
            RemoteError {
                status: 400,
                code: Some(20001),
                message: "Invalid parameter".to_string(),
            },
        ] {
            assert_eq!(
                policy.decide(&error, 0),
                RetryDecision::GiveUp {
                    reason: GiveUpReason::Permanent
                }
            );
        }
    }

    #[test]
    fn network_failures_classify_as_transient() {
        assert!(RetryPolicy::is_transient(&RemoteError::network(
            "connection reset"
        )));
    }

    #[test]
    fn transient_code_overrides_non_transient_status() {
        let error = RemoteError {
            status: 200,
            code: Some(20429),
            message: "rate limited mid-stream".to_string(),
        };
        assert!(RetryPolicy::is_transient(&error));
    }

    #[test]
    fn backoff_is_deterministic_and_capped() {
        let policy = RetryPolicy::new(fast_config());
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(1));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(2));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(4));
        // 1 * 2^5 = 32, capped at 8
        assert_eq!(policy.backoff_delay(5), Duration::from_millis(8));
    }

    #[tokio::test]
    async fn runner_returns_success_without_retry_on_first_attempt() {
        init_logging();
        let runner = RetryRunner::new(fast_config());
        let calls = AtomicU32::new(0);

        let envelope = runner
            .run("test_op", |attempts| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    assert_eq!(attempts, 0);
                    Ok::<_, RemoteError>(42u32)
                }
            })
            .await;

        assert_eq!(envelope, Envelope::success(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn runner_threads_incremented_attempt_count_through_retries() {
        init_logging();
        let runner = RetryRunner::new(fast_config());
        let seen = std::sync::Mutex::new(Vec::new());

        let envelope = runner
            .run("test_op", |attempts| {
                seen.lock().unwrap().push(attempts);
                async move {
                    if attempts < 2 {
                        Err(rate_limited())
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert!(envelope.is_success());
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn runner_gives_up_after_budget_with_last_error_status() {
        let runner = RetryRunner::new(fast_config());
        let calls = AtomicU32::new(0);

        let envelope: Envelope<()> = runner
            .run("test_op", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(rate_limited()) }
            })
            .await;

        // initial attempt plus max_attempts retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(!envelope.is_success());
        assert_eq!(envelope.status(), 429);
    }

    #[tokio::test]
    async fn runner_fails_immediately_on_permanent_error() {
        let runner = RetryRunner::new(fast_config());
        let calls = AtomicU32::new(0);

        let envelope: Envelope<()> = runner
            .run("test_op", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(not_found()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(envelope.status(), 404);
    }
}

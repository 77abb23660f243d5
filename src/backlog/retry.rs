use std::future::Future;
use std::time::Duration;

use crate::telemetry;
use crate::youtube::{with_timeout, ApiError};

use super::quota::QuotaLedger;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(300),
        }
    }
}

/// Explicit retry state: attempts made so far and the delay before the next one.
#[derive(Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    attempts: u32,
    next_delay: Duration,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempts: 0, next_delay: policy.base_delay.min(policy.max_delay) }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Counts a new attempt; false once `max_attempts` is spent.
    pub fn begin_attempt(&mut self) -> bool {
        if self.attempts >= self.policy.max_attempts.max(1) {
            return false;
        }
        self.attempts += 1;
        true
    }

    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.policy.max_attempts.max(1)
    }

    /// Delay to wait now, never above `max_delay`. A server hint may stretch
    /// it but not past the cap.
    pub fn next_delay(&mut self, hint: Option<Duration>) -> Duration {
        let cap = self.policy.max_delay;
        let delay = hint.map_or(self.next_delay, |h| h.max(self.next_delay)).min(cap);
        let grown = Duration::try_from_secs_f64(self.next_delay.as_secs_f64() * self.policy.backoff_factor.max(1.0))
            .unwrap_or(cap);
        self.next_delay = grown.min(cap);
        delay
    }
}

/// Result of a quota-metered, retried remote call.
#[derive(Debug, PartialEq)]
pub enum Metered<T> {
    Done { value: T, attempts: u32 },
    /// Budget refused (locally or by the remote) before the call could land.
    Deferred { attempts: u32, last_error: Option<ApiError> },
    Failed { error: ApiError, attempts: u32 },
}

/// Issues `call` under the ledger: every attempt reserves `cost` first, and
/// only transient failures are retried, with exponential backoff.
pub async fn metered<T, F, Fut>(
    ledger: &QuotaLedger,
    cost: u64,
    policy: RetryPolicy,
    request_timeout: Duration,
    what: &str,
    mut call: F,
) -> Metered<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let log = telemetry::process();
    let mut backoff = Backoff::new(policy);
    let mut last_error: Option<ApiError> = None;

    while backoff.begin_attempt() {
        if ledger.is_exhausted() || !ledger.reserve(cost) {
            return Metered::Deferred { attempts: backoff.attempts() - 1, last_error };
        }

        match with_timeout(request_timeout, call()).await {
            Ok(value) => return Metered::Done { value, attempts: backoff.attempts() },
            Err(ApiError::QuotaExceeded) => {
                ledger.mark_exhausted();
                return Metered::Deferred { attempts: backoff.attempts(), last_error: Some(ApiError::QuotaExceeded) };
            }
            Err(err) if err.is_retryable() && backoff.has_attempts_left() => {
                let delay = backoff.next_delay(err.retry_after());
                log.warn_kv(
                    &format!("🔁 {what} failed ({err}); retrying in {delay:?}"),
                    [
                        ("call", what.to_string()),
                        ("attempt", backoff.attempts().to_string()),
                        ("delay_ms", delay.as_millis().to_string()),
                    ],
                );
                last_error = Some(err);
                tokio::time::sleep(delay).await;
            }
            Err(error) => return Metered::Failed { error, attempts: backoff.attempts() },
        }
    }

    // a retry is only granted while attempts remain
    Metered::Failed {
        error: last_error.unwrap_or(ApiError::Timeout),
        attempts: backoff.attempts(),
    }
}

//! Exponential backoff around the bridge step.
//!
//! Only failures whose [`FailureKind`](crate::error::FailureKind) is
//! retryable are resubmitted. Resubmission relies on the bridge service
//! deduplicating intents; the swap that produced the funds is never repeated.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::error::{BridgeError, PaymentFailure};
use crate::progress::RetryNotice;

/// Backoff parameters for the bridge step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait after the first failed attempt.
    pub base_delay: Duration,
    /// Total attempts, including the first.
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(10),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Multiplier applied to the delay after every failed attempt.
    pub const FACTOR: u32 = 2;

    /// Wait after failed attempt number `attempt` (1-based): `base × 2^(attempt−1)`.
    #[must_use]
    pub fn delay(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        Self::FACTOR
            .checked_pow(exponent)
            .and_then(|multiplier| self.base_delay.checked_mul(multiplier))
            .unwrap_or(Duration::MAX)
    }

    /// Backoff builder producing [`delay`](Self::delay) for each retry, without jitter or cap.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_factor(Self::FACTOR as f32)
            .with_max_times(self.max_attempts.saturating_sub(1))
            .without_max_delay()
    }
}

/// Runs `operation` under `policy`.
///
/// `on_retry` is called before every wait with the attempt that just failed.
/// A non-retryable error is returned as [`PaymentFailure::Bridge`] right away;
/// running out of attempts while still failing yields
/// [`PaymentFailure::NetworkCongested`].
///
/// # Errors
///
/// See above.
pub async fn retry_bridge<T, F, Fut, N>(
    policy: &RetryPolicy,
    operation: F,
    mut on_retry: N,
) -> Result<T, PaymentFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BridgeError>>,
    N: FnMut(RetryNotice, &BridgeError),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut failed = 0usize;

    let result = operation
        .retry(policy.backoff())
        .sleep(tokio::time::sleep)
        .when(|e: &BridgeError| e.kind.is_retryable())
        .notify(|e: &BridgeError, delay: Duration| {
            failed += 1;
            #[cfg(feature = "telemetry")]
            tracing::warn!(attempt = failed, ?delay, kind = %e.kind, "bridge attempt failed, retrying: {e}");
            on_retry(
                RetryNotice {
                    attempt: failed,
                    max_attempts,
                    delay,
                },
                e,
            );
        })
        .await;

    match result {
        Ok(value) => Ok(value),
        Err(last) if last.kind.is_retryable() => Err(PaymentFailure::NetworkCongested {
            attempts: failed + 1,
            last,
        }),
        Err(last) => Err(PaymentFailure::Bridge(last)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::FailureKind;

    fn rate_limited() -> BridgeError {
        BridgeError::new(FailureKind::RateLimited, "429 Too Many Requests")
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (1..=4).map(|n| policy.delay(n).as_secs()).collect();
        assert_eq!(delays, vec![10, 20, 40, 80]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_four_rate_limits() {
        let calls = AtomicUsize::new(0);
        let mut notices = Vec::new();
        let start = tokio::time::Instant::now();

        let result = retry_bridge(
            &RetryPolicy::default(),
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 4 {
                    Err(rate_limited())
                } else {
                    Ok("done")
                }
            },
            |notice, _| notices.push(notice),
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        let delays: Vec<_> = notices.iter().map(|n| n.delay.as_secs()).collect();
        assert_eq!(delays, vec![10, 20, 40, 80]);
        let policy = RetryPolicy::default();
        for notice in &notices {
            assert_eq!(notice.delay, policy.delay(notice.attempt));
        }
        assert_eq!(notices[3].attempt, 4);
        assert_eq!(notices[3].max_attempts, 5);
        assert_eq!(start.elapsed(), Duration::from_secs(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_congestion() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = retry_bridge(
            &RetryPolicy::default(),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(rate_limited())
            },
            |_, _| {},
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match result {
            Err(PaymentFailure::NetworkCongested { attempts, last }) => {
                assert_eq!(attempts, 5);
                assert_eq!(last.kind, FailureKind::RateLimited);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let mut notified = false;
        let result: Result<(), _> = retry_bridge(
            &RetryPolicy::default(),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BridgeError::new(FailureKind::Unknown, "execution reverted"))
            },
            |_, _| notified = true,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!notified);
        assert!(matches!(result, Err(PaymentFailure::Bridge(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_allowance_errors_are_retried() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy {
            base_delay: Duration::from_secs(1),
            max_attempts: 3,
        };
        let result = retry_bridge(
            &policy,
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(BridgeError::new(FailureKind::Allowance, "insufficient allowance"))
                } else {
                    Ok(())
                }
            },
            |_, _| {},
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

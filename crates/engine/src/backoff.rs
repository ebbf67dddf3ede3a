//! Pseudo-random exponential backoff, shared by the reporter's retry
//! wrapper and the notification stream controller's reconnect loop.

use rand::Rng;
use std::time::Duration;
use tonic::Code;

const CAP_SECS: u64 = 300;

/// Base sleep for attempt `i` with extra `e`: `((i+e)*i + rand[0, i+e)) s`,
/// capped at 300s.
pub fn backoff_duration(attempt: u32, extra: u32) -> Duration {
    let i = attempt as u64;
    let e = extra as u64;
    let base = (i + e) * i;
    let jitter_bound = i + e;
    let jitter = if jitter_bound == 0 { 0 } else { rand::rng().random_range(0..jitter_bound) };
    Duration::from_secs((base + jitter).min(CAP_SECS))
}

/// gRPC status codes retried by `retry_api_call` with no extra backoff.
pub fn is_retryable_transient(code: Code) -> bool {
    matches!(code, Code::DeadlineExceeded | Code::Unavailable | Code::Aborted | Code::Internal)
}

/// Codes `retry_api_call` retries, including throttling.
pub fn is_retryable(code: Code) -> bool {
    is_retryable_transient(code) || code == Code::ResourceExhausted
}

/// Extra jitter term used for `RESOURCE_EXHAUSTED` retries.
pub const RESOURCE_EXHAUSTED_EXTRA: u32 = 10;

/// Retries `f` until it succeeds or the cumulative elapsed sleep time
/// exceeds `budget`, returning the last error.
///
/// This is the untyped retry primitive: it retries on
/// *any* error, unconditionally. `retry_api_call` in `reporter.rs` layers
/// gRPC status classification on top of this for the reporter.
pub async fn retry_func<T, E, F, Fut>(budget: Duration, desc: &str, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    let mut elapsed = Duration::ZERO;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let sleep = backoff_duration(attempt, 0);
                if elapsed + sleep > budget {
                    tracing::warn!(desc, attempts = attempt + 1, "retry budget exhausted");
                    return Err(e);
                }
                tracing::debug!(desc, attempt, sleep_secs = sleep.as_secs(), "retrying");
                tokio::time::sleep(sleep).await;
                elapsed += sleep;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        zero = { 0, 0 },
        one_no_extra = { 1, 0 },
        one_with_extra = { 1, 10 },
        large = { 20, 0 },
    )]
    fn backoff_never_exceeds_cap(attempt: u32, extra: u32) {
        for _ in 0..50 {
            let d = backoff_duration(attempt, extra);
            assert!(d.as_secs() <= CAP_SECS);
        }
    }

    #[test]
    fn zero_attempt_zero_extra_is_always_zero() {
        assert_eq!(backoff_duration(0, 0), Duration::ZERO);
    }

    #[test]
    fn retryable_transient_set_matches_spec() {
        assert!(is_retryable_transient(Code::DeadlineExceeded));
        assert!(is_retryable_transient(Code::Unavailable));
        assert!(is_retryable_transient(Code::Aborted));
        assert!(is_retryable_transient(Code::Internal));
        assert!(!is_retryable_transient(Code::ResourceExhausted));
        assert!(!is_retryable_transient(Code::PermissionDenied));
    }

    #[test]
    fn retryable_includes_resource_exhausted() {
        assert!(is_retryable(Code::ResourceExhausted));
        assert!(!is_retryable(Code::NotFound));
    }

    #[tokio::test]
    async fn retry_func_returns_first_success() {
        let result: Result<i32, &str> =
            retry_func(Duration::from_secs(1), "test", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_func_exhausts_budget_and_returns_last_error() {
        let result: Result<i32, &str> =
            retry_func(Duration::ZERO, "test", || async { Err("boom") }).await;
        assert_eq!(result.unwrap_err(), "boom");
    }
}

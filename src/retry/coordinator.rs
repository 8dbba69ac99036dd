use std::time::Duration;

use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

use crate::errors::Error;
use crate::telemetry::refresh::current_cycle_id;

use super::{AttemptFailure, RetryOutcome, plan::RetryPlan};

/// Runs an operation under a [`RetryPlan`], sleeping between attempts.
pub struct RetryCoordinator {
    plan: RetryPlan,
    rng: Mutex<StdRng>,
}

impl RetryCoordinator {
    pub fn new(plan: RetryPlan) -> Self {
        Self {
            plan,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn plan(&self) -> RetryPlan {
        self.plan.clone()
    }

    pub async fn execute<F, Fut, T>(
        &self,
        operation: &'static str,
        mut op: F,
    ) -> Result<(T, RetryOutcome), Error>
    where
        F: FnMut(u8) -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, Error>> + Send,
    {
        let mut attempt: u8 = 1;
        let start = Instant::now();
        let mut backoff = Duration::ZERO;
        let mut failures = Vec::new();
        let settle = |attempts: u8, success: bool, backoff: Duration, failures: Vec<AttemptFailure>| {
            let outcome = RetryOutcome {
                operation,
                cycle_id: current_cycle_id(),
                attempts,
                success,
                elapsed: start.elapsed(),
                backoff,
                failures,
            };
            outcome.log();
            outcome
        };
        loop {
            match op(attempt).await {
                Ok(value) => {
                    let outcome = settle(attempt, true, backoff, failures);
                    return Ok((value, outcome));
                }
                Err(err) => {
                    failures.push(AttemptFailure::of(&err));
                    if attempt >= self.plan.max_attempts || !Self::is_retriable(&err) {
                        settle(attempt, false, backoff, failures);
                        return Err(err);
                    }
                    let delay = {
                        let mut rng = self.rng.lock().await;
                        self.plan.delay_for_attempt(attempt + 1, &mut *rng)
                    };
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.plan.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retry.scheduling"
                    );
                    tokio::time::sleep(delay).await;
                    backoff += delay;
                    attempt += 1;
                }
            }
        }
    }

    /// Only failures that may clear up on their own are worth another attempt.
    pub fn is_retriable(err: &Error) -> bool {
        match err {
            Error::Timeout(_) | Error::NetworkUnavailable(_) => true,
            Error::HttpStatus { status, .. } => {
                status.is_server_error() || status.as_u16() == 429
            }
            _ => false,
        }
    }
}

impl Default for RetryCoordinator {
    fn default() -> Self {
        Self::new(RetryPlan::default_plan())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU8, Ordering};

    use reqwest::StatusCode;

    use super::*;
    use crate::retry::JitterStrategy;
    use crate::telemetry::refresh::RefreshTelemetry;

    fn fast_plan(max_attempts: u8) -> RetryPlan {
        RetryPlan::new(
            max_attempts,
            Duration::from_millis(1),
            1.0,
            Duration::from_millis(1),
            JitterStrategy::None,
        )
    }

    fn status(code: u16) -> Error {
        Error::HttpStatus {
            status: StatusCode::from_u16(code).unwrap(),
            status_text: String::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let coordinator = RetryCoordinator::new(fast_plan(3));
        let calls = Arc::new(AtomicU8::new(0));
        let (value, outcome) = coordinator
            .execute("test", |attempt| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 { Err(status(503)) } else { Ok("done") }
                }
            })
            .await
            .expect("third attempt succeeds");
        assert_eq!(value, "done");
        assert_eq!(outcome.attempts, 3);
        assert_eq!(
            outcome.failures,
            vec![AttemptFailure::Status(503), AttemptFailure::Status(503)]
        );
        assert_eq!(outcome.last_status(), Some(503));
        assert_eq!(outcome.backoff, Duration::from_millis(2));
        assert_eq!(outcome.cycle_id, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let coordinator = RetryCoordinator::new(fast_plan(5));
        let calls = Arc::new(AtomicU8::new(0));
        let err = coordinator
            .execute("test", |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(status(400))
                }
            })
            .await
            .expect_err("400 is terminal");
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stops_at_max_attempts() {
        let coordinator = RetryCoordinator::new(fast_plan(2));
        let calls = Arc::new(AtomicU8::new(0));
        let err = coordinator
            .execute("test", |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Error::Timeout(Some(Duration::from_millis(5))))
                }
            })
            .await
            .expect_err("budget exhausted");
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn outcome_carries_the_refresh_cycle() {
        let coordinator = RetryCoordinator::new(fast_plan(1));
        let telemetry = RefreshTelemetry::new("test");
        let (_, outcome) = telemetry
            .scope(coordinator.execute("test", |_| async { Ok::<_, Error>(()) }))
            .await
            .unwrap();
        assert_eq!(outcome.cycle_id, Some(telemetry.cycle_id()));
        assert!(outcome.failures.is_empty());
    }
}

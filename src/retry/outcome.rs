use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::Error;

/// What happened to one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptFailure {
    Status(u16),
    Timeout,
    Network,
    Other,
}

impl AttemptFailure {
    pub fn of(err: &Error) -> Self {
        match err {
            Error::HttpStatus { status, .. } => AttemptFailure::Status(status.as_u16()),
            Error::Timeout(_) => AttemptFailure::Timeout,
            Error::NetworkUnavailable(_) => AttemptFailure::Network,
            _ => AttemptFailure::Other,
        }
    }
}

/// Summary of a retried call, logged once when it settles.
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub operation: &'static str,
    /// Refresh cycle the call ran under, if it was made on behalf of one.
    pub cycle_id: Option<Uuid>,
    pub attempts: u8,
    pub success: bool,
    /// Wall time from the first attempt until the outcome.
    pub elapsed: Duration,
    /// Time spent sleeping between attempts.
    pub backoff: Duration,
    pub failures: Vec<AttemptFailure>,
}

impl RetryOutcome {
    pub fn last_status(&self) -> Option<u16> {
        match self.failures.last() {
            Some(AttemptFailure::Status(code)) => Some(*code),
            _ => None,
        }
    }

    pub fn log(&self) {
        let cycle_id = self.cycle_id.map(|id| id.to_string());
        if self.success {
            info!(
                operation = self.operation,
                cycle_id = cycle_id.as_deref(),
                attempts = self.attempts,
                elapsed_ms = self.elapsed.as_millis() as u64,
                backoff_ms = self.backoff.as_millis() as u64,
                "retry.outcome"
            );
        } else {
            warn!(
                operation = self.operation,
                cycle_id = cycle_id.as_deref(),
                attempts = self.attempts,
                elapsed_ms = self.elapsed.as_millis() as u64,
                backoff_ms = self.backoff.as_millis() as u64,
                last_status = self.last_status(),
                failures = ?self.failures,
                "retry.outcome"
            );
        }
    }
}

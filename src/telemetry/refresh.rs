use std::future::Future;
use std::time::Duration;

use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::Error;

tokio::task_local! {
    static CURRENT_CYCLE: Uuid;
}

/// Id of the refresh cycle the calling task is running for, if any.
pub fn current_cycle_id() -> Option<Uuid> {
    CURRENT_CYCLE.try_with(|id| *id).ok()
}

/// Structured events for one refresh cycle.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    cycle_id: Uuid,
    context: String,
}

impl RefreshTelemetry {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            context: context.into(),
        }
    }

    pub fn cycle_id(&self) -> Uuid {
        self.cycle_id
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Runs `fut` with this cycle visible through [`current_cycle_id`].
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        CURRENT_CYCLE.scope(self.cycle_id, fut).await
    }

    pub fn emit_start(&self) {
        event!(
            Level::INFO,
            cycle_id = %self.cycle_id,
            context = %self.context,
            "refresh.start"
        );
    }

    pub fn emit_joined(&self, waiters: usize) {
        event!(
            Level::DEBUG,
            cycle_id = %self.cycle_id,
            context = %self.context,
            waiters,
            "refresh.joined"
        );
    }

    pub fn emit_success(&self, elapsed: Duration, waiters: usize, token_len: usize) {
        event!(
            Level::INFO,
            cycle_id = %self.cycle_id,
            context = %self.context,
            elapsed_ms = elapsed.as_millis() as u64,
            waiters,
            token_len,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, error: &Error, elapsed: Duration, waiters: usize) {
        event!(
            Level::ERROR,
            cycle_id = %self.cycle_id,
            context = %self.context,
            elapsed_ms = elapsed.as_millis() as u64,
            waiters,
            error = %error,
            "refresh.failure"
        );
    }
}

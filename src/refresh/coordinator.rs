use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::telemetry::refresh::RefreshTelemetry;
use crate::token::{TokenPair, TokenState};

use super::RefreshOperation;

/// Called once per terminal authentication failure.
pub type AuthFailureHook = Arc<dyn Fn(&Error) + Send + Sync>;

type Outcome = std::result::Result<String, Arc<Error>>;
type Waiter = oneshot::Sender<Outcome>;

enum RefreshState {
    Idle,
    Refreshing {
        telemetry: RefreshTelemetry,
        waiters: Vec<Waiter>,
    },
}

enum Entry {
    Ready(String),
    Queued(oneshot::Receiver<Outcome>),
    Started(oneshot::Receiver<Outcome>, RefreshTelemetry),
}

/// Single-flight token refresh shared by every request of a client.
///
/// The first caller that finds the coordinator idle flips it to refreshing
/// and spawns the refresh; everyone else, including that first caller, waits
/// on a completion handle that is resolved when the cycle ends. The flip and
/// the queue drain happen under the same lock, so no waiter can slip in
/// between the end of a cycle and the start of the next one unnoticed.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<RefreshState>,
    tokens: TokenState,
    operation: Arc<dyn RefreshOperation>,
    on_failure: Option<AuthFailureHook>,
    cycles: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(
        tokens: TokenState,
        operation: Arc<dyn RefreshOperation>,
        on_failure: Option<AuthFailureHook>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(RefreshState::Idle),
                tokens,
                operation,
                on_failure,
                cycles: AtomicU64::new(0),
            }),
        }
    }

    /// Refreshes (or joins the refresh already in flight) and returns the new token.
    pub async fn ensure_fresh_token(&self) -> Result<String> {
        self.ensure_fresh_token_after(None).await
    }

    /// Like [`ensure_fresh_token`](Self::ensure_fresh_token), for a caller
    /// that just saw `rejected` fail.
    ///
    /// If another cycle already replaced `rejected` with a token that is still
    /// valid, that token is returned without starting a new refresh.
    pub async fn ensure_fresh_token_after(&self, rejected: Option<&str>) -> Result<String> {
        let receiver = match self.join_or_start(rejected) {
            Entry::Ready(token) => return Ok(token),
            Entry::Queued(receiver) => receiver,
            Entry::Started(receiver, telemetry) => {
                tokio::spawn(Inner::drive(Arc::clone(&self.inner), telemetry));
                receiver
            }
        };
        match receiver.await {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(cause)) => Err(Error::AuthRefreshFailed {
                reason: "token refresh failed".to_string(),
                source: Some(cause),
            }),
            Err(_) => Err(Error::auth("token refresh ended without a result")),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.inner.lock_state(), RefreshState::Refreshing { .. })
    }

    /// Callers currently waiting on the cycle in flight.
    pub fn queued(&self) -> usize {
        match &*self.inner.lock_state() {
            RefreshState::Refreshing { waiters, .. } => waiters.len(),
            RefreshState::Idle => 0,
        }
    }

    /// Number of refresh cycles started since construction.
    pub fn cycles_started(&self) -> u64 {
        self.inner.cycles.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> &TokenState {
        &self.inner.tokens
    }

    pub(crate) fn notify_auth_failure(&self, error: &Error) {
        self.inner.notify_auth_failure(error);
    }

    fn join_or_start(&self, rejected: Option<&str>) -> Entry {
        let mut state = self.inner.lock_state();
        let (waiter, receiver) = oneshot::channel();
        match &mut *state {
            RefreshState::Refreshing { telemetry, waiters } => {
                waiters.push(waiter);
                telemetry.emit_joined(waiters.len());
                Entry::Queued(receiver)
            }
            RefreshState::Idle => {
                if let Some(rejected) = rejected
                    && let Some(current) = self.inner.tokens.valid()
                    && current != rejected
                {
                    debug!("token already replaced by an earlier refresh");
                    return Entry::Ready(current);
                }
                let telemetry = RefreshTelemetry::new("bearer_fetch.refresh");
                *state = RefreshState::Refreshing {
                    telemetry: telemetry.clone(),
                    waiters: vec![waiter],
                };
                self.inner.cycles.fetch_add(1, Ordering::SeqCst);
                Entry::Started(receiver, telemetry)
            }
        }
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn drive(self: Arc<Self>, telemetry: RefreshTelemetry) {
        let mut cycle = Cycle {
            inner: Arc::clone(&self),
            telemetry,
            started: Instant::now(),
            finished: false,
        };
        cycle.telemetry.emit_start();
        let result = cycle
            .telemetry
            .scope(self.operation.refresh(self.tokens.refresh_token()))
            .await;
        cycle.finish(result);
    }

    /// Flips back to idle and hands back every queued waiter in one step.
    fn take_waiters(&self) -> Vec<Waiter> {
        let mut state = self.lock_state();
        match std::mem::replace(&mut *state, RefreshState::Idle) {
            RefreshState::Refreshing { waiters, .. } => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }

    fn notify_auth_failure(&self, error: &Error) {
        if let Some(hook) = &self.on_failure {
            hook(error);
        }
    }
}

/// One refresh cycle. Dropping it unfinished fails every waiter.
struct Cycle {
    inner: Arc<Inner>,
    telemetry: RefreshTelemetry,
    started: Instant,
    finished: bool,
}

impl Cycle {
    fn finish(&mut self, result: Result<TokenPair>) {
        self.finished = true;
        match result {
            Ok(pair) => {
                let token = pair.access_token.clone();
                self.inner.tokens.replace(pair);
                let waiters = self.inner.take_waiters();
                self.telemetry
                    .emit_success(self.started.elapsed(), waiters.len(), token.len());
                for waiter in waiters {
                    let _ = waiter.send(Ok(token.clone()));
                }
            }
            Err(err) => {
                let err = Arc::new(err);
                let waiters = self.inner.take_waiters();
                self.telemetry
                    .emit_failure(&err, self.started.elapsed(), waiters.len());
                for waiter in waiters {
                    let _ = waiter.send(Err(Arc::clone(&err)));
                }
                self.inner.notify_auth_failure(&err);
            }
        }
    }
}

impl Drop for Cycle {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(Err(Error::auth("refresh task stopped before completing")));
        }
    }
}

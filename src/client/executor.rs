use reqwest::{Response, StatusCode};
use tracing::{debug, warn};

use crate::classify::classify;
use crate::errors::{Error, Result};
use crate::request::RequestDescriptor;
use crate::response::{ResponseBody, dispatch};
use crate::token::is_expired;

use super::FetchClient;

/// Result of a single transport round trip.
enum Attempt {
    Completed(Response),
    /// 401 on a request whose token the client manages; triggers a refresh.
    Unauthorized,
}

impl FetchClient {
    pub(crate) async fn execute(&self, mut descriptor: RequestDescriptor) -> Result<ResponseBody> {
        let mut token = self.initial_token(&mut descriptor).await?;
        loop {
            match self.send_once(&descriptor, token.as_deref()).await? {
                Attempt::Completed(response) => {
                    return dispatch(response, descriptor.response_type()).await;
                }
                Attempt::Unauthorized => {
                    warn!(
                        status = 401,
                        attempt = descriptor.attempt(),
                        max_attempts = descriptor.max_retry_attempts(),
                        url = %descriptor.url(),
                        "request.unauthorized"
                    );
                    if !descriptor.advance_attempt() {
                        return Err(self.retries_exhausted(
                            &descriptor,
                            format!(
                                "server still answered 401 after {} token refresh attempt(s)",
                                descriptor.attempt()
                            ),
                        ));
                    }
                    let refreshed = self
                        .inner
                        .coordinator
                        .ensure_fresh_token_after(token.as_deref())
                        .await?;
                    token = Some(refreshed);
                }
            }
        }
    }

    /// Token for the first attempt, refreshing first when the stored one has expired.
    ///
    /// That refresh is charged to the same ceiling as the ones a 401 triggers.
    async fn initial_token(&self, descriptor: &mut RequestDescriptor) -> Result<Option<String>> {
        if !descriptor.uses_managed_auth() {
            return Ok(None);
        }
        let current = self.inner.tokens.current();
        if !is_expired(current.as_deref()) {
            return Ok(current);
        }
        debug!(
            has_token = current.is_some(),
            url = %descriptor.url(),
            "stored token expired; refreshing before send"
        );
        if !descriptor.advance_attempt() {
            return Err(self.retries_exhausted(
                descriptor,
                "stored token expired and no token refresh attempts are allowed".to_string(),
            ));
        }
        self.inner
            .coordinator
            .ensure_fresh_token_after(current.as_deref())
            .await
            .map(Some)
    }

    fn retries_exhausted(&self, descriptor: &RequestDescriptor, reason: String) -> Error {
        warn!(
            attempts = descriptor.attempt(),
            max_attempts = descriptor.max_retry_attempts(),
            url = %descriptor.url(),
            "request.retry_exhausted"
        );
        let err = Error::auth(reason);
        self.inner.coordinator.notify_auth_failure(&err);
        err
    }

    async fn send_once(&self, descriptor: &RequestDescriptor, token: Option<&str>) -> Result<Attempt> {
        let mut request = descriptor.build(token)?;
        for interceptor in &self.inner.interceptors {
            interceptor(&mut request)?;
        }
        let call = self.inner.transport.send(request);
        let outcome = match descriptor.timeout() {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        timeout_ms = limit.as_millis() as u64,
                        url = %descriptor.url(),
                        "request.timeout"
                    );
                    return Err(Error::Timeout(Some(limit)));
                }
            },
            None => call.await,
        };
        let response = outcome.map_err(|err| classify(err, descriptor.timeout()))?;

        if response.status() == StatusCode::UNAUTHORIZED && descriptor.uses_managed_auth() {
            return Ok(Attempt::Unauthorized);
        }
        Ok(Attempt::Completed(response))
    }
}

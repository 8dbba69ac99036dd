use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::{info, warn};

use crate::classify::classify;
use crate::errors::{Error, Result};
use crate::response::status_error;
use crate::retry::{RetryCoordinator, RetryPlan};
use crate::token::TokenPair;

/// Performs the network call that trades a refresh token for a new pair.
#[async_trait]
pub trait RefreshOperation: Send + Sync {
    async fn refresh(&self, refresh_token: Option<String>) -> Result<TokenPair>;
}

#[async_trait]
impl<F, Fut> RefreshOperation for F
where
    F: Fn(Option<String>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<TokenPair>> + Send + 'static,
{
    async fn refresh(&self, refresh_token: Option<String>) -> Result<TokenPair> {
        (self)(refresh_token).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// POSTs `{"refreshToken": ..}` as JSON and expects a [`TokenPair`] back.
pub struct HttpRefreshOperation {
    http_client: Client,
    url: Url,
    timeout: Duration,
    retry: RetryCoordinator,
}

impl HttpRefreshOperation {
    pub fn new(http_client: Client, url: Url, timeout: Duration, plan: RetryPlan) -> Self {
        Self {
            http_client,
            url,
            timeout,
            retry: RetryCoordinator::new(plan),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn request_once(&self, refresh_token: &str, attempt: u8) -> Result<TokenPair> {
        let send = self
            .http_client
            .post(self.url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(&RefreshRequest { refresh_token })
            .send();
        let resp = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(err)) => return Err(classify(Box::new(err), Some(self.timeout))),
            Err(_) => return Err(Error::Timeout(Some(self.timeout))),
        };

        let status = resp.status();
        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                attempt,
                url = %self.url,
                "refresh endpoint rejected request"
            );
            return Err(status_error(resp).await);
        }

        let pair: TokenPair = resp.json().await.map_err(|err| Error::Decode {
            kind: "json",
            source: Box::new(err),
        })?;
        if pair.access_token.is_empty() || pair.refresh_token.is_empty() {
            return Err(Error::auth("refresh endpoint returned an empty token"));
        }
        info!(
            attempt,
            token_len = pair.access_token.len(),
            "refresh endpoint issued new tokens"
        );
        Ok(pair)
    }
}

#[async_trait]
impl RefreshOperation for HttpRefreshOperation {
    async fn refresh(&self, refresh_token: Option<String>) -> Result<TokenPair> {
        let refresh_token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::auth("refresh token is missing"))?;
        let (pair, _outcome) = self
            .retry
            .execute("token_refresh", |attempt| {
                self.request_once(&refresh_token, attempt)
            })
            .await?;
        Ok(pair)
    }
}

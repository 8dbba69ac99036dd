use async_trait::async_trait;
use reqwest::{Request, Response};

use crate::errors::BoxError;

/// The request/response exchange underneath the client.
///
/// Dropping the returned future must abort the call; that is how per-request
/// timeouts cancel in-flight work.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, BoxError>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn send(&self, request: Request) -> Result<Response, BoxError> {
        self.execute(request).await.map_err(Into::into)
    }
}

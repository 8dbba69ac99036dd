use std::sync::Arc;

use reqwest::{Method, Request};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{ConfigLocation, read_config};
use crate::errors::{Error, Result};
use crate::refresh::RefreshCoordinator;
use crate::request::{FetchOptions, RequestDefaults, RequestDescriptor};
use crate::response::{ResponseBody, ResponseType};
use crate::token::TokenState;
use crate::transport::Transport;

mod builder;
mod executor;

pub use builder::FetchClientBuilder;

/// Hook that may rewrite every outgoing request, retries included.
///
/// Interceptors run in registration order after the bearer header is set.
/// An error aborts the request.
pub type RequestInterceptor = Arc<dyn Fn(&mut Request) -> Result<()> + Send + Sync>;

/// HTTP client that attaches, checks and renews bearer tokens on its own.
///
/// Cloning is cheap; clones share the token state and the refresh coordinator.
#[derive(Clone)]
pub struct FetchClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    tokens: TokenState,
    coordinator: RefreshCoordinator,
    defaults: RequestDefaults,
    interceptors: Vec<RequestInterceptor>,
}

impl FetchClient {
    pub fn builder() -> FetchClientBuilder {
        FetchClientBuilder::new()
    }

    /// Builds a client from configuration read at `location`.
    ///
    /// The configuration must name a `refresh_url`; use [`FetchClient::builder`]
    /// to plug in a custom refresh operation instead.
    pub async fn from_location(location: ConfigLocation) -> Result<Self> {
        let config = read_config(location).await?;
        FetchClientBuilder::new().config(config).build()
    }

    /// Sends a request and decodes the response per `options.response_type`.
    pub async fn fetch(&self, url: &str, options: FetchOptions) -> Result<ResponseBody> {
        let descriptor = RequestDescriptor::from_options(url, options, &self.inner.defaults)?;
        self.execute(descriptor).await
    }

    /// Sends a request and deserializes its JSON body into `T`.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str, options: FetchOptions) -> Result<T> {
        self.fetch(url, options.response_type(ResponseType::Json))
            .await?
            .deserialize()
    }

    pub async fn get(&self, url: &str, options: FetchOptions) -> Result<ResponseBody> {
        self.fetch(url, options.method(Method::GET)).await
    }

    /// POSTs `body` serialized as JSON.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: FetchOptions,
    ) -> Result<ResponseBody> {
        self.fetch(url, options.method(Method::POST).data(to_json(body)?))
            .await
    }

    /// PUTs `body` serialized as JSON.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: FetchOptions,
    ) -> Result<ResponseBody> {
        self.fetch(url, options.method(Method::PUT).data(to_json(body)?))
            .await
    }

    pub async fn delete(&self, url: &str, options: FetchOptions) -> Result<ResponseBody> {
        self.fetch(url, options.method(Method::DELETE)).await
    }

    pub fn tokens(&self) -> &TokenState {
        &self.inner.tokens
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    pub fn defaults(&self) -> &RequestDefaults {
        &self.inner.defaults
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value> {
    serde_json::to_value(body).map_err(Error::from)
}

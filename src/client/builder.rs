use std::sync::Arc;

use reqwest::{Client, Request, Url};
use tracing::info;

use crate::config::Config;
use crate::errors::{Error, Result};
use crate::refresh::{AuthFailureHook, HttpRefreshOperation, RefreshCoordinator, RefreshOperation};
use crate::token::{MemoryTokenStore, TokenState, TokenStore};
use crate::transport::Transport;

use super::{ClientInner, FetchClient, RequestInterceptor};

/// Assembles a [`FetchClient`] from configuration and collaborators.
///
/// Anything not supplied explicitly is derived from the [`Config`]: a
/// `reqwest` transport, an in-memory token store seeded with the configured
/// tokens, and an HTTP refresh operation against `refresh_url`.
#[derive(Default)]
pub struct FetchClientBuilder {
    config: Config,
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn TokenStore>>,
    refresh: Option<Arc<dyn RefreshOperation>>,
    on_auth_failure: Option<AuthFailureHook>,
    interceptors: Vec<RequestInterceptor>,
}

impl FetchClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn refresh_operation(mut self, operation: impl RefreshOperation + 'static) -> Self {
        self.refresh = Some(Arc::new(operation));
        self
    }

    pub fn on_auth_failure(mut self, hook: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_auth_failure = Some(Arc::new(hook));
        self
    }

    /// Appends an interceptor; see [`RequestInterceptor`].
    pub fn request_interceptor(
        mut self,
        interceptor: impl Fn(&mut Request) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn build(self) -> Result<FetchClient> {
        let FetchClientBuilder {
            config,
            transport,
            store,
            refresh,
            on_auth_failure,
            interceptors,
        } = self;

        if let Some(base_url) = config.base_url.as_deref() {
            Url::parse(base_url).map_err(|e| {
                Error::Config(format!("Invalid base URL '{}': {}", base_url, e))
            })?;
        }
        let defaults = config.request_defaults()?;

        let http_client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let refresh = match refresh {
            Some(operation) => operation,
            None => {
                let raw = config.refresh_url.as_deref().ok_or_else(|| {
                    Error::Config(
                        "No refresh operation configured; set refresh_url or supply one".to_string(),
                    )
                })?;
                let url = Url::parse(raw).map_err(|e| {
                    Error::Config(format!("Invalid refresh URL '{}': {}", raw, e))
                })?;
                Arc::new(HttpRefreshOperation::new(
                    http_client.clone(),
                    url,
                    config.refresh_timeout(),
                    config.retry_plan()?,
                )) as Arc<dyn RefreshOperation>
            }
        };

        let store = store.unwrap_or_else(|| {
            Arc::new(MemoryTokenStore::seeded(
                config.access_token.clone(),
                config.refresh_token.clone(),
            )) as Arc<dyn TokenStore>
        });
        let tokens = TokenState::new(store);
        let coordinator = RefreshCoordinator::new(tokens.clone(), refresh, on_auth_failure);
        let transport = transport.unwrap_or_else(|| Arc::new(http_client) as Arc<dyn Transport>);

        info!(
            base_url = defaults.base_url.as_deref().unwrap_or("<none>"),
            max_retry_attempts = defaults.max_retry_attempts,
            timeout_ms = defaults.timeout.map(|t| t.as_millis() as u64),
            interceptors = interceptors.len(),
            "fetch client ready"
        );

        Ok(FetchClient {
            inner: Arc::new(ClientInner {
                transport,
                tokens,
                coordinator,
                defaults,
                interceptors,
            }),
        })
    }
}

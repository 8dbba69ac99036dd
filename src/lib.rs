//! Bearer-token HTTP client with single-flight token refresh.
//!
//! [`FetchClient::fetch`] attaches the current access token, refreshes it
//! when it has expired or the server answers 401, and retries up to a
//! per-request ceiling. Concurrent requests share one refresh at a time.

mod classify;
mod client;
mod config;
mod errors;
pub mod refresh;
pub mod request;
pub mod response;
pub mod retry;
pub mod telemetry;
pub mod token;
mod transport;

pub use classify::classify;
pub use client::{FetchClient, FetchClientBuilder, RequestInterceptor};
pub use config::{Config, ConfigLocation, read_config};
pub use errors::{BoxError, Error, Result};
pub use refresh::{AuthFailureHook, HttpRefreshOperation, RefreshCoordinator, RefreshOperation};
pub use request::{FetchOptions, RequestBody, RequestDescriptor};
pub use response::{BodyStream, ResponseBody, ResponseType};
pub use token::{MemoryTokenStore, TokenPair, TokenState, TokenStore};
pub use transport::Transport;

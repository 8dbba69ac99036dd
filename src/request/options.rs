use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;

use crate::response::ResponseType;

/// Payload of an outgoing request. Kept as owned data so retries can resend it.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Bytes(Bytes),
    Text(String),
    /// Serialized as JSON; sets `Content-Type: application/json` unless overridden.
    Json(serde_json::Value),
}

/// Per-call options accepted by [`FetchClient::fetch`](crate::FetchClient::fetch).
#[derive(Clone, Debug, Default)]
pub struct FetchOptions {
    pub(crate) method: Method,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) query_params: Vec<(String, String)>,
    pub(crate) body: RequestBody,
    pub(crate) timeout: Option<Duration>,
    pub(crate) response_type: ResponseType,
    pub(crate) max_retry_attempts: Option<u32>,
    pub(crate) skip_auth: bool,
    pub(crate) override_token: Option<String>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query_params.push((key.into(), value.to_string()));
        self
    }

    pub fn query_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.query_params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Bytes(body.into());
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = RequestBody::Text(body.into());
        self
    }

    /// JSON payload, serialized when the request is built.
    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.body = RequestBody::Json(data);
        self
    }

    /// Per-request timeout; `Duration::ZERO` disables the timer.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = Some(attempts);
        self
    }

    pub fn skip_auth(mut self, skip: bool) -> Self {
        self.skip_auth = skip;
        self
    }

    /// Sends this token as-is; no expiry check, no refresh, no 401 retry.
    pub fn override_token(mut self, token: impl Into<String>) -> Self {
        self.override_token = Some(token.into());
        self
    }
}

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Request, Url};

use crate::errors::{Error, Result};
use crate::response::ResponseType;

use super::options::{FetchOptions, RequestBody};
use super::url::build_url;

/// Client-wide values every request starts from.
#[derive(Clone, Debug)]
pub struct RequestDefaults {
    pub base_url: Option<String>,
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
    pub max_retry_attempts: u32,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            base_url: None,
            headers: HeaderMap::new(),
            timeout: Some(Duration::from_millis(5000)),
            max_retry_attempts: 2,
        }
    }
}

/// One logical request, including where it stands in its retry chain.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
    max_retry_attempts: u32,
    attempt: u32,
    skip_auth: bool,
    override_token: Option<String>,
    response_type: ResponseType,
}

impl RequestDescriptor {
    pub fn from_options(url: &str, options: FetchOptions, defaults: &RequestDefaults) -> Result<Self> {
        let FetchOptions {
            method,
            headers,
            query_params,
            body,
            timeout,
            response_type,
            max_retry_attempts,
            skip_auth,
            override_token,
        } = options;

        let url = build_url(defaults.base_url.as_deref(), url, &query_params)?;

        let mut merged = defaults.headers.clone();
        let (body, content_type) = encode_body(body)?;
        if let Some(content_type) = content_type {
            merged.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        for (name, value) in headers {
            let (name, value) = parse_header(&name, &value)?;
            merged.insert(name, value);
        }

        Ok(Self {
            method,
            url,
            headers: merged,
            body,
            timeout: timeout.or(defaults.timeout).filter(|t| !t.is_zero()),
            max_retry_attempts: max_retry_attempts.unwrap_or(defaults.max_retry_attempts),
            attempt: 0,
            skip_auth,
            override_token: override_token.filter(|t| !t.is_empty()),
            response_type,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_retry_attempts(&self) -> u32 {
        self.max_retry_attempts
    }

    pub fn skip_auth(&self) -> bool {
        self.skip_auth
    }

    pub fn override_token(&self) -> Option<&str> {
        self.override_token.as_deref()
    }

    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    /// True when the client's token store and refresh loop apply to this request.
    pub fn uses_managed_auth(&self) -> bool {
        !self.skip_auth && self.override_token.is_none()
    }

    /// Moves to the next attempt. Returns `false` once the ceiling is reached.
    pub fn advance_attempt(&mut self) -> bool {
        if self.attempt >= self.max_retry_attempts {
            return false;
        }
        self.attempt += 1;
        true
    }

    /// Builds a fresh transport request carrying `token` as the bearer.
    ///
    /// An override token always wins over `token`; `skip_auth` sends none.
    pub fn build(&self, token: Option<&str>) -> Result<Request> {
        let mut request = Request::new(self.method.clone(), self.url.clone());
        *request.headers_mut() = self.headers.clone();
        let bearer = if self.skip_auth {
            None
        } else {
            self.override_token.as_deref().or(token)
        };
        if let Some(bearer) = bearer {
            let mut value = HeaderValue::from_str(&format!("Bearer {bearer}")).map_err(|err| {
                Error::InvalidHeader {
                    name: AUTHORIZATION.to_string(),
                    reason: err.to_string(),
                }
            })?;
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        if let Some(body) = &self.body {
            *request.body_mut() = Some(body.clone().into());
        }
        Ok(request)
    }
}

fn encode_body(body: RequestBody) -> Result<(Option<Bytes>, Option<&'static str>)> {
    Ok(match body {
        RequestBody::Empty => (None, None),
        RequestBody::Bytes(bytes) => (Some(bytes), None),
        RequestBody::Text(text) => (Some(Bytes::from(text)), None),
        RequestBody::Json(value) => (
            Some(Bytes::from(serde_json::to_vec(&value)?)),
            Some("application/json"),
        ),
    })
}

pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| Error::InvalidHeader {
        name: name.to_string(),
        reason: err.to_string(),
    })?;
    let header_value = HeaderValue::from_str(value).map_err(|err| Error::InvalidHeader {
        name: name.to_string(),
        reason: err.to_string(),
    })?;
    Ok((header_name, header_value))
}

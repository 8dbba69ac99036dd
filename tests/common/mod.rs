#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use jiff::Timestamp;
use jsonwebtoken::{EncodingKey, Header};
use wiremock::MockServer;

use bearer_fetch::{Config, Error, FetchClient, FetchClientBuilder, TokenPair};

pub fn jwt(label: &str, ttl_secs: i64) -> String {
    #[derive(serde::Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: i64,
    }
    jsonwebtoken::encode(
        &Header::default(),
        &Claims {
            sub: label,
            exp: Timestamp::now().as_second() + ttl_secs,
        },
        &EncodingKey::from_secret(b"bearer-fetch-tests"),
    )
    .expect("sign test token")
}

/// Refresh stub that hands out `next` (or fails) and counts invocations.
#[derive(Clone)]
pub struct StubRefresh {
    pub calls: Arc<AtomicUsize>,
    next: Option<String>,
    delay: Duration,
}

impl StubRefresh {
    pub fn issuing(token: impl Into<String>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            next: Some(token.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            next: None,
            delay: Duration::ZERO,
        }
    }

    /// Holds each refresh open for `delay` so concurrent callers pile up.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn install(&self, builder: FetchClientBuilder) -> FetchClientBuilder {
        let stub = self.clone();
        builder.refresh_operation(move |_: Option<String>| {
            let stub = stub.clone();
            async move {
                stub.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(stub.delay).await;
                match stub.next {
                    Some(token) => Ok(TokenPair::new(token, "refresh-next")),
                    None => Err(Error::Config("refresh rejected".to_string())),
                }
            }
        })
    }
}

pub fn config(server: &MockServer, access_token: Option<String>) -> Config {
    Config::from_values(server.uri(), None, access_token, Some("refresh-0".into()))
}

pub fn client(server: &MockServer, access_token: Option<String>, refresh: &StubRefresh) -> FetchClient {
    refresh
        .install(FetchClient::builder().config(config(server, access_token)))
        .build()
        .expect("client builds")
}

use std::sync::{PoisonError, RwLock};

use super::TokenPair;

/// Where the current access/refresh pair lives between requests.
///
/// Implementations must make `set_tokens` replace both values atomically.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn set_tokens(&self, access_token: String, refresh_token: String);

    /// Reads both tokens under one lock where the store supports it.
    fn pair(&self) -> (Option<String>, Option<String>) {
        (self.access_token(), self.refresh_token())
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<(Option<String>, Option<String>)>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            inner: RwLock::new((access_token, refresh_token)),
        }
    }

    pub fn from_pair(pair: TokenPair) -> Self {
        Self::seeded(Some(pair.access_token), Some(pair.refresh_token))
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .0
            .clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .1
            .clone()
    }

    fn set_tokens(&self, access_token: String, refresh_token: String) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = (Some(access_token), Some(refresh_token));
    }

    fn pair(&self) -> (Option<String>, Option<String>) {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

use std::sync::Arc;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{TokenStore, claims};

/// Access/refresh pair as handed back by a refresh operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Expiry decoded from the access token's claims.
    pub fn expiry_epoch_seconds(&self) -> Option<i64> {
        claims::expiry_epoch_seconds(&self.access_token)
    }
}

/// Fail-closed expiry check against the wall clock.
pub fn is_expired(token: Option<&str>) -> bool {
    is_expired_at(token, Timestamp::now().as_second())
}

/// Same as [`is_expired`] with an explicit `now` in epoch seconds.
pub fn is_expired_at(token: Option<&str>, now: i64) -> bool {
    match token.filter(|t| !t.is_empty()).and_then(claims::expiry_epoch_seconds) {
        Some(exp) => exp <= now,
        None => true,
    }
}

/// Read/replace view over the client's token store.
#[derive(Clone)]
pub struct TokenState {
    store: Arc<dyn TokenStore>,
}

impl TokenState {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Current access token, if any.
    pub fn current(&self) -> Option<String> {
        self.store.access_token()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.refresh_token()
    }

    /// Access and refresh token, read together.
    pub fn pair(&self) -> (Option<String>, Option<String>) {
        self.store.pair()
    }

    /// Current access token, only when it has not expired yet.
    pub fn valid(&self) -> Option<String> {
        self.current().filter(|t| !is_expired(Some(t)))
    }

    pub fn replace(&self, pair: TokenPair) {
        self.store.set_tokens(pair.access_token, pair.refresh_token);
    }

    pub fn store(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MemoryTokenStore;
    use jsonwebtoken::{EncodingKey, Header};

    fn jwt(exp: i64) -> String {
        #[derive(Serialize)]
        struct Claims {
            sub: &'static str,
            exp: i64,
        }
        jsonwebtoken::encode(
            &Header::default(),
            &Claims { sub: "user", exp },
            &EncodingKey::from_secret(b"test-secret"),
        )
        .expect("sign test token")
    }

    #[test]
    fn absent_and_empty_tokens_are_expired() {
        assert!(is_expired(None));
        assert!(is_expired(Some("")));
    }

    #[test]
    fn malformed_token_is_expired() {
        assert!(is_expired(Some("not-a-jwt")));
        assert!(is_expired(Some("qwerty.!!!.signature")));
    }

    #[test]
    fn past_exp_is_expired_future_exp_is_valid() {
        let now = Timestamp::now().as_second();
        assert!(is_expired(Some(&jwt(now - 10))));
        assert!(!is_expired(Some(&jwt(now + 3600))));
    }

    #[test]
    fn exp_equal_to_now_is_expired() {
        let token = jwt(1_000);
        assert!(is_expired_at(Some(&token), 1_000));
        assert!(!is_expired_at(Some(&token), 999));
    }

    #[test]
    fn replace_swaps_both_tokens() {
        let state = TokenState::new(Arc::new(MemoryTokenStore::seeded(
            Some("old-access".into()),
            Some("old-refresh".into()),
        )));
        let fresh = jwt(Timestamp::now().as_second() + 600);
        state.replace(TokenPair::new(fresh.clone(), "new-refresh"));
        assert_eq!(state.current().as_deref(), Some(fresh.as_str()));
        assert_eq!(state.refresh_token().as_deref(), Some("new-refresh"));
        assert_eq!(state.valid().as_deref(), Some(fresh.as_str()));
        assert_eq!(
            state.pair(),
            (Some(fresh.clone()), Some("new-refresh".to_string()))
        );
    }
}

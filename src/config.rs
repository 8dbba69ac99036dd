//! read client configuration from a file, the environment, or AWS Secrets Manager

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use aws_config::BehaviorVersion;
use reqwest::header::HeaderMap;
use serde::Deserialize;

use crate::errors::Error;
use crate::request::{RequestDefaults, parse_header};
use crate::retry::{JitterStrategy, RetryPlan};

const ENV_PREFIX: &str = "BEARER_FETCH_";
const SECRET_ARN_VAR: &str = "BEARER_FETCH_CONFIG_SECRET_ARN";

pub enum ConfigLocation {
    File(PathBuf),
    Env,
    Secret,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: Option<String>,
    pub default_headers: BTreeMap<String, String>,
    pub max_retry_attempts: u32,
    /// Per-request timeout in milliseconds; 0 disables it.
    pub timeout_ms: u64,
    pub refresh_url: Option<String>,
    pub refresh_timeout_ms: u64,
    pub refresh_max_attempts: u8,
    pub refresh_jitter: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            default_headers: BTreeMap::new(),
            max_retry_attempts: 2,
            timeout_ms: 5000,
            refresh_url: None,
            refresh_timeout_ms: 10_000,
            refresh_max_attempts: 3,
            refresh_jitter: None,
            access_token: None,
            refresh_token: None,
            user_agent: concat!("bearer-fetch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    pub fn from_values(
        base_url: impl Into<String>,
        refresh_url: Option<String>,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            base_url: Some(base_url.into()),
            refresh_url,
            access_token,
            refresh_token,
            ..Self::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Reads `BEARER_FETCH_*` variables; unset ones keep their defaults.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}")).filter(|v| !v.is_empty());
        let mut config = Self::default();
        config.base_url = var("BASE_URL");
        config.refresh_url = var("REFRESH_URL");
        config.access_token = var("ACCESS_TOKEN");
        config.refresh_token = var("REFRESH_TOKEN");
        config.refresh_jitter = var("REFRESH_JITTER");
        if let Some(ua) = var("USER_AGENT") {
            config.user_agent = ua;
        }
        if let Some(raw) = var("TIMEOUT_MS") {
            config.timeout_ms = parse_number("TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = var("MAX_RETRY_ATTEMPTS") {
            config.max_retry_attempts = parse_number("MAX_RETRY_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = var("REFRESH_TIMEOUT_MS") {
            config.refresh_timeout_ms = parse_number("REFRESH_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = var("REFRESH_MAX_ATTEMPTS") {
            config.refresh_max_attempts = parse_number("REFRESH_MAX_ATTEMPTS", &raw)?;
        }
        Ok(config)
    }

    pub async fn from_secret() -> Result<Self, Error> {
        let secret_arn = std::env::var(SECRET_ARN_VAR)
            .map_err(|_| Error::Config(format!("Missing {SECRET_ARN_VAR} env var")))?;
        let client = aws_sdk_secretsmanager::Client::new(
            &aws_config::load_defaults(BehaviorVersion::latest()).await,
        );
        let resp = client
            .get_secret_value()
            .secret_id(secret_arn)
            .send()
            .await
            .map_err(|e| Error::Config(format!("Failed to get secret: {}", e)))?;
        let secret = resp
            .secret_string()
            .ok_or_else(|| Error::Config("Failed to get secret string, returned None".to_string()))?;
        Ok(serde_json::from_str(secret)?)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms.max(1))
    }

    pub fn retry_plan(&self) -> Result<RetryPlan, Error> {
        let jitter = match self.refresh_jitter.as_deref() {
            Some(name) => JitterStrategy::from_str(name)?,
            None => JitterStrategy::Full,
        };
        Ok(RetryPlan {
            max_attempts: self.refresh_max_attempts.max(1),
            jitter,
            ..RetryPlan::default_plan()
        })
    }

    pub fn request_defaults(&self) -> Result<RequestDefaults, Error> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.default_headers {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }
        Ok(RequestDefaults {
            base_url: self.base_url.clone(),
            headers,
            timeout: self.request_timeout(),
            max_retry_attempts: self.max_retry_attempts,
        })
    }
}

pub async fn read_config(loc: ConfigLocation) -> Result<Config, Error> {
    let config = match loc {
        ConfigLocation::File(path) => Config::from_file(path)?,
        ConfigLocation::Env => Config::from_env()?,
        ConfigLocation::Secret => Config::from_secret().await?,
    };
    Ok(config)
}

fn parse_number<T: FromStr>(suffix: &str, raw: &str) -> Result<T, Error> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{ENV_PREFIX}{suffix} must be a number, got '{raw}'")))
}

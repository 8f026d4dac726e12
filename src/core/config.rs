//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::core::errors::{ClientError, Result};

/// Default translation endpoint
pub const DEFAULT_TRANSLATE_ENDPOINT: &str =
    "https://translation.googleapis.com/language/translate/v2";

/// Default tweet lookup endpoint
pub const DEFAULT_LOOKUP_ENDPOINT: &str = "https://api.twitter.com/2/tweets";

/// Default maximum number of texts per translation request
pub const DEFAULT_BATCH_CAP: usize = 50;

/// Tweet fields requested from the lookup endpoint
const DEFAULT_TWEET_FIELDS: &[&str] = &[
    "attachments",
    "author_id",
    "context_annotations",
    "conversation_id",
    "created_at",
    "entities",
    "geo",
    "id",
    "in_reply_to_user_id",
    "lang",
    "public_metrics",
    "referenced_tweets",
    "reply_settings",
    "source",
    "text",
    "withheld",
];

/// Retry behaviour for one class of transient failure.
///
/// `max_retries: None` retries forever, which is the default for both
/// clients. Callers that cannot tolerate a hung provider set a bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Wait before each retry, in milliseconds
    pub delay_ms: u64,
    /// Retries allowed after the first attempt; `None` is unlimited
    pub max_retries: Option<u32>,
}

impl RetryPolicy {
    /// Retry forever with a fixed delay
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            delay_ms: delay.as_millis() as u64,
            max_retries: None,
        }
    }

    /// Cap the number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Delay between attempts
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Whether another retry is allowed after `retries` retries already made
    pub fn allows(&self, retries: u32) -> bool {
        self.max_retries.map_or(true, |max| retries < max)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().map_err(|_| ClientError::ConfigError {
            message: format!("{} has an invalid value: {}", key, raw),
        }),
        Err(_) => Ok(default),
    }
}

fn env_opt<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().map(Some).map_err(|_| ClientError::ConfigError {
            message: format!("{} has an invalid value: {}", key, raw),
        }),
        Err(_) => Ok(None),
    }
}

fn env_policy(delay_key: &str, max_key: &str, default_delay_ms: u64) -> Result<RetryPolicy> {
    let delay_ms = env_parse(delay_key, default_delay_ms)?;
    let max_retries = env_opt(max_key)?;
    Ok(RetryPolicy {
        delay_ms,
        max_retries,
    })
}

fn read_json<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Configuration for the batch translator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Sent as the `key` form field; not checked locally
    pub api_key: String,
    /// Translation endpoint URL
    pub api_endpoint: String,
    /// Maximum texts per request
    pub batch_cap: usize,
    /// Sent as the `format` form field
    pub format: String,
    /// Applied to 403 and 503 responses
    pub status_retry: RetryPolicy,
    /// Applied to connection failures, including dropped connections and timeouts
    pub connect_retry: RetryPolicy,
    /// Per-request timeout; `None` waits indefinitely
    pub timeout_ms: Option<u64>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_endpoint: DEFAULT_TRANSLATE_ENDPOINT.to_string(),
            batch_cap: DEFAULT_BATCH_CAP,
            format: "text".to_string(),
            status_retry: RetryPolicy::unbounded(Duration::from_secs(10)),
            connect_retry: RetryPolicy::unbounded(Duration::ZERO),
            timeout_ms: None,
        }
    }
}

impl TranslatorConfig {
    /// Create a configuration carrying the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        // A missing key is reported by the provider, not here
        let api_key = std::env::var("GOOGLE_API_KEY").unwrap_or_default();
        let api_endpoint = env_or("TRANSLATE_ENDPOINT", DEFAULT_TRANSLATE_ENDPOINT);
        let batch_cap = env_parse("TRANSLATE_BATCH_CAP", defaults.batch_cap)?;
        let status_retry = env_policy(
            "TRANSLATE_RETRY_DELAY_MS",
            "TRANSLATE_MAX_RETRIES",
            defaults.status_retry.delay_ms,
        )?;
        let timeout_ms = env_opt("REQUEST_TIMEOUT_MS")?.or(defaults.timeout_ms);

        Ok(Self {
            api_key,
            api_endpoint,
            batch_cap,
            status_retry,
            timeout_ms,
            ..defaults
        })
    }

    /// Load from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_json(path)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_endpoint.is_empty() {
            return Err(ClientError::ConfigError {
                message: "API endpoint is required".to_string(),
            });
        }

        if self.batch_cap == 0 {
            return Err(ClientError::ConfigError {
                message: "batch_cap must be greater than 0".to_string(),
            });
        }

        if self.api_key.is_empty() {
            warn!("No translation API key configured");
        }

        Ok(())
    }
}

/// Configuration for the tweet lookup client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Bearer token; not checked locally
    pub bearer_token: String,
    /// Lookup endpoint; the tweet ID is appended as a path segment
    pub base_url: String,
    /// Joined into the `tweet.fields` query parameter
    pub tweet_fields: Vec<String>,
    /// Applied to 429 and 503 responses
    pub status_retry: RetryPolicy,
    /// Per-request timeout; `None` waits indefinitely
    pub timeout_ms: Option<u64>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            bearer_token: String::new(),
            base_url: DEFAULT_LOOKUP_ENDPOINT.to_string(),
            tweet_fields: DEFAULT_TWEET_FIELDS.iter().map(|f| f.to_string()).collect(),
            status_retry: RetryPolicy::unbounded(Duration::from_secs(1)),
            timeout_ms: None,
        }
    }
}

impl LookupConfig {
    /// Create a configuration carrying the given bearer token
    pub fn new(bearer_token: impl Into<String>) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bearer_token = std::env::var("TWITTER_API_KEY").unwrap_or_default();
        let base_url = env_or("TWITTER_ENDPOINT", DEFAULT_LOOKUP_ENDPOINT);
        let status_retry = env_policy(
            "LOOKUP_RETRY_DELAY_MS",
            "LOOKUP_MAX_RETRIES",
            defaults.status_retry.delay_ms,
        )?;
        let timeout_ms = env_opt("REQUEST_TIMEOUT_MS")?.or(defaults.timeout_ms);

        Ok(Self {
            bearer_token,
            base_url,
            status_retry,
            timeout_ms,
            ..defaults
        })
    }

    /// Load from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_json(path)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::ConfigError {
                message: "Lookup base URL is required".to_string(),
            });
        }

        if self.bearer_token.is_empty() {
            warn!("No lookup bearer token configured");
        }

        Ok(())
    }

    /// Comma-joined `tweet.fields` value
    pub fn tweet_fields_param(&self) -> String {
        self.tweet_fields.join(",")
    }
}

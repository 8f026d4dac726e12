//! Tweet lookup client
//!
//! Fetches tweets one ID at a time and collects the tweet itself plus every
//! expanded object the API returned into per-category tables.

use indicatif::ProgressBar;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::core::config::LookupConfig;
use crate::core::errors::{ClientError, Result};
use crate::core::models::{flatten_record, key_string, Category, LookupResult};
use crate::core::retry::{send_with_retry, RetryRules};
use crate::core::transport::{HttpRequest, HttpTransport, ReqwestTransport};

/// Rate limited and service unavailable
const RETRY_STATUSES: &[u16] = &[429, 503];

#[derive(Debug, Deserialize)]
struct LookupBody {
    data: Option<Map<String, Value>>,
    #[serde(default)]
    includes: Map<String, Value>,
    meta: Option<Map<String, Value>>,
    errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    detail: Option<String>,
    title: Option<String>,
}

/// Looks up tweets by ID
#[derive(Debug, Clone)]
pub struct ContentLookup {
    transport: Arc<dyn HttpTransport>,
    config: Arc<LookupConfig>,
    progress: ProgressBar,
}

impl ContentLookup {
    /// Create a lookup client backed by `reqwest`
    pub fn new(config: LookupConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout_ms)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a lookup client over an arbitrary transport
    pub fn with_transport(config: LookupConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            transport,
            config: Arc::new(config),
            progress: ProgressBar::hidden(),
        })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        Self::new(LookupConfig::from_env()?)
    }

    /// Report per-ID progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Look up a single tweet
    pub async fn lookup_one(&self, id: u64) -> Result<LookupResult> {
        self.lookup_many(&[id]).await
    }

    /// Look up tweets in order, accumulating every response into one result
    pub async fn lookup_many(&self, ids: &[u64]) -> Result<LookupResult> {
        let mut result = LookupResult::new();
        self.progress.set_length(ids.len() as u64);

        for &id in ids {
            let body = self.fetch(id).await?;
            merge_response(&mut result, id, body)?;
            self.progress.inc(1);
        }

        debug!("Collected {} rows for {} tweets", result.total_rows(), ids.len());
        Ok(result)
    }

    fn build_request(&self, id: u64) -> HttpRequest {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), id);

        HttpRequest::get(url)
            .with_query("tweet.fields", self.config.tweet_fields_param())
            .with_bearer(self.config.bearer_token.clone())
    }

    async fn fetch(&self, id: u64) -> Result<LookupBody> {
        let request = self.build_request(id);
        let rules = RetryRules {
            statuses: RETRY_STATUSES,
            status_policy: self.config.status_retry,
            connect_policy: None,
        };

        let response = send_with_retry(self.transport.as_ref(), &request, &rules).await?;
        if response.status != 200 {
            return Err(ClientError::UpstreamStatus {
                status: response.status,
                body: response.body,
            });
        }

        let body: LookupBody = response.json()?;
        if body.data.is_none() {
            if let Some(error) = body.errors.as_ref().and_then(|errors| errors.first()) {
                let message = error
                    .detail
                    .clone()
                    .or_else(|| error.title.clone())
                    .unwrap_or_else(|| "Unknown lookup error".to_string());
                return Err(ClientError::upstream(None, message));
            }
        }

        Ok(body)
    }
}

fn merge_objects(result: &mut LookupResult, category: Category, objects: &[Value]) -> Result<()> {
    let index_field = category.index_field();
    let table = result.table_mut(category);

    for object in objects {
        let object = object.as_object().ok_or_else(|| {
            ClientError::invalid_response(format!("{} entry is not an object", category))
        })?;

        let mut fields = flatten_record(object);
        let key = fields
            .shift_remove(index_field)
            .as_ref()
            .and_then(key_string)
            .ok_or_else(|| {
                ClientError::invalid_response(format!("{} entry has no {}", category, index_field))
            })?;

        table.push(key, fields);
    }

    Ok(())
}

fn merge_response(result: &mut LookupResult, id: u64, body: LookupBody) -> Result<()> {
    if let Some(data) = body.data {
        merge_objects(result, Category::Tweets, &[Value::Object(data)])?;
    }

    for category in Category::ALL {
        let Some(section) = category.includes_key().and_then(|k| body.includes.get(k)) else {
            continue;
        };
        let objects = section.as_array().ok_or_else(|| {
            ClientError::invalid_response(format!("includes.{} is not a list", category))
        })?;
        merge_objects(result, category, objects)?;
    }

    if let Some(meta) = body.meta {
        result
            .table_mut(Category::Metadata)
            .push(id.to_string(), flatten_record(&meta));
    }

    Ok(())
}

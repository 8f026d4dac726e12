//! Batch translation client with retry logic

use indicatif::ProgressBar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::core::config::TranslatorConfig;
use crate::core::errors::{ClientError, Result};
use crate::core::models::{split_batches, TranslationBatch};
use crate::core::retry::{send_with_retry, RetryRules};
use crate::core::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Quota exceeded and service unavailable
const RETRY_STATUSES: &[u16] = &[403, 503];

#[derive(Debug, Deserialize)]
struct TranslateBody {
    data: Option<TranslateData>,
    error: Option<ErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedText {
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    code: Option<serde_json::Value>,
    message: Option<String>,
}

impl ErrorPayload {
    fn into_error(self) -> ClientError {
        let code = self.code.map(|c| match c {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        ClientError::upstream(code, self.message.unwrap_or_default())
    }
}

/// Translates texts in fixed-size batches, one request per batch
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    transport: Arc<dyn HttpTransport>,
    config: Arc<TranslatorConfig>,
    progress: ProgressBar,
}

impl BatchTranslator {
    /// Create a translator backed by `reqwest`
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout_ms)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a translator over an arbitrary transport
    pub fn with_transport(config: TranslatorConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            transport,
            config: Arc::new(config),
            progress: ProgressBar::hidden(),
        })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        Self::new(TranslatorConfig::from_env()?)
    }

    /// Report batch progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate a single text
    pub async fn translate_one(&self, text: &str, target_lang: &str) -> Result<String> {
        let mut translations = self.translate_many(&[text], target_lang).await?;
        // translate_many guarantees one output per input
        translations
            .pop()
            .ok_or_else(|| ClientError::invalid_response("No translation in response"))
    }

    /// Translate texts, returning one translation per input in input order
    pub async fn translate_many<S: AsRef<str>>(&self, texts: &[S], target_lang: &str) -> Result<Vec<String>> {
        debug!("Translating {} documents...", texts.len());

        let batches = split_batches(texts, self.config.batch_cap);
        debug!("Split the texts into {} batches.", batches.len());
        self.progress.set_length(batches.len() as u64);

        let mut all_translations = Vec::with_capacity(texts.len());
        for batch in batches {
            debug!("Translating batch {}...", batch.index);

            let translations = self.translate_batch(&batch, target_lang).await?;
            all_translations.extend(translations);

            debug!("Have now translated {} documents", all_translations.len());
            self.progress.inc(1);
        }

        Ok(all_translations)
    }

    fn build_request<S: AsRef<str>>(&self, batch: &TranslationBatch<'_, S>, target_lang: &str) -> HttpRequest {
        let mut form = vec![
            ("target".to_string(), target_lang.to_string()),
            ("format".to_string(), self.config.format.clone()),
            ("key".to_string(), self.config.api_key.clone()),
        ];
        form.extend(
            batch
                .items
                .iter()
                .map(|text| ("q".to_string(), text.as_ref().to_string())),
        );

        HttpRequest::post_form(&self.config.api_endpoint, form)
    }

    async fn translate_batch<S: AsRef<str>>(
        &self,
        batch: &TranslationBatch<'_, S>,
        target_lang: &str,
    ) -> Result<Vec<String>> {
        let request = self.build_request(batch, target_lang);
        let rules = RetryRules {
            statuses: RETRY_STATUSES,
            status_policy: self.config.status_retry,
            connect_policy: Some(self.config.connect_retry),
        };

        let response = send_with_retry(self.transport.as_ref(), &request, &rules).await?;
        let translations = parse_translations(&response)?;

        if translations.len() != batch.items.len() {
            return Err(ClientError::invalid_response(format!(
                "batch {} returned {} translations for {} texts",
                batch.index,
                translations.len(),
                batch.items.len()
            )));
        }

        Ok(translations)
    }
}

fn parse_translations(response: &HttpResponse) -> Result<Vec<String>> {
    let body: TranslateBody = match response.json() {
        Ok(body) => body,
        Err(_) if !response.is_success() => {
            return Err(ClientError::UpstreamStatus {
                status: response.status,
                body: response.body.clone(),
            });
        }
        Err(e) => return Err(e),
    };

    match body {
        TranslateBody {
            data: None,
            error: Some(error),
        } => Err(error.into_error()),
        TranslateBody { data: Some(data), .. } => Ok(data
            .translations
            .into_iter()
            .map(|t| t.translated_text)
            .collect()),
        TranslateBody { data: None, error: None } if !response.is_success() => {
            Err(ClientError::UpstreamStatus {
                status: response.status,
                body: response.body.clone(),
            })
        }
        TranslateBody { data: None, error: None } => {
            Err(ClientError::invalid_response("No translations in response"))
        }
    }
}

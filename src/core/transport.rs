//! HTTP transport abstraction
//!
//! Both clients talk to their provider through [`HttpTransport`], so the
//! retry and reshaping logic can be driven by a scripted transport in tests.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::error::Error as StdError;
use std::fmt::Debug;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::core::errors::{ClientError, Result};

/// HTTP method used by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET` with query parameters
    Get,
    /// `POST` with a form-encoded body
    Post,
}

/// Transport-neutral HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Query string pairs, repeated keys allowed
    pub query: Vec<(String, String)>,
    /// Form body pairs, repeated keys allowed
    pub form: Vec<(String, String)>,
    /// Sent as `Authorization: Bearer <token>`
    pub bearer_token: Option<String>,
}

impl HttpRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            form: Vec::new(),
            bearer_token: None,
        }
    }

    /// Create a form-encoded POST request
    pub fn post_form(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            form,
            bearer_token: None,
        }
    }

    /// Add a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Authenticate with a bearer token
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// All form values submitted under `key`, in order
    pub fn form_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.form
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: String,
}

impl HttpResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| ClientError::InvalidResponseError {
            message: format!("status {}: {}", self.status, e),
        })
    }
}

/// Failure before a response was received
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established, broke before a complete
    /// response arrived, or timed out
    #[error("Connection error: {0}")]
    Connect(String),

    /// Any other request failure (redirect loop, invalid URL, ...)
    #[error("Request error: {0}")]
    Request(String),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        ClientError::NetworkError {
            message: err.to_string(),
        }
    }
}

/// Sends requests to a provider
#[async_trait]
pub trait HttpTransport: Send + Sync + Debug {
    /// Send a single request; no retrying happens here
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport; `None` waits for the provider indefinitely
    pub fn new(timeout_ms: Option<u64>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10);
        if let Some(timeout_ms) = timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    fn classify(err: reqwest::Error) -> TransportError {
        if err.is_connect() || err.is_timeout() || is_connection_dropped(&err) {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Whether the connection was reset or closed after it had been accepted
fn is_connection_dropped(err: &reqwest::Error) -> bool {
    if !(err.is_request() || err.is_body() || err.is_decode()) {
        return false;
    }

    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(hyper_err) = cause.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() || hyper_err.is_closed() || hyper_err.is_canceled() {
                return true;
            }
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = cause.source();
    }

    false
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url).form(&request.form),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(Self::classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(Self::classify)?;

        debug!("{:?} {} resulted in status code {}", request.method, request.url, status);

        Ok(HttpResponse { status, body })
    }
}

//! Tweet Translator - batch translation and tweet lookup clients
//!
//! This library wraps a batch machine-translation API and a tweet lookup API.
//! Both clients retry transient failures with an injectable policy and
//! reshape responses into plain Rust values.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod clients;
pub mod core;

// Re-export key types for convenience
pub use clients::{lookup::ContentLookup, translator::BatchTranslator};
pub use crate::core::{
    config::{LookupConfig, RetryPolicy, TranslatorConfig},
    errors::{ClientError, Result},
    models::{Category, LookupResult, Row, Table},
    transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! Shared request, retry and data-model plumbing

pub mod config;
pub mod errors;
pub mod models;
pub mod retry;
pub mod transport;

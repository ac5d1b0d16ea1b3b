//! Marketplace access.
//!
//! This module provides a `MarketplaceClient` trait for fetching search
//! result pages and product details from the card marketplace. Clients do
//! not retry and do not cache; callers decide what to do with failures.

mod http;
mod types;

pub use http::HttpMarketplaceClient;
pub use types::*;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::EngineConfig;

/// Errors that can occur when fetching from the marketplace.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request was rejected before it was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Connection or transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("Request timeout")]
    Timeout,

    /// Marketplace answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response did not have the expected page structure.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl FetchError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidRequest(_) => "invalid_request",
            FetchError::Network(_) => "network",
            FetchError::Timeout => "timeout",
            FetchError::Http { .. } => "http",
            FetchError::Parse(_) => "parse",
        }
    }

    /// Whether asking again could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::InvalidRequest(_))
    }
}

/// Trait for marketplace backends.
#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Fetch one page (1-based) of listings matching `term`.
    async fn search(&self, term: &str, page: u32) -> Result<PageResult, FetchError>;

    /// Fetch the details of the product at `link`.
    async fn details(&self, link: &str) -> Result<DetailsResult, FetchError>;
}

/// Check the `search` preconditions shared by all clients.
pub fn validate_search(term: &str, page: u32) -> Result<(), FetchError> {
    if term.trim().is_empty() {
        return Err(FetchError::InvalidRequest(
            "search term cannot be empty".to_string(),
        ));
    }
    if page == 0 {
        return Err(FetchError::InvalidRequest(
            "pages are numbered from 1".to_string(),
        ));
    }
    Ok(())
}

/// Create the marketplace client for a resolved engine configuration.
pub fn create_marketplace_client(
    config: &EngineConfig,
) -> Result<Arc<dyn MarketplaceClient>, FetchError> {
    Ok(Arc::new(HttpMarketplaceClient::new(config.clone())?))
}

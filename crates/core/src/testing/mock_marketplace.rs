//! Mock marketplace for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::cache::normalize_term;
use crate::marketplace::{
    validate_search, DetailsResult, FetchError, ListingItem, MarketplaceClient, PageResult,
};

/// A recorded search for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    /// The term as it was passed in.
    pub term: String,
    /// Requested page (1-based).
    pub page: u32,
    /// When the search was made.
    pub timestamp: Instant,
}

/// Mock implementation of the MarketplaceClient trait.
///
/// Provides controllable behavior for testing:
/// - Serve configurable listings per term, split into pages
/// - Track searches for assertions
/// - Simulate failures
///
/// # Example
///
/// ```rust,ignore
/// use pokeprice_core::testing::{fixtures, MockMarketplace};
///
/// let marketplace = MockMarketplace::new(5);
/// marketplace.set_listings("bisaflor", fixtures::listings("Bisaflor", 7)).await;
///
/// let page = marketplace.search("Bisaflor", 2).await?;
/// assert_eq!(page.items.len(), 2);
/// assert_eq!(marketplace.search_count().await, 1);
/// ```
pub struct MockMarketplace {
    page_size: u32,
    /// Listings per normalized term.
    listings: Arc<RwLock<HashMap<String, Vec<ListingItem>>>>,
    /// Product details per link.
    details: Arc<RwLock<HashMap<String, DetailsResult>>>,
    /// Recorded searches.
    searches: Arc<RwLock<Vec<RecordedSearch>>>,
    /// If set, the next request will fail with this error.
    next_error: Arc<RwLock<Option<FetchError>>>,
}

impl std::fmt::Debug for MockMarketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockMarketplace")
            .field("page_size", &self.page_size)
            .field("listings", &"<listings>")
            .field("searches", &"<searches>")
            .finish()
    }
}

impl MockMarketplace {
    /// Create a mock serving pages of `page_size` listings.
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            listings: Arc::new(RwLock::new(HashMap::new())),
            details: Arc::new(RwLock::new(HashMap::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Set every listing the marketplace holds for `term`.
    pub async fn set_listings(&self, term: &str, listings: Vec<ListingItem>) {
        self.listings
            .write()
            .await
            .insert(normalize_term(term), listings);
    }

    /// Set the details returned for `link`.
    pub async fn set_details(&self, details: DetailsResult) {
        self.details
            .write()
            .await
            .insert(details.link.clone(), details);
    }

    /// Configure the next request to fail with the given error.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get recorded searches.
    pub async fn recorded_searches(&self) -> Vec<RecordedSearch> {
        self.searches.read().await.clone()
    }

    /// Get the number of searches performed.
    pub async fn search_count(&self) -> usize {
        self.searches.read().await.len()
    }

    /// Clear recorded searches.
    pub async fn clear_recorded(&self) {
        self.searches.write().await.clear();
    }
}

#[async_trait]
impl MarketplaceClient for MockMarketplace {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, term: &str, page: u32) -> Result<PageResult, FetchError> {
        validate_search(term, page)?;

        self.searches.write().await.push(RecordedSearch {
            term: term.to_string(),
            page,
            timestamp: Instant::now(),
        });

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let listings = self.listings.read().await;
        let all = listings
            .get(&normalize_term(term))
            .map(Vec::as_slice)
            .unwrap_or_default();

        let page_size = self.page_size as usize;
        let start = ((page - 1) as usize * page_size).min(all.len());
        let end = (start + page_size).min(all.len());
        let total_pages = (all.len() as u32).div_ceil(self.page_size).max(1);

        Ok(PageResult {
            items: all[start..end].to_vec(),
            page,
            total_pages,
        })
    }

    async fn details(&self, link: &str) -> Result<DetailsResult, FetchError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        self.details
            .read()
            .await
            .get(link)
            .cloned()
            .ok_or_else(|| FetchError::Http {
                status: 404,
                message: format!("no product at {}", link),
            })
    }
}

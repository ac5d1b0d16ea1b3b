//! Types for the local search cache.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::marketplace::ListingItem;

/// Identifier of the single remote key row shared by every search term.
///
/// All terms read and write the same pagination cursor, so paging two terms
/// in turn makes the second overwrite the first's offset.
pub const REMOTE_KEY_ID: &str = "cm";

/// Normalize a search term for storage and lookup.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// A search term that has been fetched at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Search {
    pub id: String,
    /// Trimmed, lower-cased term.
    pub term: String,
    /// Number of results fetched for this term so far.
    pub result_count: u32,
    pub updated_at: DateTime<Utc>,
    /// Whether the search shows up in the history list.
    pub history: bool,
}

impl Search {
    /// Create a new search for `term`, listed in history.
    pub fn new(term: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            term: normalize_term(term),
            result_count: 0,
            updated_at: Utc::now(),
            history: true,
        }
    }

    /// Whether the search was last updated more than `max_age` before `now`.
    pub fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now - self.updated_at > max_age
    }
}

/// One cached search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    pub id: String,
    pub search_id: String,
    pub name: String,
    pub original_name: String,
    /// Product link; the natural key for price updates.
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_trend: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ResultItem {
    /// Stable row id for a listing within a search.
    pub fn item_id(search_id: &str, link: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(search_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(link.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Build the cached row for `listing` as a result of `search_id`.
    pub fn from_listing(search_id: &str, listing: &ListingItem, now: DateTime<Utc>) -> Self {
        Self {
            id: Self::item_id(search_id, &listing.link),
            search_id: search_id.to_string(),
            name: listing.name.clone(),
            original_name: listing.original_name.clone(),
            link: listing.link.clone(),
            image_link: listing.image_link.clone(),
            price: listing.price.clone(),
            price_trend: listing.price_trend.clone(),
            updated_at: now,
        }
    }
}

/// Pagination cursor for the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteKey {
    pub id: String,
    /// Offset of the next result to fetch; 0 once pagination is exhausted.
    pub next_offset: u32,
}

impl RemoteKey {
    /// The shared cursor positioned at `next_offset`.
    pub fn shared(next_offset: u32) -> Self {
        Self {
            id: REMOTE_KEY_ID.to_string(),
            next_offset,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_offset == 0
    }
}

/// Everything one fetched page writes, committed atomically.
#[derive(Debug, Clone)]
pub struct PageWrite {
    pub search: Search,
    pub items: Vec<ResultItem>,
    pub remote_key: RemoteKey,
}

/// Errors from the cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

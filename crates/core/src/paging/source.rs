//! Paged view over a term's cached results.

use std::sync::Arc;

use crate::cache::{normalize_term, with_store, CacheStore, ResultItem};

use super::PagingError;

/// One page read from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub data: Vec<ResultItem>,
    /// Key of the previous page, `None` on the first page.
    pub prev_key: Option<u32>,
    /// Key of the next page, `None` when this page was not full.
    pub next_key: Option<u32>,
}

/// Outcome of a source load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    Page(Page),
    /// The cache changed since the source was created; build a new source.
    Invalid,
}

/// Lazy, page-by-page reader of cached results for one term.
///
/// Keys are 0-based page indexes. The source remembers the cache generation
/// it was created at and reports [`LoadResult::Invalid`] once any write has
/// been committed since.
pub struct PagedSource {
    store: Arc<dyn CacheStore>,
    term: String,
    page_size: u32,
    generation: u64,
}

impl PagedSource {
    pub fn new(store: Arc<dyn CacheStore>, term: &str, page_size: u32) -> Self {
        let generation = store.generation();
        Self {
            store,
            term: normalize_term(term),
            page_size: page_size.max(1),
            generation,
        }
    }

    /// Whether a cache write has happened since the source was created.
    pub fn is_invalid(&self) -> bool {
        self.store.generation() != self.generation
    }

    /// Load the page at `key`.
    pub async fn load(&self, key: u32) -> Result<LoadResult, PagingError> {
        if self.is_invalid() {
            return Ok(LoadResult::Invalid);
        }

        let term = self.term.clone();
        let limit = self.page_size;
        let offset = key * self.page_size;
        let data = with_store(&self.store, move |store| {
            store.find_results_by_query(&term, limit, offset)
        })
        .await?;

        // A write may have landed while the query ran
        if self.is_invalid() {
            return Ok(LoadResult::Invalid);
        }

        let next_key = if data.len() as u32 == self.page_size {
            Some(key + 1)
        } else {
            None
        };

        Ok(LoadResult::Page(Page {
            data,
            prev_key: key.checked_sub(1),
            next_key,
        }))
    }
}

//! Local search cache.
//!
//! Stores searches, their result rows and the marketplace pagination cursor
//! (the remote key). Paged reads are served from here; the network is only
//! touched by the mediator, which writes each fetched page back through
//! [`CacheStore::write_page`].
//!
//! Every committed write bumps a generation counter. Readers that captured a
//! generation can tell their view has gone stale and re-query.

mod sqlite;
mod types;

pub use sqlite::SqliteCache;
pub use types::*;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::watch;

use crate::registry::Registry;

/// Open caches, one per database path.
static OPEN_CACHES: Lazy<Registry<PathBuf, Arc<SqliteCache>>> = Lazy::new(Registry::new);

/// Open the cache at `path`, or return the instance already open for it.
pub fn open_shared(path: &Path) -> Result<Arc<SqliteCache>, CacheError> {
    OPEN_CACHES.get_or_try_init(&path.to_path_buf(), || SqliteCache::new(path).map(Arc::new))
}

/// Run a blocking cache operation on the blocking thread pool.
pub async fn with_store<T, F>(store: &Arc<dyn CacheStore>, f: F) -> Result<T, CacheError>
where
    F: FnOnce(&dyn CacheStore) -> Result<T, CacheError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| CacheError::Internal(format!("cache task failed: {}", e)))?
}

/// Trait for cache storage backends.
pub trait CacheStore: Send + Sync {
    /// Find the search for `term`, ignoring case.
    fn find_search(&self, term: &str) -> Result<Option<Search>, CacheError>;

    /// Results of a search in insertion order.
    fn find_results_by_search_id(
        &self,
        search_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ResultItem>, CacheError>;

    /// Results for `term` in insertion order.
    fn find_results_by_query(
        &self,
        term: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ResultItem>, CacheError>;

    /// Number of cached results for `term`.
    fn count_results_by_query(&self, term: &str) -> Result<u32, CacheError>;

    /// Insert or replace a search by id. Returns the id.
    fn upsert_search(&self, search: &Search) -> Result<String, CacheError>;

    /// Insert or replace result rows by id. Returns the ids in input order.
    fn upsert_results(&self, items: &[ResultItem]) -> Result<Vec<String>, CacheError>;

    /// Remove a search row. Its results are left in place.
    fn remove_search(&self, search: &Search) -> Result<(), CacheError>;

    /// Remove result rows by id.
    fn remove_results(&self, items: &[ResultItem]) -> Result<(), CacheError>;

    fn remote_key(&self, id: &str) -> Result<Option<RemoteKey>, CacheError>;

    fn upsert_remote_key(&self, key: &RemoteKey) -> Result<(), CacheError>;

    fn delete_remote_key(&self, id: &str) -> Result<(), CacheError>;

    /// Persist one fetched page in a single transaction: the search row, its
    /// items and the new remote key are all written or none are. The search's
    /// `result_count` is set to the number of rows cached for it.
    fn write_page(&self, page: &PageWrite) -> Result<(), CacheError>;

    /// Remove a term's results, its search row and the remote key in a single
    /// transaction. Returns false when the term was never searched.
    fn clear_history(&self, term: &str) -> Result<bool, CacheError>;

    /// Searches flagged for history, most recently updated first.
    fn history(&self) -> Result<Vec<Search>, CacheError>;

    /// Update the price of every cached row for `link`. Returns the number of
    /// rows touched.
    fn update_prices(
        &self,
        link: &str,
        price: &str,
        price_trend: Option<&str>,
    ) -> Result<u32, CacheError>;

    /// Current write generation.
    fn generation(&self) -> u64;

    /// Receiver notified after every committed write.
    fn subscribe(&self) -> watch::Receiver<u64>;
}

//! Paging lifecycle integration tests.
//!
//! These tests drive pagers against an on-disk cache and a mock marketplace:
//! - First page refresh and appends past the cached pages
//! - End of pagination on short and exactly-full last pages
//! - Case-insensitive terms sharing one search row
//! - The remote key shared by every term
//! - Failed fetches leaving the cache untouched

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use pokeprice_core::{
    marketplace::FetchError,
    testing::{fixtures, MockMarketplace},
    CacheStore, Pager, PagingError, Registry, SqliteCache, REMOTE_KEY_ID,
};

const PAGE_SIZE: u32 = 5;
const CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Test helper holding the cache and marketplace shared by pagers.
struct TestHarness {
    store: Arc<SqliteCache>,
    marketplace: Arc<MockMarketplace>,
    db_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("cache.db");
        let store = Arc::new(SqliteCache::new(&db_path).expect("Failed to open cache"));

        Self {
            store,
            marketplace: Arc::new(MockMarketplace::new(PAGE_SIZE)),
            db_path,
            _temp_dir: temp_dir,
        }
    }

    async fn with_listings(self, term: &str, count: u32) -> Self {
        self.marketplace
            .set_listings(term, fixtures::listings(term, count))
            .await;
        self
    }

    fn pager(&self, term: &str) -> Pager {
        Pager::new(
            term,
            Arc::clone(&self.store) as Arc<dyn CacheStore>,
            self.marketplace.clone(),
            PAGE_SIZE,
            CACHE_TTL,
        )
    }

    fn next_offset(&self) -> Option<u32> {
        self.store
            .remote_key(REMOTE_KEY_ID)
            .expect("Failed to read remote key")
            .map(|key| key.next_offset)
    }
}

#[tokio::test]
async fn test_bisaflor_second_page_appends_remaining_listings() {
    let harness = TestHarness::new().with_listings("Bisaflor", 7).await;
    let pager = harness.pager("Bisaflor");

    let state = pager.start().await.unwrap();
    assert_eq!(state.items.len(), 5);
    assert_eq!(state.pages_loaded, 1);
    assert_eq!(harness.next_offset(), Some(5));

    let state = pager.load_next().await.unwrap();
    assert_eq!(state.items.len(), 7);
    assert_eq!(state.pages_loaded, 2);
    assert!(state.load_states.append.is_end_of_pagination());
    assert_eq!(state.items[6].name, "Bisaflor #6");

    let searches = harness.marketplace.recorded_searches().await;
    let pages: Vec<u32> = searches.iter().map(|s| s.page).collect();
    assert_eq!(pages, vec![1, 2]);
    assert_eq!(harness.next_offset(), Some(10));

    let search = harness.store.find_search("bisaflor").unwrap().unwrap();
    assert_eq!(search.result_count, 7);
}

#[tokio::test]
async fn test_exactly_full_last_page_needs_one_more_fetch() {
    let harness = TestHarness::new().with_listings("mew", 10).await;
    let pager = harness.pager("mew");
    pager.start().await.unwrap();

    let state = pager.load_next().await.unwrap();
    assert_eq!(state.items.len(), 10);
    assert!(!state.load_states.append.is_end_of_pagination());

    // The empty third page is what ends pagination
    let state = pager.load_next().await.unwrap();
    assert_eq!(state.items.len(), 10);
    assert_eq!(state.pages_loaded, 2);
    assert!(state.load_states.append.is_end_of_pagination());
    assert_eq!(harness.marketplace.search_count().await, 3);
}

#[tokio::test]
async fn test_terms_differing_in_case_share_search_row() {
    let harness = TestHarness::new().with_listings("pikachu", 7).await;

    harness.pager("Pikachu").start().await.unwrap();
    let search = harness.store.find_search("pikachu").unwrap().unwrap();
    assert_eq!(search.term, "pikachu");

    let state = harness.pager("PIKACHU ").start().await.unwrap();
    assert_eq!(state.items.len(), 5);
    assert_eq!(harness.store.find_search("Pikachu").unwrap().unwrap().id, search.id);
    assert_eq!(harness.store.history().unwrap().len(), 1);
    // Second start was served from the fresh cache
    assert_eq!(harness.marketplace.search_count().await, 1);
}

#[tokio::test]
async fn test_second_term_overwrites_shared_remote_key() {
    let harness = TestHarness::new()
        .with_listings("mew", 12)
        .await
        .with_listings("pikachu", 12)
        .await;

    let mew = harness.pager("mew");
    mew.start().await.unwrap();
    mew.load_next().await.unwrap();
    assert_eq!(harness.next_offset(), Some(10));

    harness.pager("pikachu").start().await.unwrap();
    assert_eq!(harness.next_offset(), Some(5));

    // mew continues from pikachu's offset and fetches its second page again
    harness.marketplace.clear_recorded().await;
    let state = mew.load_next().await.unwrap();
    let searches = harness.marketplace.recorded_searches().await;
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].term, "mew");
    assert_eq!(searches[0].page, 2);
    assert_eq!(state.items.len(), 10);
    assert_eq!(harness.store.count_results_by_query("mew").unwrap(), 10);
}

#[tokio::test]
async fn test_failed_first_fetch_leaves_cache_empty() {
    let harness = TestHarness::new().with_listings("mew", 7).await;
    harness
        .marketplace
        .set_next_error(FetchError::Network("connection refused".into()))
        .await;

    let pager = harness.pager("mew");
    let result = pager.start().await;
    assert!(matches!(
        result,
        Err(PagingError::Fetch(FetchError::Network(_)))
    ));

    assert!(harness.store.find_search("mew").unwrap().is_none());
    assert_eq!(harness.next_offset(), None);
    assert!(pager.snapshot().items.is_empty());

    // Refresh retries the same load
    let state = pager.refresh().await.unwrap();
    assert_eq!(state.items.len(), 5);
}

#[tokio::test]
async fn test_cleared_history_ends_pagination() {
    let harness = TestHarness::new().with_listings("mew", 12).await;
    let pager = harness.pager("mew");
    pager.start().await.unwrap();

    assert!(harness.store.clear_history("mew").unwrap());
    assert_eq!(harness.next_offset(), None);

    // No remote key left to continue from
    let state = pager.load_next().await.unwrap();
    assert!(state.load_states.append.is_end_of_pagination());
    assert!(state.items.is_empty());
    assert_eq!(harness.marketplace.search_count().await, 1);
}

#[tokio::test]
async fn test_cache_survives_reopen() {
    let harness = TestHarness::new().with_listings("mew", 7).await;
    harness.pager("mew").start().await.unwrap();

    let reopened = Arc::new(SqliteCache::new(&harness.db_path).unwrap());
    let pager = Pager::new("mew", reopened, harness.marketplace.clone(), PAGE_SIZE, CACHE_TTL);
    let state = pager.start().await.unwrap();

    assert_eq!(state.items.len(), 5);
    assert_eq!(harness.marketplace.search_count().await, 1);
}

#[tokio::test]
async fn test_registry_shares_pager_per_term() {
    let harness = TestHarness::new().with_listings("mew", 7).await;
    let registry: Registry<(PathBuf, String), Arc<Pager>> = Registry::new();

    let key = (harness.db_path.clone(), pokeprice_core::normalize_term("Mew"));
    let first = registry
        .get_or_try_init(&key, || Ok::<_, PagingError>(Arc::new(harness.pager("Mew"))))
        .unwrap();
    first.start().await.unwrap();

    let second = registry
        .get_or_try_init(&key, || Ok::<_, PagingError>(Arc::new(harness.pager("mew"))))
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.snapshot().items.len(), 5);
}

#[tokio::test]
async fn test_concurrent_appends_are_serialized() {
    let harness = TestHarness::new().with_listings("Glurak", 12).await;
    let pager = harness.pager("glurak");
    pager.start().await.unwrap();

    let results = futures::future::join_all([pager.load_next(), pager.load_next()]).await;
    assert!(results.iter().all(Result::is_ok));

    let state = pager.snapshot();
    assert_eq!(state.items.len(), 12);
    assert_eq!(state.pages_loaded, 3);
    assert!(state.load_states.append.is_end_of_pagination());

    let pages: Vec<u32> = harness
        .marketplace
        .recorded_searches()
        .await
        .iter()
        .map(|s| s.page)
        .collect();
    assert_eq!(pages, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_reopened_pager_on_finished_term_keeps_result_count() {
    let harness = TestHarness::new().with_listings("Bisaflor", 7).await;

    let first = harness.pager("Bisaflor");
    first.start().await.unwrap();
    first.load_next().await.unwrap();
    assert_eq!(harness.next_offset(), Some(10));
    drop(first);

    let second = harness.pager("bisaflor");
    second.start().await.unwrap();
    let state = second.load_next().await.unwrap();
    assert_eq!(state.items.len(), 7);
    assert!(state.load_states.append.is_end_of_pagination());

    // The append past the end fetched nothing
    assert_eq!(harness.marketplace.search_count().await, 3);
    let search = harness.store.find_search("bisaflor").unwrap().unwrap();
    assert_eq!(search.result_count, 7);
    assert_eq!(harness.store.count_results_by_query("bisaflor").unwrap(), 7);
}

//! Remote mediator: fetches marketplace pages into the cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::{
    normalize_term, with_store, CacheStore, PageWrite, RemoteKey, ResultItem, Search,
    REMOTE_KEY_ID,
};
use crate::marketplace::MarketplaceClient;
use crate::metrics::{ITEMS_PERSISTED, MEDIATOR_LOADS};

use super::{InitializeAction, LoadType, MediatorOutcome, PagingError};

/// Loads pages for one search term from the marketplace into the cache.
///
/// The mediator decides whether a fetch is needed, fetches a single page and
/// persists the items, the search row and the next remote key in one cache
/// transaction. It never retries; a failed load writes nothing.
pub struct RemoteMediator {
    term: String,
    store: Arc<dyn CacheStore>,
    client: Arc<dyn MarketplaceClient>,
    page_size: u32,
    cache_ttl: Duration,
}

impl RemoteMediator {
    pub fn new(
        term: &str,
        store: Arc<dyn CacheStore>,
        client: Arc<dyn MarketplaceClient>,
        page_size: u32,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            term: normalize_term(term),
            store,
            client,
            page_size: page_size.max(1),
            cache_ttl,
        }
    }

    /// The normalized search term.
    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Decide whether the pager has to fetch the first page before serving.
    ///
    /// A term searched within the cache TTL is served from the cache. Cache
    /// errors fall back to a refresh.
    pub async fn initialize(&self) -> InitializeAction {
        let term = self.term.clone();
        let search = match with_store(&self.store, move |store| store.find_search(&term)).await {
            Ok(search) => search,
            Err(e) => {
                warn!(term = %self.term, error = %e, "Failed to read search, refreshing");
                return InitializeAction::LaunchInitialRefresh;
            }
        };

        let max_age = chrono::Duration::from_std(self.cache_ttl).unwrap_or(chrono::Duration::MAX);
        match search {
            Some(search) if !search.is_older_than(max_age, Utc::now()) => {
                debug!(term = %self.term, "Cached search is fresh");
                InitializeAction::SkipInitialRefresh
            }
            _ => InitializeAction::LaunchInitialRefresh,
        }
    }

    /// Run one load.
    pub async fn load(&self, load_type: LoadType) -> Result<MediatorOutcome, PagingError> {
        let result = self.load_inner(load_type).await;

        let outcome = match &result {
            Ok(o) if o.end_of_pagination_reached => "end_of_pagination",
            Ok(_) => "success",
            Err(_) => "error",
        };
        MEDIATOR_LOADS
            .with_label_values(&[load_type.as_str(), outcome])
            .inc();

        if let Err(e) = &result {
            warn!(term = %self.term, load_type = load_type.as_str(), error = %e, "Load failed");
        }
        result
    }

    async fn load_inner(&self, load_type: LoadType) -> Result<MediatorOutcome, PagingError> {
        let offset = match load_type {
            // Results have no page before the first one
            LoadType::Prepend => {
                return Ok(MediatorOutcome {
                    end_of_pagination_reached: true,
                })
            }
            LoadType::Refresh => 0,
            LoadType::Append => {
                let key = with_store(&self.store, |store| store.remote_key(REMOTE_KEY_ID)).await?;
                match key {
                    Some(key) if !key.is_exhausted() => key.next_offset,
                    _ => {
                        debug!(term = %self.term, "No remote key, pagination exhausted");
                        return Ok(MediatorOutcome {
                            end_of_pagination_reached: true,
                        });
                    }
                }
            }
        };

        let page = offset / self.page_size + 1;
        debug!(
            term = %self.term,
            load_type = load_type.as_str(),
            offset,
            page,
            "Fetching page from marketplace"
        );

        let result = self.client.search(&self.term, page).await?;
        let fetched = result.items.len() as u32;
        let next_offset = offset + self.page_size;

        let term = self.term.clone();
        with_store(&self.store, move |store| {
            let now = Utc::now();
            let mut search = store
                .find_search(&term)?
                .unwrap_or_else(|| Search::new(&term));
            search.updated_at = now;
            search.history = true;

            let items = result
                .items
                .iter()
                .map(|listing| ResultItem::from_listing(&search.id, listing, now))
                .collect();

            store.write_page(&PageWrite {
                search,
                items,
                remote_key: RemoteKey::shared(next_offset),
            })
        })
        .await?;

        ITEMS_PERSISTED.inc_by(fetched as u64);

        let end_of_pagination_reached = fetched < self.page_size;
        info!(
            term = %self.term,
            load_type = load_type.as_str(),
            page,
            fetched,
            next_offset,
            end_of_pagination_reached,
            "Stored marketplace page"
        );

        Ok(MediatorOutcome {
            end_of_pagination_reached,
        })
    }
}

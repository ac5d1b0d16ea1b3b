//! Pager: hosts a paged source and a mediator for one search term.

use std::sync::{Arc, PoisonError, Weak};
use std::time::{Duration, Instant};

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{normalize_term, CacheStore, ResultItem};
use crate::marketplace::MarketplaceClient;
use crate::metrics::{CACHE_PAGE_HITS, CACHE_PAGE_MISSES};

use super::{
    InitializeAction, LoadResult, LoadState, LoadType, PagedSource, PagingError, PagingState,
    RemoteMediator,
};

/// Reloads of a freshly created source before giving up on a busy cache.
const MAX_MATERIALIZE_ATTEMPTS: u32 = 3;

/// Loaded pages and the source they came from.
struct Loaded {
    source: PagedSource,
    items: Vec<ResultItem>,
    pages_loaded: u32,
    /// Key of the next cached page, `None` when the last loaded page was short.
    next_key: Option<u32>,
}

/// Paginated search for one term.
///
/// Pages are read from the cache through a [`PagedSource`]. When the cache
/// runs out, the [`RemoteMediator`] fetches the next marketplace page, the
/// source is replaced and the loaded pages are read again. Operations on one
/// pager are serialized; the current [`PagingState`] is published on a watch
/// channel, so late subscribers see the latest value.
pub struct Pager {
    term: String,
    store: Arc<dyn CacheStore>,
    mediator: RemoteMediator,
    page_size: u32,
    loaded: Mutex<Loaded>,
    state: watch::Sender<PagingState>,
    last_used: std::sync::Mutex<Instant>,
}

impl Pager {
    pub fn new(
        term: &str,
        store: Arc<dyn CacheStore>,
        client: Arc<dyn MarketplaceClient>,
        page_size: u32,
        cache_ttl: Duration,
    ) -> Self {
        let term = normalize_term(term);
        let page_size = page_size.max(1);
        let mediator = RemoteMediator::new(&term, Arc::clone(&store), client, page_size, cache_ttl);
        let (state, _) = watch::channel(PagingState::new(&term));

        Self {
            loaded: Mutex::new(Loaded {
                source: PagedSource::new(Arc::clone(&store), &term, page_size),
                items: Vec::new(),
                pages_loaded: 0,
                next_key: Some(0),
            }),
            term,
            store,
            mediator,
            page_size,
            state,
            last_used: std::sync::Mutex::new(Instant::now()),
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Current state.
    pub fn snapshot(&self) -> PagingState {
        self.state.borrow().clone()
    }

    /// Time since the last start, refresh or page load.
    pub fn idle_for(&self) -> Duration {
        self.last_used
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    fn touch(&self) {
        *self
            .last_used
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Receiver for state changes. The current state is available right away.
    pub fn subscribe(&self) -> watch::Receiver<PagingState> {
        self.state.subscribe()
    }

    /// Load the first page, refreshing it from the marketplace unless the
    /// cached search is still fresh.
    pub async fn start(&self) -> Result<PagingState, PagingError> {
        self.touch();
        let mut loaded = self.loaded.lock().await;

        let prepend = self.mediator.load(LoadType::Prepend).await?;
        self.update_load_state(LoadType::Prepend, end_state(prepend.end_of_pagination_reached));

        match self.mediator.initialize().await {
            InitializeAction::LaunchInitialRefresh => {
                info!(term = %self.term, "Starting search with a refresh");
                self.run_refresh().await?;
            }
            InitializeAction::SkipInitialRefresh => {
                info!(term = %self.term, "Starting search from cache");
            }
        }

        self.materialize(&mut loaded, 1).await?;
        Ok(self.publish(&loaded))
    }

    /// Fetch the first page again and reload from it.
    pub async fn refresh(&self) -> Result<PagingState, PagingError> {
        self.touch();
        let mut loaded = self.loaded.lock().await;

        self.run_refresh().await?;
        self.materialize(&mut loaded, 1).await?;
        Ok(self.publish(&loaded))
    }

    /// Load one more page, from the cache when it holds a full page and from
    /// the marketplace otherwise.
    pub async fn load_next(&self) -> Result<PagingState, PagingError> {
        self.touch();
        let mut loaded = self.loaded.lock().await;

        if self.snapshot().load_states.append.is_end_of_pagination() {
            debug!(term = %self.term, "End of pagination reached");
            return Ok(self.publish(&loaded));
        }

        let cached = match loaded.next_key {
            Some(key) => Some(loaded.source.load(key).await?),
            None => None,
        };
        if let Some(LoadResult::Page(page)) = cached {
            if page.data.len() as u32 == self.page_size {
                CACHE_PAGE_HITS.inc();
                debug!(term = %self.term, pages_loaded = loaded.pages_loaded, "Serving page from cache");
                loaded.items.extend(page.data);
                loaded.pages_loaded += 1;
                loaded.next_key = page.next_key;
                return Ok(self.publish(&loaded));
            }
        }

        CACHE_PAGE_MISSES.inc();
        self.update_load_state(LoadType::Append, LoadState::Loading);
        match self.mediator.load(LoadType::Append).await {
            Ok(outcome) => {
                self.update_load_state(
                    LoadType::Append,
                    end_state(outcome.end_of_pagination_reached),
                );
            }
            Err(e) => {
                self.update_load_state(LoadType::Append, LoadState::from_error(&e));
                return Err(e);
            }
        }

        let target = loaded.pages_loaded + 1;
        self.materialize(&mut loaded, target).await?;
        Ok(self.publish(&loaded))
    }

    /// Watch the cache and reload the loaded pages when another writer
    /// changes it. The task exits after the pager is dropped.
    pub fn spawn_invalidation_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let pager: Weak<Self> = Arc::downgrade(self);
        let mut changes = self.store.subscribe();

        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let Some(pager) = pager.upgrade() else {
                    break;
                };
                if let Err(e) = pager.reload_if_invalid().await {
                    debug!(term = %pager.term, error = %e, "Failed to reload after cache change");
                }
            }
        })
    }

    async fn reload_if_invalid(&self) -> Result<(), PagingError> {
        let mut loaded = self.loaded.lock().await;
        if !loaded.source.is_invalid() {
            return Ok(());
        }

        debug!(term = %self.term, "Cache changed, reloading pages");
        let target = loaded.pages_loaded.max(1);
        self.materialize(&mut loaded, target).await?;
        self.publish(&loaded);
        Ok(())
    }

    async fn run_refresh(&self) -> Result<(), PagingError> {
        self.update_load_state(LoadType::Refresh, LoadState::Loading);
        match self.mediator.load(LoadType::Refresh).await {
            Ok(outcome) => {
                self.state.send_modify(|state| {
                    state.load_states.refresh = LoadState::idle();
                    // A short first page leaves nothing to append
                    state.load_states.append = end_state(outcome.end_of_pagination_reached);
                });
                Ok(())
            }
            Err(e) => {
                self.update_load_state(LoadType::Refresh, LoadState::from_error(&e));
                Err(e)
            }
        }
    }

    /// Replace the source and read pages `0..target_pages` from it.
    async fn materialize(&self, loaded: &mut Loaded, target_pages: u32) -> Result<(), PagingError> {
        let mut attempts = 0;

        'attempt: loop {
            attempts += 1;
            let source = PagedSource::new(Arc::clone(&self.store), &self.term, self.page_size);
            let mut items = Vec::new();
            let mut pages_loaded = 0;
            let mut next_key = Some(0);

            while pages_loaded < target_pages {
                let Some(key) = next_key else {
                    break;
                };
                match source.load(key).await? {
                    LoadResult::Page(page) => {
                        if page.data.is_empty() {
                            break;
                        }
                        items.extend(page.data);
                        pages_loaded += 1;
                        next_key = page.next_key;
                    }
                    LoadResult::Invalid if attempts < MAX_MATERIALIZE_ATTEMPTS => {
                        continue 'attempt;
                    }
                    // Keep what was read; the watcher reloads on the next change
                    LoadResult::Invalid => break,
                }
            }

            *loaded = Loaded {
                source,
                items,
                pages_loaded,
                next_key,
            };
            return Ok(());
        }
    }

    fn update_load_state(&self, load_type: LoadType, load_state: LoadState) {
        self.state
            .send_modify(|state| state.load_states.set(load_type, load_state));
    }

    fn publish(&self, loaded: &Loaded) -> PagingState {
        self.state.send_modify(|state| {
            state.items = loaded.items.clone();
            state.pages_loaded = loaded.pages_loaded;
        });
        self.snapshot()
    }
}

fn end_state(end_of_pagination_reached: bool) -> LoadState {
    LoadState::NotLoading {
        end_of_pagination_reached,
    }
}

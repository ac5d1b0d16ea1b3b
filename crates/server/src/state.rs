use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use pokeprice_core::{
    normalize_term, CacheStore, Config, MarketplaceClient, Pager, Registry, SanitizedConfig,
    Settings, SettingsStore,
};

/// Pagers are shared per database and normalized term.
type PagerKey = (PathBuf, String);

/// The marketplace client in use and the settings it was built from.
struct ActiveMarketplace {
    settings: Settings,
    client: Arc<dyn MarketplaceClient>,
}

/// Shared application state
pub struct AppState {
    config: Config,
    cache: Arc<dyn CacheStore>,
    settings: Arc<dyn SettingsStore>,
    /// Replaced when the settings select another engine or language.
    marketplace: RwLock<ActiveMarketplace>,
    pagers: Registry<PagerKey, Arc<Pager>>,
}

impl AppState {
    pub fn new(
        config: Config,
        cache: Arc<dyn CacheStore>,
        settings: Arc<dyn SettingsStore>,
        marketplace: Arc<dyn MarketplaceClient>,
        marketplace_settings: Settings,
    ) -> Self {
        Self {
            config,
            cache,
            settings,
            marketplace: RwLock::new(ActiveMarketplace {
                settings: marketplace_settings,
                client: marketplace,
            }),
            pagers: Registry::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings
    }

    /// The marketplace client built from the current settings.
    pub fn marketplace(&self) -> Arc<dyn MarketplaceClient> {
        Arc::clone(
            &self
                .marketplace
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .client,
        )
    }

    /// Settings the current marketplace client was built from.
    pub fn marketplace_settings(&self) -> Settings {
        self.marketplace
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .settings
    }

    /// Swap in a client built from `settings`. Pagers hold the previous
    /// client, so they are dropped and rebuilt on next use.
    ///
    /// Returns false, keeping the current client, when it was already built
    /// from `settings`.
    pub fn set_marketplace(&self, settings: Settings, client: Arc<dyn MarketplaceClient>) -> bool {
        let mut active = self
            .marketplace
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if active.settings == settings {
            return false;
        }
        *active = ActiveMarketplace { settings, client };
        self.pagers.clear();
        true
    }

    /// The pager for `term`, created on first use.
    pub fn pager(&self, term: &str) -> Arc<Pager> {
        let key = self.pager_key(term);
        self.pagers.get_or_init(&key, || {
            let pager = Arc::new(Pager::new(
                &key.1,
                Arc::clone(&self.cache),
                self.marketplace(),
                self.config.pager.page_size,
                Duration::from_secs(self.config.pager.cache_ttl_secs),
            ));
            pager.spawn_invalidation_watcher();
            pager
        })
    }

    /// The pager for `term` if one has been created.
    pub fn existing_pager(&self, term: &str) -> Option<Arc<Pager>> {
        self.pagers.get(&self.pager_key(term))
    }

    pub fn remove_pager(&self, term: &str) {
        self.pagers.remove(&self.pager_key(term));
    }

    pub fn pager_count(&self) -> usize {
        self.pagers.len()
    }

    /// Drop pagers idle for at least `max_idle`. Returns how many were dropped.
    pub fn evict_idle_pagers(&self, max_idle: Duration) -> usize {
        self.pagers.remove_where(|_, pager| pager.idle_for() >= max_idle)
    }

    /// Periodically drop pagers idle for longer than `pager.idle_timeout_secs`.
    /// The task ends once the state is dropped.
    pub fn spawn_pager_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let state: Weak<Self> = Arc::downgrade(self);
        let max_idle = Duration::from_secs(self.config.pager.idle_timeout_secs.max(1));

        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(max_idle / 2);
            loop {
                ticks.tick().await;
                let Some(state) = state.upgrade() else {
                    break;
                };
                let evicted = state.evict_idle_pagers(max_idle);
                if evicted > 0 {
                    debug!(evicted, remaining = state.pager_count(), "Dropped idle pagers");
                }
            }
        })
    }

    fn pager_key(&self, term: &str) -> PagerKey {
        (self.config.database.path.clone(), normalize_term(term))
    }
}

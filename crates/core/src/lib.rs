pub mod cache;
pub mod config;
pub mod marketplace;
pub mod metrics;
pub mod paging;
pub mod registry;
pub mod settings;
pub mod testing;

pub use cache::{
    normalize_term, open_shared, with_store, CacheError, CacheStore, PageWrite, RemoteKey,
    ResultItem, Search, SqliteCache, REMOTE_KEY_ID,
};
pub use config::{
    engine_config, load_config, load_config_from_str, validate_config, Config, ConfigError,
    EngineConfig, SanitizedConfig,
};
pub use marketplace::{
    create_marketplace_client, DetailsResult, FetchError, HttpMarketplaceClient, ListingItem,
    MarketplaceClient, PageResult,
};
pub use paging::{
    InitializeAction, LoadResult, LoadState, LoadStates, LoadType, MediatorOutcome, Page,
    PagedSource, Pager, PagingError, PagingState, RemoteMediator,
};
pub use registry::Registry;
pub use settings::{Engine, Language, Settings, SettingsError, SettingsStore, SqliteSettingsStore};

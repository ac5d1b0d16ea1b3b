use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pokeprice_core::{
    create_marketplace_client, engine_config, load_config, open_shared, validate_config,
    CacheStore, SettingsStore, SqliteSettingsStore,
};
use pokeprice_server::api::create_router;
use pokeprice_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("POKEPRICE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("Database path: {:?}", config.database.path);
    info!(
        "Pager: page size {}, cache TTL {}s, idle timeout {}s",
        config.pager.page_size, config.pager.cache_ttl_secs, config.pager.idle_timeout_secs
    );

    // Open the search cache (shared per database path)
    let cache: Arc<dyn CacheStore> =
        open_shared(&config.database.path).context("Failed to open search cache")?;
    info!("Search cache initialized");

    // Settings live in the same database
    let settings: Arc<dyn SettingsStore> = Arc::new(
        SqliteSettingsStore::new(&config.database.path)
            .context("Failed to create settings store")?,
    );
    let current = settings.load().context("Failed to load settings")?;
    info!(
        "Settings: language {}, engine {}",
        current.language, current.engine
    );

    // Create the marketplace client selected by the settings
    let engine = engine_config(&current, &config)
        .context("Marketplace engine selected by the settings is not configured")?;
    let marketplace =
        create_marketplace_client(&engine).context("Failed to create marketplace client")?;
    info!("Using marketplace client: {}", marketplace.name());

    // Create app state
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, cache, settings, marketplace, current));
    state.spawn_pager_reaper();

    // Create router
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

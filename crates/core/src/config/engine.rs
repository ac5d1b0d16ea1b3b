//! Resolves the marketplace engine to use from the settings snapshot.

use crate::settings::{Engine, Language, Settings};

use super::{Config, ConfigError};

/// Fully resolved marketplace client configuration.
///
/// One variant per engine, each carrying only the fields that engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineConfig {
    Direct {
        base_url: String,
        language: Language,
        page_size: u32,
        timeout_secs: u32,
    },
    Proxied {
        proxy_url: String,
        api_key: String,
        target_url: String,
        language: Language,
        page_size: u32,
        timeout_secs: u32,
    },
}

impl EngineConfig {
    pub fn engine(&self) -> Engine {
        match self {
            EngineConfig::Direct { .. } => Engine::Direct,
            EngineConfig::Proxied { .. } => Engine::Proxied,
        }
    }

    pub fn language(&self) -> Language {
        match self {
            EngineConfig::Direct { language, .. } | EngineConfig::Proxied { language, .. } => {
                *language
            }
        }
    }

    pub fn page_size(&self) -> u32 {
        match self {
            EngineConfig::Direct { page_size, .. } | EngineConfig::Proxied { page_size, .. } => {
                *page_size
            }
        }
    }

    pub fn timeout_secs(&self) -> u32 {
        match self {
            EngineConfig::Direct { timeout_secs, .. }
            | EngineConfig::Proxied { timeout_secs, .. } => *timeout_secs,
        }
    }
}

/// Build the engine configuration selected by `settings`.
///
/// The marketplace page size follows the pager's page size so that one
/// marketplace page maps onto one cached page.
pub fn engine_config(settings: &Settings, config: &Config) -> Result<EngineConfig, ConfigError> {
    let marketplace = &config.marketplace;
    let page_size = config.pager.page_size;
    let timeout_secs = marketplace.timeout_secs;

    match settings.engine {
        Engine::Direct => {
            let direct = marketplace.direct.as_ref().ok_or_else(|| {
                ConfigError::EngineNotConfigured("[marketplace.direct] is missing".to_string())
            })?;
            Ok(EngineConfig::Direct {
                base_url: direct.base_url.clone(),
                language: settings.language,
                page_size,
                timeout_secs,
            })
        }
        Engine::Proxied => {
            let proxied = marketplace.proxied.as_ref().ok_or_else(|| {
                ConfigError::EngineNotConfigured("[marketplace.proxied] is missing".to_string())
            })?;
            Ok(EngineConfig::Proxied {
                proxy_url: proxied.proxy_url.clone(),
                api_key: proxied.api_key.clone(),
                target_url: proxied.target_url.clone(),
                language: settings.language,
                page_size,
                timeout_secs,
            })
        }
    }
}

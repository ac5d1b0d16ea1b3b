use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pager: PagerConfig,
    pub marketplace: MarketplaceConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("pokeprice.db")
}

/// Pagination configuration shared by the pager, its source and the mediator.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PagerConfig {
    /// Rows per page (default: 5). Also the page size requested from the marketplace.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Cached searches younger than this are served without an initial refresh.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Pagers not used for this long are dropped from memory.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            cache_ttl_secs: default_cache_ttl(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

fn default_page_size() -> u32 {
    5
}

fn default_cache_ttl() -> u64 {
    60 * 60 * 24
}

fn default_idle_timeout() -> u64 {
    15 * 60
}

/// Marketplace access configuration.
///
/// Both engines may be configured; the user's settings pick which one is used.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketplaceConfig {
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Query the marketplace directly
    #[serde(default)]
    pub direct: Option<DirectEngineConfig>,
    /// Query the marketplace through a fetching proxy
    #[serde(default)]
    pub proxied: Option<ProxiedEngineConfig>,
}

fn default_timeout() -> u32 {
    30
}

/// Direct engine configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DirectEngineConfig {
    /// Marketplace query endpoint (e.g., "https://marketplace.example/api")
    pub base_url: String,
}

/// Proxied engine configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProxiedEngineConfig {
    /// Proxy endpoint that fetches `url` on our behalf
    pub proxy_url: String,
    /// Proxy API key
    pub api_key: String,
    /// Marketplace endpoint the proxy should fetch from
    pub target_url: String,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub pager: PagerConfig,
    pub marketplace: SanitizedMarketplaceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMarketplaceConfig {
    pub timeout_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct: Option<DirectEngineConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<SanitizedProxiedConfig>,
}

/// Sanitized proxy config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProxiedConfig {
    pub proxy_url: String,
    pub target_url: String,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            pager: config.pager.clone(),
            marketplace: SanitizedMarketplaceConfig {
                timeout_secs: config.marketplace.timeout_secs,
                direct: config.marketplace.direct.clone(),
                proxied: config
                    .marketplace
                    .proxied
                    .as_ref()
                    .map(|p| SanitizedProxiedConfig {
                        proxy_url: p.proxy_url.clone(),
                        target_url: p.target_url.clone(),
                        api_key_configured: !p.api_key.is_empty(),
                    }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[marketplace.direct]
base_url = "http://localhost:8900"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.pager.page_size, 5);
        assert_eq!(config.pager.cache_ttl_secs, 86_400);
        assert_eq!(config.marketplace.timeout_secs, 30);
        assert!(config.marketplace.proxied.is_none());
    }

    #[test]
    fn test_deserialize_missing_marketplace_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[database]
path = "/tmp/cards.db"

[pager]
page_size = 20
cache_ttl_secs = 600

[marketplace]
timeout_secs = 10

[marketplace.direct]
base_url = "http://localhost:8900"

[marketplace.proxied]
proxy_url = "http://proxy.local/fetch"
api_key = "secret"
target_url = "http://localhost:8900"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.path, PathBuf::from("/tmp/cards.db"));
        assert_eq!(config.pager.page_size, 20);
        assert_eq!(config.marketplace.timeout_secs, 10);
        assert_eq!(config.marketplace.proxied.unwrap().api_key, "secret");
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let toml = r#"
[marketplace.proxied]
proxy_url = "http://proxy.local/fetch"
api_key = "secret"
target_url = "http://localhost:8900"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        let json = serde_json::to_string(&sanitized).unwrap();

        assert!(!json.contains("secret"));
        assert!(json.contains("\"api_key_configured\":true"));
        assert!(!json.contains("\"direct\""));
    }
}

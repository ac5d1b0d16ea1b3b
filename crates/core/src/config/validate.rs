use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Pager page size is at least 1
/// - Pager idle timeout is not 0
/// - At least one marketplace engine is configured, with non-empty URLs
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.pager.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "pager.page_size must be at least 1".to_string(),
        ));
    }

    if config.pager.idle_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "pager.idle_timeout_secs cannot be 0".to_string(),
        ));
    }

    let marketplace = &config.marketplace;
    if marketplace.direct.is_none() && marketplace.proxied.is_none() {
        return Err(ConfigError::ValidationError(
            "marketplace needs a [marketplace.direct] or [marketplace.proxied] section"
                .to_string(),
        ));
    }

    if let Some(direct) = &marketplace.direct {
        if direct.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "marketplace.direct.base_url cannot be empty".to_string(),
            ));
        }
    }

    if let Some(proxied) = &marketplace.proxied {
        if proxied.proxy_url.trim().is_empty() || proxied.target_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "marketplace.proxied needs proxy_url and target_url".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DatabaseConfig, DirectEngineConfig, MarketplaceConfig, PagerConfig,
        ProxiedEngineConfig, ServerConfig,
    };

    fn valid_config() -> Config {
        Config {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            pager: PagerConfig::default(),
            marketplace: MarketplaceConfig {
                timeout_secs: 30,
                direct: Some(DirectEngineConfig {
                    base_url: "http://localhost:8900".to_string(),
                }),
                proxied: None,
            },
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = valid_config();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_page_size_zero_fails() {
        let mut config = valid_config();
        config.pager.page_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_idle_timeout_zero_fails() {
        let mut config = valid_config();
        config.pager.idle_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_no_engine_fails() {
        let mut config = valid_config();
        config.marketplace.direct = None;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_proxy_url_fails() {
        let mut config = valid_config();
        config.marketplace.proxied = Some(ProxiedEngineConfig {
            proxy_url: "  ".to_string(),
            api_key: "key".to_string(),
            target_url: "http://localhost:8900".to_string(),
        });
        assert!(validate_config(&config).is_err());
    }
}

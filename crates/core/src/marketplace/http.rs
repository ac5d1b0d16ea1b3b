//! HTTP marketplace client.
//!
//! Speaks the marketplace's JSON query interface, either directly or through
//! a fetching proxy that takes the target URL as a query parameter.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::metrics::{MARKETPLACE_DURATION, MARKETPLACE_REQUESTS};

use super::{
    validate_search, DetailsResult, FetchError, ListingItem, MarketplaceClient, PageResult,
};

/// HTTP client for the card marketplace.
pub struct HttpMarketplaceClient {
    client: Client,
    config: EngineConfig,
}

impl HttpMarketplaceClient {
    /// Create a new client for the given engine configuration.
    pub fn new(config: EngineConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs() as u64))
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// URL of `path` on the marketplace itself (no proxy).
    fn marketplace_url(base_url: &str, language: &str, path_and_query: &str) -> String {
        format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            language,
            path_and_query
        )
    }

    /// Wrap a marketplace URL according to the engine.
    fn engine_url(&self, path_and_query: &str) -> String {
        let language = self.config.language().code();
        match &self.config {
            EngineConfig::Direct { base_url, .. } => {
                Self::marketplace_url(base_url, language, path_and_query)
            }
            EngineConfig::Proxied {
                proxy_url,
                api_key,
                target_url,
                ..
            } => {
                let target = Self::marketplace_url(target_url, language, path_and_query);
                format!(
                    "{}?api_key={}&url={}",
                    proxy_url.trim_end_matches('/'),
                    urlencoding::encode(api_key),
                    urlencoding::encode(&target)
                )
            }
        }
    }

    /// Build the URL for a search request.
    fn build_search_url(&self, term: &str, page: u32) -> String {
        self.engine_url(&format!(
            "search?term={}&page={}&per_page={}",
            urlencoding::encode(term.trim()),
            page,
            self.config.page_size()
        ))
    }

    /// Build the URL for a details request.
    fn build_details_url(&self, link: &str) -> String {
        self.engine_url(&format!("details?link={}", urlencoding::encode(link)))
    }

    /// GET `url` and return the body of a successful response.
    async fn fetch(&self, operation: &str, url: &str) -> Result<String, FetchError> {
        let start = Instant::now();
        let result = self.fetch_inner(url).await;

        MARKETPLACE_DURATION
            .with_label_values(&[operation])
            .observe(start.elapsed().as_secs_f64());
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        MARKETPLACE_REQUESTS
            .with_label_values(&[operation, outcome])
            .inc();

        result
    }

    async fn fetch_inner(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Network(e.to_string())
            }
        })
    }
}

#[async_trait]
impl MarketplaceClient for HttpMarketplaceClient {
    fn name(&self) -> &str {
        self.config.engine().as_str()
    }

    async fn search(&self, term: &str, page: u32) -> Result<PageResult, FetchError> {
        validate_search(term, page)?;

        let url = self.build_search_url(term, page);
        debug!(engine = self.name(), term = %term, page, "Searching marketplace");

        let body = self.fetch("search", &url).await?;
        let result = parse_search_response(&body, page)?;

        debug!(
            term = %term,
            page,
            results = result.items.len(),
            total_pages = result.total_pages,
            "Marketplace search complete"
        );
        Ok(result)
    }

    async fn details(&self, link: &str) -> Result<DetailsResult, FetchError> {
        if link.trim().is_empty() {
            return Err(FetchError::InvalidRequest(
                "product link cannot be empty".to_string(),
            ));
        }

        let url = self.build_details_url(link);
        debug!(engine = self.name(), link = %link, "Fetching product details");

        let body = self.fetch("details", &url).await?;
        parse_details_response(&body, link)
    }
}

/// Parse a search response body. `page` is used when the body omits it.
fn parse_search_response(body: &str, page: u32) -> Result<PageResult, FetchError> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Parse(format!("search page: {}", e)))?;

    let page = response.page.unwrap_or(page);
    let total_pages = response.total_pages.unwrap_or(page).max(page);

    Ok(PageResult {
        items: response.items.into_iter().map(ListingItem::from).collect(),
        page,
        total_pages,
    })
}

/// Parse a details response body. `link` is used when the body omits it.
fn parse_details_response(body: &str, link: &str) -> Result<DetailsResult, FetchError> {
    let details: DetailsResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Parse(format!("product details: {}", e)))?;

    Ok(DetailsResult {
        link: details.link.unwrap_or_else(|| link.to_string()),
        original_name: details
            .original_name
            .unwrap_or_else(|| details.name.clone()),
        name: details.name,
        image_link: details.image_link,
        price: details.price,
        price_trend: details.price_trend,
        available: details.available,
    })
}

// Marketplace response types
#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<ApiListing>,
    page: Option<u32>,
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiListing {
    name: String,
    original_name: Option<String>,
    link: String,
    image_link: Option<String>,
    price: String,
    price_trend: Option<String>,
}

impl From<ApiListing> for ListingItem {
    fn from(api: ApiListing) -> Self {
        Self {
            original_name: api.original_name.unwrap_or_else(|| api.name.clone()),
            name: api.name,
            link: api.link,
            image_link: api.image_link,
            price: api.price,
            price_trend: api.price_trend,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    link: Option<String>,
    name: String,
    original_name: Option<String>,
    image_link: Option<String>,
    price: String,
    price_trend: Option<String>,
    available: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Language;

    fn direct_client() -> HttpMarketplaceClient {
        HttpMarketplaceClient::new(EngineConfig::Direct {
            base_url: "http://localhost:8900/".to_string(),
            language: Language::De,
            page_size: 5,
            timeout_secs: 30,
        })
        .unwrap()
    }

    #[test]
    fn test_build_search_url_direct() {
        let client = direct_client();
        let url = client.build_search_url("Mew ex", 2);

        assert_eq!(
            url,
            "http://localhost:8900/de/search?term=Mew%20ex&page=2&per_page=5"
        );
    }

    #[test]
    fn test_build_search_url_proxied() {
        let client = HttpMarketplaceClient::new(EngineConfig::Proxied {
            proxy_url: "http://proxy.local/fetch".to_string(),
            api_key: "k&y".to_string(),
            target_url: "http://localhost:8900".to_string(),
            language: Language::En,
            page_size: 5,
            timeout_secs: 30,
        })
        .unwrap();

        let url = client.build_search_url("pikachu", 1);
        assert!(url.starts_with("http://proxy.local/fetch?api_key=k%26y&url="));
        assert!(url.contains(&*urlencoding::encode(
            "http://localhost:8900/en/search?term=pikachu&page=1&per_page=5"
        )));
        assert_eq!(client.name(), "proxied");
    }

    #[test]
    fn test_build_details_url() {
        let client = direct_client();
        let url = client.build_details_url("https://marketplace.example/cards/mew");
        assert!(url.starts_with("http://localhost:8900/de/details?link="));
        assert!(url.contains("https%3A%2F%2Fmarketplace.example%2Fcards%2Fmew"));
    }

    #[test]
    fn test_parse_search_response() {
        let body = r#"{
            "items": [
                {"name": "Bisaflor", "original_name": "Venusaur", "link": "l1", "price": "3,50 €", "price_trend": "4,10 €"},
                {"name": "Mew", "link": "l2", "price": "1,00 €"}
            ],
            "page": 1,
            "total_pages": 4
        }"#;

        let page = parse_search_response(body, 1).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.items[0].original_name, "Venusaur");
        // Missing original name falls back to the display name
        assert_eq!(page.items[1].original_name, "Mew");
    }

    #[test]
    fn test_parse_search_response_missing_counts() {
        let page = parse_search_response(r#"{"items": []}"#, 3).unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_parse_search_response_wrong_structure() {
        let result = parse_search_response("<html>maintenance</html>", 1);
        assert!(matches!(result, Err(FetchError::Parse(_))));

        let result = parse_search_response(r#"{"results": []}"#, 1);
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_parse_details_response() {
        let body = r#"{"name": "Mew", "price": "2,00 €", "available": 31}"#;
        let details = parse_details_response(body, "l2").unwrap();
        assert_eq!(details.link, "l2");
        assert_eq!(details.original_name, "Mew");
        assert_eq!(details.available, Some(31));
    }

    #[tokio::test]
    async fn test_search_rejects_invalid_request_without_network() {
        let client = direct_client();
        let result = client.search("", 1).await;
        assert!(matches!(result, Err(FetchError::InvalidRequest(_))));

        let result = client.details(" ").await;
        assert!(matches!(result, Err(FetchError::InvalidRequest(_))));
    }
}

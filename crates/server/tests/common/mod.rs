//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock marketplace injected, enabling end-to-end API testing
//! without network access.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use pokeprice_core::{
    config::{
        DatabaseConfig, DirectEngineConfig, MarketplaceConfig, PagerConfig, ServerConfig,
    },
    testing::MockMarketplace,
    CacheStore, Config, MarketplaceClient, Settings, SettingsStore, SqliteCache,
    SqliteSettingsStore,
};
use pokeprice_server::state::AppState;

/// Re-export fixtures for test convenience
pub use pokeprice_core::testing::fixtures;

/// Page size used by every fixture.
pub const PAGE_SIZE: u32 = 5;

/// Test fixture for API testing with a mock marketplace.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_search() {
///     let fixture = TestFixture::new().await;
///     fixture.marketplace.set_listings("mew", fixtures::listings("Mew", 3)).await;
///
///     let response = fixture.post("/api/v1/search", json!({ "term": "mew" })).await;
///     assert_eq!(response.status, StatusCode::OK);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state behind the router
    pub state: Arc<AppState>,
    /// Mock marketplace - configure listings and failures
    pub marketplace: Arc<MockMarketplace>,
    /// Cache the server writes to
    pub cache: Arc<SqliteCache>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    /// Raw body, for non-JSON endpoints.
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture backed by a fresh database.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let marketplace = Arc::new(MockMarketplace::new(PAGE_SIZE));

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            pager: PagerConfig {
                page_size: PAGE_SIZE,
                ..Default::default()
            },
            marketplace: MarketplaceConfig {
                timeout_secs: 5,
                direct: Some(DirectEngineConfig {
                    base_url: "http://127.0.0.1:9".to_string(),
                }),
                proxied: None,
            },
        };

        let cache = Arc::new(SqliteCache::new(&db_path).expect("Failed to create cache"));
        let settings = Arc::new(
            SqliteSettingsStore::new(&db_path).expect("Failed to create settings store"),
        );

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&cache) as Arc<dyn CacheStore>,
            settings as Arc<dyn SettingsStore>,
            Arc::clone(&marketplace) as Arc<dyn MarketplaceClient>,
            Settings::default(),
        ));

        let router = pokeprice_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            marketplace,
            cache,
            temp_dir,
        }
    }

    /// Create a fixture whose marketplace already holds `count` listings for `term`.
    pub async fn with_listings(term: &str, count: u32) -> Self {
        let fixture = Self::new().await;
        fixture
            .marketplace
            .set_listings(term, fixtures::listings(term, count))
            .await;
        fixture
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Names of the items in a paging state response.
pub fn item_names(body: &Value) -> Vec<String> {
    body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

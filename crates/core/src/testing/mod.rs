//! Testing utilities and mock implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use pokeprice_core::testing::{fixtures, MockMarketplace};
//!
//! let marketplace = MockMarketplace::new(5);
//! marketplace.set_listings("pikachu", fixtures::listings("Pikachu", 12)).await;
//!
//! // Use as Arc<dyn MarketplaceClient> in a Pager or AppState...
//! ```

mod mock_marketplace;

pub use mock_marketplace::{MockMarketplace, RecordedSearch};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::marketplace::{DetailsResult, ListingItem};

    /// Create a test listing with reasonable defaults.
    pub fn listing(name: &str, n: u32) -> ListingItem {
        let slug = name.to_lowercase().replace(' ', "-");
        ListingItem {
            name: format!("{} #{}", name, n),
            original_name: format!("{} #{}", name, n),
            link: format!("https://marketplace.example/cards/{}-{}", slug, n),
            image_link: Some(format!("https://img.marketplace.example/{}-{}.jpg", slug, n)),
            price: format!("{},{:02} €", n + 1, (n * 7) % 100),
            price_trend: Some(format!("{},00 €", n + 2)),
        }
    }

    /// Create `count` listings numbered from 0.
    pub fn listings(name: &str, count: u32) -> Vec<ListingItem> {
        (0..count).map(|n| listing(name, n)).collect()
    }

    /// Create details for a listing, with a new price.
    pub fn details(listing: &ListingItem, price: &str) -> DetailsResult {
        DetailsResult {
            link: listing.link.clone(),
            name: listing.name.clone(),
            original_name: listing.original_name.clone(),
            image_link: listing.image_link.clone(),
            price: price.to_string(),
            price_trend: listing.price_trend.clone(),
            available: Some(12),
        }
    }
}

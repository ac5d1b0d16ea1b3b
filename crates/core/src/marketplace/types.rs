//! Types returned by marketplace clients.

use serde::{Deserialize, Serialize};

/// One marketplace listing as returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingItem {
    /// Display name (localized).
    pub name: String,
    /// Original (untranslated) card name.
    pub original_name: String,
    /// Link to the product page; stable across searches.
    pub link: String,
    /// Product image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
    /// Lowest listed price, as displayed by the marketplace (e.g. "1,49 €").
    pub price: String,
    /// Price trend, as displayed by the marketplace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_trend: Option<String>,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub items: Vec<ListingItem>,
    /// The page that was returned (1-based).
    pub page: u32,
    /// Marketplace estimate of the number of pages for this term.
    pub total_pages: u32,
}

/// Details for a single product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsResult {
    pub link: String,
    pub name: String,
    pub original_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_trend: Option<String>,
    /// Number of offers currently listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_minimal_json() {
        let json = r#"{
            "name": "Bisaflor",
            "original_name": "Venusaur",
            "link": "https://marketplace.example/cards/venusaur",
            "price": "3,50 €"
        }"#;
        let listing: ListingItem = serde_json::from_str(json).unwrap();
        assert_eq!(listing.original_name, "Venusaur");
        assert!(listing.image_link.is_none());
        assert!(listing.price_trend.is_none());
    }
}

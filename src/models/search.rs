//! External product search request/response models

use serde::{Deserialize, Serialize};

/// Largest page the marketplace serves
pub const MAX_PAGE: u32 = 100;

/// Largest page size the marketplace serves
pub const MAX_LIMIT: u32 = 30;

/// One marketplace item, normalised for storage and API responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub item_code: String,
    pub name: String,
    /// Smallest currency unit
    pub price: i64,
    pub image_url: Option<String>,
    pub product_url: String,
    pub affiliate_url: Option<String>,
    pub shop_name: Option<String>,
    pub review_score: Option<f64>,
    pub review_count: Option<i64>,
}

/// Result of one marketplace search call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub items: Vec<ProductSummary>,
    pub total_count: u64,
}

/// Cached search payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub products: Vec<ProductSummary>,
    pub total: u64,
}

/// Query parameters for the external search endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalSearchQuery {
    pub keyword: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl ExternalSearchQuery {
    /// Validate bounds, returning an error message for a 400 response
    pub fn validate(&self) -> Result<(), String> {
        if self.keyword.trim().is_empty() {
            return Err("keyword must not be empty".to_string());
        }
        if self.page == 0 || self.page > MAX_PAGE {
            return Err(format!("page must be between 1 and {}", MAX_PAGE));
        }
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(format!("limit must be between 1 and {}", MAX_LIMIT));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalSearchResponse {
    pub status: String,
    pub products: Vec<ProductSummary>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheClearResponse {
    pub cleared: usize,
}

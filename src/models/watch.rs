//! Watchlist domain types consumed by the price refresh pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{products, watchlists};

/// A product tracked by at least one subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedProduct {
    pub id: Uuid,
    pub name: String,
    pub product_url: String,
    pub image_url: Option<String>,
    /// Smallest currency unit
    pub current_price: i64,
    pub original_price: i64,
    pub lowest_price: Option<i64>,
    pub checked_at: DateTime<Utc>,
}

impl From<products::Model> for WatchedProduct {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            product_url: model.affiliate_url.unwrap_or(model.product_url),
            image_url: model.image_url,
            current_price: model.current_price,
            original_price: model.original_price,
            lowest_price: model.lowest_price,
            checked_at: model.checked_at,
        }
    }
}

/// A user's interest in a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub target_price: Option<i64>,
    pub notify_any_drop: bool,
    pub registered_price: Option<i64>,
}

impl From<watchlists::Model> for WatchSubscription {
    fn from(model: watchlists::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
            target_price: model.target_price,
            notify_any_drop: model.notify_any_drop,
            registered_price: model.registered_price,
        }
    }
}

/// One immutable price sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub id: Uuid,
    pub product_id: Uuid,
    pub price: i64,
    pub discount_rate: f64,
    pub observed_at: DateTime<Utc>,
}

impl PriceObservation {
    /// Build an observation, deriving the discount from the product's list price
    pub fn new(product: &WatchedProduct, price: i64, observed_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id: product.id,
            price,
            discount_rate: discount_rate(product.original_price, price),
            observed_at,
        }
    }
}

/// Field changes applied to a product after a price change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPriceUpdate {
    pub product_id: Uuid,
    pub current_price: i64,
    pub lowest_price: Option<i64>,
    pub discount_rate: f64,
    pub checked_at: DateTime<Utc>,
}

/// Percent below list price, rounded to 2 decimals; 0 when not discounted
pub fn discount_rate(original_price: i64, price: i64) -> f64 {
    if original_price <= 0 || price >= original_price {
        return 0.0;
    }
    round2((original_price - price) as f64 / original_price as f64 * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_rate_against_list_price() {
        assert_eq!(discount_rate(3000, 2400), 20.0);
        assert_eq!(discount_rate(2980, 1980), 33.56);
    }

    #[test]
    fn test_discount_rate_zero_when_not_discounted() {
        assert_eq!(discount_rate(2000, 2000), 0.0);
        assert_eq!(discount_rate(2000, 2500), 0.0);
        assert_eq!(discount_rate(0, 1500), 0.0);
    }
}

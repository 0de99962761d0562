//! External Product Source
//!
//! `ProductSource` is the seam between the core and the marketplace search
//! API. `MarketplaceClient` is the HTTP implementation; every caller shares
//! its pacing gate so the aggregate call rate stays under the marketplace
//! limit.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::MarketplaceConfig;
use crate::models::search::{ProductSummary, SearchResult};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Rate limited, server error, timeout or connection failure
    #[error("retryable source error: {0}")]
    Retryable(String),
    /// Rejected request or unreadable response
    #[error("source error: {0}")]
    Permanent(String),
}

impl SourceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Retryable(_))
    }
}

#[async_trait]
pub trait ProductSource: Send + Sync {
    /// One page of results for `keyword`, at most `max_results` items
    async fn search(
        &self,
        keyword: &str,
        page: u32,
        max_results: u32,
    ) -> Result<SearchResult, SourceError>;
}

#[derive(Debug, Deserialize)]
struct ItemSearchResponse {
    #[serde(default)]
    count: u64,
    #[serde(rename = "Items", default)]
    items: Vec<ItemSearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemSearchItem {
    item_code: String,
    item_name: String,
    item_price: i64,
    item_url: String,
    #[serde(default)]
    affiliate_url: Option<String>,
    #[serde(default)]
    medium_image_urls: Vec<String>,
    #[serde(default)]
    shop_name: Option<String>,
    #[serde(default)]
    review_average: Option<f64>,
    #[serde(default)]
    review_count: Option<i64>,
}

impl From<ItemSearchItem> for ProductSummary {
    fn from(item: ItemSearchItem) -> Self {
        Self {
            item_code: item.item_code,
            name: item.item_name,
            price: item.item_price,
            image_url: item.medium_image_urls.into_iter().next(),
            product_url: item.item_url,
            affiliate_url: item.affiliate_url.filter(|u| !u.is_empty()),
            shop_name: item.shop_name,
            review_score: item.review_average,
            review_count: item.review_count,
        }
    }
}

/// Maps an HTTP status to the retry classification
pub fn classify_status(status: StatusCode) -> SourceError {
    let message = format!("marketplace returned HTTP {}", status.as_u16());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        SourceError::Retryable(message)
    } else {
        SourceError::Permanent(message)
    }
}

fn classify_transport(err: reqwest::Error) -> SourceError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        SourceError::Retryable(err.to_string())
    } else {
        SourceError::Permanent(err.to_string())
    }
}

/// Serialises calls so consecutive requests start at least `interval` apart
pub struct PacingGate {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl PacingGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

pub struct MarketplaceClient {
    client: Client,
    config: MarketplaceConfig,
    pacing: PacingGate,
}

impl MarketplaceClient {
    pub fn new(config: MarketplaceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::Permanent(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            pacing: PacingGate::new(config.min_request_interval),
            config,
        })
    }
}

#[async_trait]
impl ProductSource for MarketplaceClient {
    async fn search(
        &self,
        keyword: &str,
        page: u32,
        max_results: u32,
    ) -> Result<SearchResult, SourceError> {
        if self.config.application_id.is_empty() {
            return Err(SourceError::Permanent(
                "marketplace application id is not configured".to_string(),
            ));
        }

        self.pacing.wait().await;

        let mut params: Vec<(&str, String)> = vec![
            ("applicationId", self.config.application_id.clone()),
            ("keyword", keyword.to_string()),
            ("hits", max_results.to_string()),
            ("page", page.to_string()),
            ("genreId", self.config.genre_id.clone()),
            ("formatVersion", "2".to_string()),
        ];
        if let Some(affiliate_id) = &self.config.affiliate_id {
            params.push(("affiliateId", affiliate_id.clone()));
        }

        debug!(keyword = %keyword, page, hits = max_results, "Calling marketplace search");

        let response = self
            .client
            .get(&self.config.base_url)
            .header("accept", "application/json")
            .query(&params)
            .send()
            .await
            .map_err(classify_transport)?;

        if !response.status().is_success() {
            let err = classify_status(response.status());
            warn!(keyword = %keyword, error = %err, "Marketplace search failed");
            return Err(err);
        }

        // A stalled or truncated body is a transport failure, bad JSON is not
        let bytes = response.bytes().await.map_err(classify_transport)?;
        let body: ItemSearchResponse = serde_json::from_slice(&bytes)
            .map_err(|e| SourceError::Permanent(format!("failed to decode response: {}", e)))?;

        debug!(keyword = %keyword, items = body.items.len(), total = body.count, "Marketplace search done");

        Ok(SearchResult {
            total_count: body.count,
            items: body.items.into_iter().map(ProductSummary::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(classify_status(StatusCode::INTERNAL_SERVER_ERROR).is_retryable());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE).is_retryable());
        assert!(!classify_status(StatusCode::BAD_REQUEST).is_retryable());
        assert!(!classify_status(StatusCode::NOT_FOUND).is_retryable());
    }

    #[test]
    fn test_decode_format_version_2() {
        let json = r#"{
            "count": 2,
            "page": 1,
            "Items": [
                {
                    "itemCode": "shop:10001",
                    "itemName": "Men's Toner 200ml",
                    "itemPrice": 1980,
                    "itemUrl": "https://item.example/10001",
                    "affiliateUrl": "",
                    "mediumImageUrls": ["https://img.example/1.jpg", "https://img.example/2.jpg"],
                    "shopName": "Example Shop",
                    "reviewAverage": 4.5,
                    "reviewCount": 120
                },
                {
                    "itemCode": "shop:10002",
                    "itemName": "Face Wash",
                    "itemPrice": 880,
                    "itemUrl": "https://item.example/10002"
                }
            ]
        }"#;

        let response: ItemSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.count, 2);

        let items: Vec<ProductSummary> = response.items.into_iter().map(Into::into).collect();
        assert_eq!(items[0].price, 1980);
        assert_eq!(items[0].image_url.as_deref(), Some("https://img.example/1.jpg"));
        assert_eq!(items[0].affiliate_url, None);
        assert_eq!(items[0].review_count, Some(120));
        assert_eq!(items[1].image_url, None);
        assert_eq!(items[1].shop_name, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_gate_spaces_calls() {
        let gate = PacingGate::new(Duration::from_millis(1000));
        let start = Instant::now();

        gate.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        gate.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));

        gate.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_gate_no_wait_after_idle() {
        let gate = PacingGate::new(Duration::from_millis(1000));
        gate.wait().await;
        tokio::time::advance(Duration::from_secs(5)).await;

        let before = Instant::now();
        gate.wait().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    /// Serves one canned response on a local port, optionally holding the
    /// connection open afterwards
    async fn serve_once(response: &'static str, hold_open: bool) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            if hold_open {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
        });

        format!("http://{}/search", addr)
    }

    fn client_for(base_url: String) -> MarketplaceClient {
        MarketplaceClient::new(MarketplaceConfig {
            base_url,
            application_id: "app".to_string(),
            affiliate_id: None,
            genre_id: "100939".to_string(),
            timeout: Duration::from_millis(300),
            min_request_interval: Duration::ZERO,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_stalled_body_is_retryable() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 200\r\n\r\n{\"count\": 1, \"Items\": [",
            true,
        )
        .await;

        let err = client_for(url).search("toner", 1, 1).await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {:?}", err);
    }

    #[tokio::test]
    async fn test_malformed_body_is_permanent() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 9\r\nconnection: close\r\n\r\nnot json!",
            false,
        )
        .await;

        let err = client_for(url).search("toner", 1, 1).await.unwrap_err();
        assert!(!err.is_retryable(), "unexpected error: {:?}", err);
    }

    #[tokio::test]
    async fn test_missing_application_id_is_permanent() {
        let client = MarketplaceClient::new(MarketplaceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            application_id: String::new(),
            affiliate_id: None,
            genre_id: "100939".to_string(),
            timeout: Duration::from_secs(1),
            min_request_interval: Duration::from_millis(0),
        })
        .unwrap();

        let err = client.search("toner", 1, 1).await.unwrap_err();
        assert!(!err.is_retryable());
    }
}

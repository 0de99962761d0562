//! Recommendation text for target-reached notifications
//!
//! Optional content: every failure path yields `None` and the notification
//! goes out without it.

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RecommendationConfig;
use crate::models::watch::WatchedProduct;
use crate::services::notification_templates::format_yen;

const API_VERSION: &str = "2025-01-01-preview";
const CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const CACHE_CAPACITY: u64 = 10_000;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[async_trait]
pub trait RecommendationGenerator: Send + Sync {
    async fn generate(&self, product: &WatchedProduct) -> Option<String>;
}

/// Used when no model endpoint is configured
pub struct DisabledRecommender;

#[async_trait]
impl RecommendationGenerator for DisabledRecommender {
    async fn generate(&self, _product: &WatchedProduct) -> Option<String> {
        None
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct AzureOpenAiRecommender {
    client: Client,
    config: RecommendationConfig,
    cache: Arc<Cache<Uuid, String>>,
}

impl AzureOpenAiRecommender {
    pub fn new(config: RecommendationConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            config,
            cache: Arc::new(cache),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            API_VERSION
        )
    }

    async fn request(&self, product: &WatchedProduct) -> Result<String, String> {
        let body = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "あなたは親切で専門的なメンズコスメアドバイザーです。".to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(product),
                },
            ],
            max_tokens: 300,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(self.url())
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("model endpoint returned HTTP {}", response.status().as_u16()));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| e.to_string())?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| "empty completion".to_string())
    }
}

#[async_trait]
impl RecommendationGenerator for AzureOpenAiRecommender {
    async fn generate(&self, product: &WatchedProduct) -> Option<String> {
        if let Some(cached) = self.cache.get(&product.id).await {
            debug!(product_id = %product.id, "Recommendation cache hit");
            return Some(cached);
        }

        match self.request(product).await {
            Ok(text) => {
                self.cache.insert(product.id, text.clone()).await;
                info!(product_id = %product.id, "Generated recommendation text");
                Some(text)
            }
            Err(e) => {
                warn!(product_id = %product.id, error = %e, "Recommendation generation failed");
                None
            }
        }
    }
}

fn build_prompt(product: &WatchedProduct) -> String {
    let mut price_info = format!("現在価格: {}", format_yen(product.current_price));
    if product.original_price > product.current_price {
        price_info.push_str(&format!(
            " (定価{}から{}お得)",
            format_yen(product.original_price),
            format_yen(product.original_price - product.current_price)
        ));
    }
    if let Some(lowest) = product.lowest_price {
        price_info.push_str(&format!("\n過去最安値: {}", format_yen(lowest)));
    }

    format!(
        "あなたはメンズコスメの専門家です。以下の商品について、男性ユーザーに向けた魅力的なお勧め文を日本語で作成してください。\n\n\
         【商品情報】\n商品名: {}\n{}\n\n\
         【条件】\n- 100〜150文字程度で簡潔に\n- 価格のお得感やコスパの良さを強調\n- 誇大広告にならない自然な表現\n- 絵文字は使用しない\n\nお勧め文:",
        product.name, price_info
    )
}

//! Application configuration
//!
//! Everything is read from the environment (after `dotenvy` loads `.env`).
//! Only `DATABASE_URL` is required; every other value has a default.

use std::env;
use std::time::Duration;

use crate::models::notification::Channel;

const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_BIND_ADDR: &str = "BIND_ADDR";

const ENV_MARKETPLACE_BASE_URL: &str = "MARKETPLACE_BASE_URL";
const ENV_MARKETPLACE_APP_ID: &str = "MARKETPLACE_APP_ID";
const ENV_MARKETPLACE_AFFILIATE_ID: &str = "MARKETPLACE_AFFILIATE_ID";
const ENV_MARKETPLACE_GENRE_ID: &str = "MARKETPLACE_GENRE_ID";
const ENV_MARKETPLACE_TIMEOUT_SECS: &str = "MARKETPLACE_TIMEOUT_SECS";
const ENV_MARKETPLACE_MIN_INTERVAL_MS: &str = "MARKETPLACE_MIN_INTERVAL_MS";

const ENV_SEARCH_CACHE_TTL_SECS: &str = "SEARCH_CACHE_TTL_SECS";
const ENV_SEARCH_CACHE_MAX_SIZE: &str = "SEARCH_CACHE_MAX_SIZE";

const ENV_SCHEDULER_ENABLED: &str = "SCHEDULER_ENABLED";
const ENV_PRICE_REFRESH_INTERVAL_SECS: &str = "PRICE_REFRESH_INTERVAL_SECS";
const ENV_PRICE_REFRESH_OFFSET_SECS: &str = "PRICE_REFRESH_OFFSET_SECS";
const ENV_PRICE_REFRESH_MAX_RETRIES: &str = "PRICE_REFRESH_MAX_RETRIES";
const ENV_PRICE_REFRESH_RETRY_BASE_MS: &str = "PRICE_REFRESH_RETRY_BASE_MS";
const ENV_PRICE_REFRESH_REQUEST_DELAY_MS: &str = "PRICE_REFRESH_REQUEST_DELAY_MS";
const ENV_CACHE_WARMUP_INTERVAL_SECS: &str = "CACHE_WARMUP_INTERVAL_SECS";
const ENV_CACHE_WARMUP_KEYWORDS: &str = "CACHE_WARMUP_KEYWORDS";

const ENV_NOTIFICATION_COOLDOWN_HOURS: &str = "NOTIFICATION_COOLDOWN_HOURS";
const ENV_NOTIFY_CHANNELS: &str = "NOTIFY_CHANNELS";
const ENV_RESEND_API_KEY: &str = "RESEND_API_KEY";
const ENV_FROM_EMAIL: &str = "FROM_EMAIL";
const ENV_PUSH_GATEWAY_URL: &str = "PUSH_GATEWAY_URL";

const ENV_AZURE_OPENAI_API_KEY: &str = "AZURE_OPENAI_API_KEY";
const ENV_AZURE_OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
const ENV_AZURE_OPENAI_DEPLOYMENT_NAME: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MARKETPLACE_BASE_URL: &str =
    "https://app.rakuten.co.jp/services/api/IchibaItem/Search/20220601";
const DEFAULT_MARKETPLACE_GENRE_ID: &str = "100939";
const DEFAULT_MARKETPLACE_TIMEOUT_SECS: u64 = 10;
/// The marketplace allows one request per second across all callers
const DEFAULT_MARKETPLACE_MIN_INTERVAL_MS: u64 = 1000;
const DEFAULT_SEARCH_CACHE_TTL_SECS: u64 = 6 * 60 * 60;
const DEFAULT_SEARCH_CACHE_MAX_SIZE: usize = 1000;
const DEFAULT_PRICE_REFRESH_INTERVAL_SECS: u64 = 6 * 60 * 60;
/// Price refresh runs three hours after each warmup
const DEFAULT_PRICE_REFRESH_OFFSET_SECS: u64 = 3 * 60 * 60;
const DEFAULT_PRICE_REFRESH_MAX_RETRIES: u32 = 3;
const DEFAULT_PRICE_REFRESH_RETRY_BASE_MS: u64 = 1000;
const DEFAULT_PRICE_REFRESH_REQUEST_DELAY_MS: u64 = 1000;
const DEFAULT_CACHE_WARMUP_INTERVAL_SECS: u64 = 6 * 60 * 60;
const DEFAULT_NOTIFICATION_COOLDOWN_HOURS: i64 = 24;
const DEFAULT_FROM_EMAIL: &str = "noreply@example.com";

/// Popular queries pre-loaded into the search cache
pub const DEFAULT_WARMUP_KEYWORDS: &[&str] = &[
    "メンズ 化粧水",
    "メンズ 洗顔",
    "メンズ 乳液",
    "メンズ スキンケア",
    "メンズ 美容液",
    "メンズ クレンジング",
    "メンズ オールインワン",
    "メンズ 日焼け止め",
    "メンズ リップ",
    "バルクオム",
    "オルビス メンズ",
    "ニベアメン",
    "uno スキンケア",
    "ギャツビー スキンケア",
    "ルシード",
    "NULL メンズ",
    "BOTCHAN",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    pub base_url: String,
    pub application_id: String,
    pub affiliate_id: Option<String>,
    pub genre_id: String,
    pub timeout: Duration,
    pub min_request_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub price_refresh_interval: Duration,
    pub price_refresh_offset: Duration,
    pub warmup_interval: Duration,
    pub warmup_keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub request_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub cooldown: chrono::Duration,
    pub channels: Vec<Channel>,
    pub resend_api_key: Option<String>,
    pub from_email: String,
    pub push_gateway_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecommendationConfig {
    pub api_key: String,
    pub endpoint: String,
    pub deployment: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub marketplace: MarketplaceConfig,
    pub cache_ttl: Duration,
    pub cache_max_size: usize,
    pub scheduler: SchedulerConfig,
    pub refresh: RefreshConfig,
    pub notification: NotificationConfig,
    /// None when Azure OpenAI is not configured
    pub recommendation: Option<RecommendationConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required(ENV_DATABASE_URL)?;

        let application_id = optional(ENV_MARKETPLACE_APP_ID).unwrap_or_default();
        if application_id.is_empty() {
            tracing::warn!("{} not set - marketplace calls will be rejected", ENV_MARKETPLACE_APP_ID);
        }

        let marketplace = MarketplaceConfig {
            base_url: optional(ENV_MARKETPLACE_BASE_URL)
                .unwrap_or_else(|| DEFAULT_MARKETPLACE_BASE_URL.to_string()),
            application_id,
            affiliate_id: optional(ENV_MARKETPLACE_AFFILIATE_ID),
            genre_id: optional(ENV_MARKETPLACE_GENRE_ID)
                .unwrap_or_else(|| DEFAULT_MARKETPLACE_GENRE_ID.to_string()),
            timeout: Duration::from_secs(parse_or(
                ENV_MARKETPLACE_TIMEOUT_SECS,
                DEFAULT_MARKETPLACE_TIMEOUT_SECS,
            )?),
            min_request_interval: Duration::from_millis(parse_or(
                ENV_MARKETPLACE_MIN_INTERVAL_MS,
                DEFAULT_MARKETPLACE_MIN_INTERVAL_MS,
            )?),
        };

        let scheduler = SchedulerConfig {
            enabled: parse_or(ENV_SCHEDULER_ENABLED, true)?,
            price_refresh_interval: Duration::from_secs(parse_or(
                ENV_PRICE_REFRESH_INTERVAL_SECS,
                DEFAULT_PRICE_REFRESH_INTERVAL_SECS,
            )?),
            price_refresh_offset: Duration::from_secs(parse_or(
                ENV_PRICE_REFRESH_OFFSET_SECS,
                DEFAULT_PRICE_REFRESH_OFFSET_SECS,
            )?),
            warmup_interval: Duration::from_secs(parse_or(
                ENV_CACHE_WARMUP_INTERVAL_SECS,
                DEFAULT_CACHE_WARMUP_INTERVAL_SECS,
            )?),
            warmup_keywords: optional(ENV_CACHE_WARMUP_KEYWORDS)
                .map(|raw| split_list(&raw))
                .unwrap_or_else(|| DEFAULT_WARMUP_KEYWORDS.iter().map(|k| k.to_string()).collect()),
        };

        let refresh = RefreshConfig {
            max_retries: parse_or(ENV_PRICE_REFRESH_MAX_RETRIES, DEFAULT_PRICE_REFRESH_MAX_RETRIES)?
                .max(1),
            retry_base_delay: Duration::from_millis(parse_or(
                ENV_PRICE_REFRESH_RETRY_BASE_MS,
                DEFAULT_PRICE_REFRESH_RETRY_BASE_MS,
            )?),
            request_delay: Duration::from_millis(parse_or(
                ENV_PRICE_REFRESH_REQUEST_DELAY_MS,
                DEFAULT_PRICE_REFRESH_REQUEST_DELAY_MS,
            )?),
        };

        let notification = NotificationConfig {
            cooldown: chrono::Duration::hours(parse_or(
                ENV_NOTIFICATION_COOLDOWN_HOURS,
                DEFAULT_NOTIFICATION_COOLDOWN_HOURS,
            )?),
            channels: parse_channels(optional(ENV_NOTIFY_CHANNELS).as_deref())?,
            resend_api_key: optional(ENV_RESEND_API_KEY),
            from_email: optional(ENV_FROM_EMAIL).unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            push_gateway_url: optional(ENV_PUSH_GATEWAY_URL),
        };

        let recommendation = match (
            optional(ENV_AZURE_OPENAI_API_KEY),
            optional(ENV_AZURE_OPENAI_ENDPOINT),
            optional(ENV_AZURE_OPENAI_DEPLOYMENT_NAME),
        ) {
            (Some(api_key), Some(endpoint), Some(deployment)) => Some(RecommendationConfig {
                api_key,
                endpoint,
                deployment,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            bind_addr: optional(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            marketplace,
            cache_ttl: Duration::from_secs(parse_or(
                ENV_SEARCH_CACHE_TTL_SECS,
                DEFAULT_SEARCH_CACHE_TTL_SECS,
            )?),
            cache_max_size: parse_or(ENV_SEARCH_CACHE_MAX_SIZE, DEFAULT_SEARCH_CACHE_MAX_SIZE)?,
            scheduler,
            refresh,
            notification,
            recommendation,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

/// Unset and blank variables are treated the same
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_channels(raw: Option<&str>) -> Result<Vec<Channel>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(vec![Channel::Email]);
    };

    let mut channels = Vec::new();
    for entry in split_list(raw) {
        let channel: Channel = entry.parse().map_err(|_| ConfigError::Invalid {
            name: ENV_NOTIFY_CHANNELS,
            value: raw.to_string(),
        })?;
        if !channels.contains(&channel) {
            channels.push(channel);
        }
    }
    Ok(channels)
}

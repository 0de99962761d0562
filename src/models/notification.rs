//! Notification domain types: channels, alerts, attempt records and results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Outbound delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Push,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Push => "push",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "email" => Ok(Channel::Email),
            "push" => Ok(Channel::Push),
            other => Err(format!("unknown notification channel: {}", other)),
        }
    }
}

/// Why an alert fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PriceDrop,
    TargetReached,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::PriceDrop => "price_drop",
            AlertKind::TargetReached => "target_reached",
        }
    }
}

/// Triggering metadata for one subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub kind: AlertKind,
    pub old_price: i64,
    pub new_price: i64,
    pub drop_rate: f64,
    pub triggered_at: DateTime<Utc>,
}

/// Evidence of a send attempt; drives the (user, channel) cooldown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub alert_id: Uuid,
    pub channel: Channel,
    pub title: String,
    pub message: String,
    pub delivered: bool,
    pub sent_at: DateTime<Utc>,
}

/// Rendered content handed to a dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub kind: AlertKind,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_url: String,
    pub image_url: Option<String>,
    pub old_price: i64,
    pub new_price: i64,
    pub drop_rate: f64,
    pub target_price: Option<i64>,
    pub registered_price: Option<i64>,
    pub savings: Option<i64>,
    pub recommendation: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Structured outcome of a dispatcher call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub success: bool,
    pub id: Option<String>,
    pub error: Option<String>,
}

impl DeliveryReceipt {
    pub fn delivered(id: Option<String>) -> Self {
        Self {
            success: true,
            id,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            error: Some(error.into()),
        }
    }
}

/// Per-subscriber outcome reported in the cycle summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub channel: Channel,
    pub kind: AlertKind,
    pub old_price: i64,
    pub new_price: i64,
    pub drop_rate: f64,
    pub sent: bool,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_parse() {
        assert_eq!("email".parse::<Channel>().unwrap(), Channel::Email);
        assert_eq!(" Push ".parse::<Channel>().unwrap(), Channel::Push);
        assert!("sms".parse::<Channel>().is_err());
    }

    #[test]
    fn test_channel_serializes_lowercase() {
        let json = serde_json::to_string(&Channel::Email).unwrap();
        assert_eq!(json, "\"email\"");
    }

    #[test]
    fn test_alert_kind_labels() {
        assert_eq!(AlertKind::PriceDrop.as_str(), "price_drop");
        assert_eq!(AlertKind::TargetReached.as_str(), "target_reached");
    }
}

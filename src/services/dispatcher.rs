//! Notification Dispatcher
//!
//! Outbound delivery never raises: every outcome, including transport
//! failures, comes back as a `DeliveryReceipt` so the gate can record the
//! attempt either way.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::NotificationConfig;
use crate::models::notification::{Channel, DeliveryReceipt, NotificationMessage};
use crate::services::notification_templates::record_summary;

const RESEND_API_URL: &str = "https://api.resend.com/emails";
const DISPATCH_TIMEOUT_SECS: u64 = 10;

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        message: &NotificationMessage,
    ) -> DeliveryReceipt;
}

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    id: Option<String>,
}

/// Email delivery through the Resend HTTP API
pub struct ResendEmailDispatcher {
    client: Client,
    api_key: String,
    from_email: String,
    api_url: String,
}

impl ResendEmailDispatcher {
    pub fn new(client: Client, api_key: String, from_email: String) -> Self {
        Self {
            client,
            api_key,
            from_email,
            api_url: RESEND_API_URL.to_string(),
        }
    }

    async fn send_email(&self, to: &str, message: &NotificationMessage) -> DeliveryReceipt {
        let body = ResendEmailRequest {
            from: &self.from_email,
            to: vec![to],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        let response = match self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(to = %to, error = %e, "Email request failed");
                return DeliveryReceipt::failed(e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(to = %to, status = status.as_u16(), "Email rejected: {}", detail);
            return DeliveryReceipt::failed(format!("email API returned HTTP {}", status.as_u16()));
        }

        let id = response
            .json::<ResendEmailResponse>()
            .await
            .ok()
            .and_then(|r| r.id);
        info!(to = %to, subject = %message.subject, "Email sent");
        DeliveryReceipt::delivered(id)
    }
}

#[derive(Debug, Serialize)]
struct PushPayload<'a> {
    token: &'a str,
    title: &'a str,
    body: String,
    url: &'a str,
    icon: Option<&'a str>,
}

/// Push delivery through an HTTP gateway that fans out to devices
pub struct PushGatewayDispatcher {
    client: Client,
    gateway_url: String,
}

impl PushGatewayDispatcher {
    pub fn new(client: Client, gateway_url: String) -> Self {
        Self {
            client,
            gateway_url,
        }
    }

    async fn send_push(&self, token: &str, message: &NotificationMessage) -> DeliveryReceipt {
        let payload = PushPayload {
            token,
            title: &message.subject,
            body: record_summary(message),
            url: &message.product_url,
            icon: message.image_url.as_deref(),
        };

        match self.client.post(&self.gateway_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!(product_id = %message.product_id, "Push notification sent");
                DeliveryReceipt::delivered(None)
            }
            Ok(response) => {
                let status = response.status().as_u16();
                warn!(status, "Push gateway rejected notification");
                DeliveryReceipt::failed(format!("push gateway returned HTTP {}", status))
            }
            Err(e) => {
                error!(error = %e, "Push request failed");
                DeliveryReceipt::failed(e.to_string())
            }
        }
    }
}

/// Routes each channel to its configured backend
pub struct ChannelDispatcher {
    email: Option<ResendEmailDispatcher>,
    push: Option<PushGatewayDispatcher>,
}

impl ChannelDispatcher {
    pub fn from_config(config: &NotificationConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DISPATCH_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        let email = match &config.resend_api_key {
            Some(key) => Some(ResendEmailDispatcher::new(
                client.clone(),
                key.clone(),
                config.from_email.clone(),
            )),
            None => {
                warn!("RESEND_API_KEY not set - email notifications will fail");
                None
            }
        };

        let push = config
            .push_gateway_url
            .clone()
            .map(|url| PushGatewayDispatcher::new(client, url));

        Self { email, push }
    }
}

#[async_trait]
impl NotificationDispatcher for ChannelDispatcher {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        message: &NotificationMessage,
    ) -> DeliveryReceipt {
        match channel {
            Channel::Email => match &self.email {
                Some(email) => email.send_email(recipient, message).await,
                None => DeliveryReceipt::failed("email channel is not configured"),
            },
            Channel::Push => match &self.push {
                Some(push) => push.send_push(recipient, message).await,
                None => DeliveryReceipt::failed("push channel is not configured"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::AlertKind;
    use uuid::Uuid;

    fn message() -> NotificationMessage {
        NotificationMessage {
            kind: AlertKind::PriceDrop,
            product_id: Uuid::new_v4(),
            product_name: "Toner".to_string(),
            product_url: "https://item.example/1".to_string(),
            image_url: None,
            old_price: 2980,
            new_price: 1980,
            drop_rate: 33.56,
            target_price: None,
            registered_price: None,
            savings: None,
            recommendation: None,
            subject: "subject".to_string(),
            html: "<p>html</p>".to_string(),
            text: "text".to_string(),
        }
    }

    fn unconfigured() -> NotificationConfig {
        NotificationConfig {
            cooldown: chrono::Duration::hours(24),
            channels: vec![Channel::Email],
            resend_api_key: None,
            from_email: "noreply@example.com".to_string(),
            push_gateway_url: None,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_channels_fail_without_panicking() {
        let dispatcher = ChannelDispatcher::from_config(&unconfigured());

        let email = dispatcher.send(Channel::Email, "a@example.com", &message()).await;
        assert!(!email.success);
        assert!(email.error.is_some());

        let push = dispatcher.send(Channel::Push, "token", &message()).await;
        assert!(!push.success);
    }

    #[test]
    fn test_resend_request_shape() {
        let msg = message();
        let body = ResendEmailRequest {
            from: "noreply@example.com",
            to: vec!["a@example.com"],
            subject: &msg.subject,
            html: &msg.html,
            text: &msg.text,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["to"][0], "a@example.com");
        assert_eq!(json["subject"], "subject");
    }
}

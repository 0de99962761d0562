//! Notification Gate
//!
//! Decides which subscribers hear about a price drop. A subscription fires on
//! the plain drop path when it opted into any drop, or on the target path when
//! this drop crosses its target price. Cooldown is per (user, channel) across
//! all products. Each dispatch attempt is recorded whatever its outcome.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::notification::{AlertKind, AlertRecord, Channel, DispatchResult, NotificationRecord};
use crate::models::watch::{WatchSubscription, WatchedProduct};
use crate::services::dispatcher::NotificationDispatcher;
use crate::services::notification_templates::{self, MessageDetails};
use crate::services::price_store::{PriceStore, StoreError, UnitOfWork};
use crate::services::recommendation::RecommendationGenerator;

/// Which path a subscription takes for a given drop, if any
pub fn classify(subscription: &WatchSubscription, old_price: i64, new_price: i64) -> Option<AlertKind> {
    if new_price >= old_price {
        return None;
    }
    match subscription.target_price {
        Some(target) if new_price > target => None,
        Some(target) if old_price > target => Some(AlertKind::TargetReached),
        // Target was already met before this drop
        Some(_) | None => subscription.notify_any_drop.then_some(AlertKind::PriceDrop),
    }
}

/// Unrounded percent drop; callers guarantee `old_price > new_price`
pub fn drop_rate(old_price: i64, new_price: i64) -> f64 {
    if old_price <= 0 {
        return 0.0;
    }
    (old_price - new_price) as f64 / old_price as f64 * 100.0
}

pub struct NotificationGate {
    store: Arc<dyn PriceStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    recommender: Arc<dyn RecommendationGenerator>,
    channels: Vec<Channel>,
    cooldown: chrono::Duration,
}

impl NotificationGate {
    pub fn new(
        store: Arc<dyn PriceStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        recommender: Arc<dyn RecommendationGenerator>,
        channels: Vec<Channel>,
        cooldown: chrono::Duration,
    ) -> Self {
        Self {
            store,
            dispatcher,
            recommender,
            channels,
            cooldown,
        }
    }

    /// Evaluates one drop for every subscriber of `product`.
    ///
    /// Records are appended to `unit` and committed with the rest of the
    /// cycle. Lookup failures skip the affected subscriber rather than the
    /// whole product.
    pub async fn evaluate_drop(
        &self,
        product: &WatchedProduct,
        old_price: i64,
        new_price: i64,
        unit: &mut UnitOfWork,
    ) -> Vec<DispatchResult> {
        if new_price >= old_price {
            return Vec::new();
        }

        let rate = drop_rate(old_price, new_price);

        let subscriptions = match self.store.subscriptions_for(product.id).await {
            Ok(subs) => subs,
            Err(e) => {
                warn!(product_id = %product.id, error = %e, "Failed to load subscriptions");
                return Vec::new();
            }
        };

        let mut recommendation: Option<Option<String>> = None;
        let mut results = Vec::new();

        for subscription in &subscriptions {
            let Some(kind) = classify(subscription, old_price, new_price) else {
                debug!(
                    subscription_id = %subscription.id,
                    target_price = ?subscription.target_price,
                    new_price,
                    "Subscription not triggered"
                );
                continue;
            };

            let details = match (kind, subscription.target_price) {
                (AlertKind::TargetReached, Some(target_price)) => {
                    if recommendation.is_none() {
                        recommendation = Some(self.recommender.generate(product).await);
                    }
                    MessageDetails::TargetReached {
                        target_price,
                        registered_price: subscription.registered_price,
                        savings: subscription.registered_price.unwrap_or(old_price) - new_price,
                        recommendation: recommendation.clone().flatten(),
                    }
                }
                _ => MessageDetails::PriceDrop,
            };

            let mut alert_id: Option<Uuid> = None;

            for &channel in &self.channels {
                match self
                    .notify_channel(product, subscription, channel, old_price, new_price, rate, &details, &mut alert_id, unit)
                    .await
                {
                    Ok(Some(result)) => results.push(result),
                    Ok(None) => {}
                    Err(e) => warn!(
                        user_id = %subscription.user_id,
                        channel = %channel,
                        error = %e,
                        "Skipping notification after lookup failure"
                    ),
                }
            }
        }

        results
    }

    #[allow(clippy::too_many_arguments)]
    async fn notify_channel(
        &self,
        product: &WatchedProduct,
        subscription: &WatchSubscription,
        channel: Channel,
        old_price: i64,
        new_price: i64,
        rate: f64,
        details: &MessageDetails,
        alert_id: &mut Option<Uuid>,
        unit: &mut UnitOfWork,
    ) -> Result<Option<DispatchResult>, StoreError> {
        let user_id = subscription.user_id;

        let Some(recipient) = self.store.recipient(user_id, channel).await? else {
            debug!(user_id = %user_id, channel = %channel, "User not reachable on channel");
            return Ok(None);
        };

        let now = Utc::now();
        if let Some(last) = self.last_notified_at(user_id, channel, unit).await? {
            if last > now - self.cooldown {
                info!(user_id = %user_id, channel = %channel, last_sent = %last, "Notification in cooldown");
                return Ok(None);
            }
        }

        let message = notification_templates::render(product, old_price, new_price, rate, details.clone());
        let receipt = self.dispatcher.send(channel, &recipient, &message).await;

        if let Some(err) = &receipt.error {
            warn!(user_id = %user_id, channel = %channel, error = %err, "Notification dispatch failed");
        }

        let alert = match alert_id {
            Some(id) => *id,
            None => {
                let id = Uuid::new_v4();
                unit.alerts.push(AlertRecord {
                    id,
                    subscription_id: subscription.id,
                    kind: message.kind,
                    old_price,
                    new_price,
                    drop_rate: rate,
                    triggered_at: now,
                });
                *alert_id = Some(id);
                id
            }
        };

        unit.notifications.push(NotificationRecord {
            id: Uuid::new_v4(),
            user_id,
            alert_id: alert,
            channel,
            title: notification_templates::record_title(&message),
            message: notification_templates::record_summary(&message),
            delivered: receipt.success,
            sent_at: now,
        });

        info!(
            user_id = %user_id,
            product_id = %product.id,
            channel = %channel,
            kind = message.kind.as_str(),
            success = receipt.success,
            "Notification attempted"
        );

        Ok(Some(DispatchResult {
            user_id,
            product_id: product.id,
            channel,
            kind: message.kind,
            old_price,
            new_price,
            drop_rate: rate,
            sent: receipt.success,
            error: receipt.error,
        }))
    }

    async fn last_notified_at(
        &self,
        user_id: Uuid,
        channel: Channel,
        unit: &UnitOfWork,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let stored = self.store.latest_notification_at(user_id, channel).await?;
        let pending = unit.latest_pending_notification(user_id, channel);
        Ok(stored.max(pending))
    }
}

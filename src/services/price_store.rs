//! Persistence seam for the price pipeline
//!
//! Reads happen directly against the database. Writes produced during a
//! refresh cycle are buffered in a `UnitOfWork` and flushed by `commit` in a
//! single transaction, so a failed commit leaves no partial cycle behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait, Unchanged,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{alerts, notifications, price_histories, products, users, watchlists};
use crate::models::notification::{AlertRecord, Channel, NotificationRecord};
use crate::models::watch::{PriceObservation, ProductPriceUpdate, WatchSubscription, WatchedProduct};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Writes accumulated by one refresh cycle
#[derive(Debug, Default, Clone)]
pub struct UnitOfWork {
    pub observations: Vec<PriceObservation>,
    pub product_updates: Vec<ProductPriceUpdate>,
    pub alerts: Vec<AlertRecord>,
    pub notifications: Vec<NotificationRecord>,
}

impl UnitOfWork {
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
            && self.product_updates.is_empty()
            && self.alerts.is_empty()
            && self.notifications.is_empty()
    }

    /// Latest not-yet-committed notification for this user and channel
    pub fn latest_pending_notification(
        &self,
        user_id: Uuid,
        channel: Channel,
    ) -> Option<DateTime<Utc>> {
        self.notifications
            .iter()
            .filter(|n| n.user_id == user_id && n.channel == channel)
            .map(|n| n.sent_at)
            .max()
    }
}

#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Distinct products referenced by at least one watchlist entry
    async fn watched_products(&self) -> Result<Vec<WatchedProduct>, StoreError>;

    async fn subscriptions_for(&self, product_id: Uuid)
        -> Result<Vec<WatchSubscription>, StoreError>;

    /// Address for the channel, or None when the user opted out or has none
    async fn recipient(&self, user_id: Uuid, channel: Channel)
        -> Result<Option<String>, StoreError>;

    async fn latest_notification_at(
        &self,
        user_id: Uuid,
        channel: Channel,
    ) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError>;
}

/// Picks the address for a channel from the user's delivery preferences
pub fn recipient_for(user: &users::Model, channel: Channel) -> Option<String> {
    match channel {
        Channel::Email if user.email_enabled && !user.email.trim().is_empty() => {
            Some(user.email.clone())
        }
        Channel::Push if user.push_enabled => user
            .device_token
            .clone()
            .filter(|token| !token.trim().is_empty()),
        _ => None,
    }
}

pub struct SeaOrmPriceStore {
    db: DatabaseConnection,
}

impl SeaOrmPriceStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PriceStore for SeaOrmPriceStore {
    async fn watched_products(&self) -> Result<Vec<WatchedProduct>, StoreError> {
        let watched_ids = watchlists::Entity::find()
            .select_only()
            .column(watchlists::Column::ProductId)
            .distinct()
            .into_query();

        let rows = products::Entity::find()
            .filter(products::Column::Id.in_subquery(watched_ids))
            .order_by_asc(products::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(WatchedProduct::from).collect())
    }

    async fn subscriptions_for(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<WatchSubscription>, StoreError> {
        let rows = watchlists::Entity::find()
            .filter(watchlists::Column::ProductId.eq(product_id))
            .order_by_asc(watchlists::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(WatchSubscription::from).collect())
    }

    async fn recipient(
        &self,
        user_id: Uuid,
        channel: Channel,
    ) -> Result<Option<String>, StoreError> {
        let user = users::Entity::find_by_id(user_id).one(&self.db).await?;
        Ok(user.and_then(|u| recipient_for(&u, channel)))
    }

    async fn latest_notification_at(
        &self,
        user_id: Uuid,
        channel: Channel,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let latest = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::Channel.eq(channel.as_str()))
            .order_by_desc(notifications::Column::SentAt)
            .one(&self.db)
            .await?;

        Ok(latest.map(|n| n.sent_at))
    }

    async fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        if !unit.observations.is_empty() {
            let rows = unit.observations.iter().map(|o| price_histories::ActiveModel {
                id: Set(o.id),
                product_id: Set(o.product_id),
                price: Set(o.price),
                discount_rate: Set(o.discount_rate),
                observed_at: Set(o.observed_at),
                created_at: Set(now),
            });
            price_histories::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await?;
        }

        for update in &unit.product_updates {
            products::ActiveModel {
                id: Unchanged(update.product_id),
                current_price: Set(update.current_price),
                lowest_price: Set(update.lowest_price),
                discount_rate: Set(update.discount_rate),
                checked_at: Set(update.checked_at),
                updated_at: Set(now),
                ..Default::default()
            }
            .update(&txn)
            .await?;
        }

        // Notifications reference alerts, so alerts go first
        if !unit.alerts.is_empty() {
            let rows = unit.alerts.iter().map(|a| alerts::ActiveModel {
                id: Set(a.id),
                watch_item_id: Set(a.subscription_id),
                alert_type: Set(a.kind.as_str().to_string()),
                old_price: Set(a.old_price),
                new_price: Set(a.new_price),
                drop_rate: Set(a.drop_rate),
                triggered_at: Set(a.triggered_at),
            });
            alerts::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await?;
        }

        if !unit.notifications.is_empty() {
            let rows = unit.notifications.iter().map(|n| notifications::ActiveModel {
                id: Set(n.id),
                user_id: Set(n.user_id),
                alert_id: Set(n.alert_id),
                title: Set(n.title.clone()),
                message: Set(n.message.clone()),
                channel: Set(n.channel.as_str().to_string()),
                delivered: Set(n.delivered),
                is_read: Set(false),
                sent_at: Set(n.sent_at),
            });
            notifications::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;

        debug!(
            observations = unit.observations.len(),
            product_updates = unit.product_updates.len(),
            alerts = unit.alerts.len(),
            notifications = unit.notifications.len(),
            "Committed refresh cycle writes"
        );

        Ok(())
    }
}

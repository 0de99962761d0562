//! In-memory fakes shared by unit tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::notification::{Channel, DeliveryReceipt, NotificationMessage};
use crate::models::search::{ProductSummary, SearchResult};
use crate::models::watch::{WatchSubscription, WatchedProduct};
use crate::services::dispatcher::NotificationDispatcher;
use crate::services::price_store::{PriceStore, StoreError, UnitOfWork};
use crate::services::product_source::{ProductSource, SourceError};
use crate::services::recommendation::RecommendationGenerator;

pub fn summary(code: &str, name: &str, price: i64) -> ProductSummary {
    ProductSummary {
        item_code: code.to_string(),
        name: name.to_string(),
        price,
        image_url: None,
        product_url: format!("https://item.example/{}", code),
        affiliate_url: None,
        shop_name: None,
        review_score: None,
        review_count: None,
    }
}

pub fn watched_product(name: &str, price: i64) -> WatchedProduct {
    WatchedProduct {
        id: Uuid::new_v4(),
        name: name.to_string(),
        product_url: "https://item.example/watched".to_string(),
        image_url: None,
        current_price: price,
        original_price: price,
        lowest_price: None,
        checked_at: Utc::now(),
    }
}

pub fn subscription(
    user_id: Uuid,
    product_id: Uuid,
    target_price: Option<i64>,
    notify_any_drop: bool,
) -> WatchSubscription {
    WatchSubscription {
        id: Uuid::new_v4(),
        user_id,
        product_id,
        target_price,
        notify_any_drop,
        registered_price: None,
    }
}

/// Connection whose every query fails, for code that only logs
/// `sync_status` write errors
pub fn offline_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn store_failure(message: &str) -> StoreError {
    StoreError::Database(DbErr::Custom(message.to_string()))
}

#[derive(Default)]
struct MemoryState {
    products: Vec<WatchedProduct>,
    subscriptions: Vec<WatchSubscription>,
    /// user -> (email, device token)
    users: HashMap<Uuid, (Option<String>, Option<String>)>,
    notification_log: Vec<(Uuid, Channel, DateTime<Utc>)>,
    commits: Vec<UnitOfWork>,
    failing_recipients: HashSet<Uuid>,
    fail_commit: bool,
    fail_load: bool,
}

/// `PriceStore` backed by vectors; commits apply product updates in place
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, product: WatchedProduct) {
        self.state.lock().products.push(product);
    }

    /// Push is enabled exactly when a device token is given
    pub fn add_user(&self, user_id: Uuid, email: Option<&str>, device_token: Option<&str>) {
        self.state.lock().users.insert(
            user_id,
            (email.map(str::to_string), device_token.map(str::to_string)),
        );
    }

    pub fn add_subscription(&self, subscription: WatchSubscription) {
        self.state.lock().subscriptions.push(subscription);
    }

    pub fn record_notification(&self, user_id: Uuid, channel: Channel, sent_at: DateTime<Utc>) {
        self.state.lock().notification_log.push((user_id, channel, sent_at));
    }

    pub fn fail_recipient_lookup(&self, user_id: Uuid) {
        self.state.lock().failing_recipients.insert(user_id);
    }

    pub fn fail_commits(&self, fail: bool) {
        self.state.lock().fail_commit = fail;
    }

    pub fn fail_loading(&self, fail: bool) {
        self.state.lock().fail_load = fail;
    }

    pub fn commits(&self) -> Vec<UnitOfWork> {
        self.state.lock().commits.clone()
    }

    pub fn product(&self, id: Uuid) -> Option<WatchedProduct> {
        self.state.lock().products.iter().find(|p| p.id == id).cloned()
    }
}

#[async_trait]
impl PriceStore for MemoryStore {
    async fn watched_products(&self) -> Result<Vec<WatchedProduct>, StoreError> {
        let state = self.state.lock();
        if state.fail_load {
            return Err(store_failure("load failed"));
        }
        let watched: HashSet<Uuid> = state.subscriptions.iter().map(|s| s.product_id).collect();
        Ok(state
            .products
            .iter()
            .filter(|p| watched.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn subscriptions_for(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<WatchSubscription>, StoreError> {
        Ok(self
            .state
            .lock()
            .subscriptions
            .iter()
            .filter(|s| s.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn recipient(
        &self,
        user_id: Uuid,
        channel: Channel,
    ) -> Result<Option<String>, StoreError> {
        let state = self.state.lock();
        if state.failing_recipients.contains(&user_id) {
            return Err(store_failure("user lookup failed"));
        }
        Ok(state.users.get(&user_id).and_then(|(email, token)| match channel {
            Channel::Email => email.clone(),
            Channel::Push => token.clone(),
        }))
    }

    async fn latest_notification_at(
        &self,
        user_id: Uuid,
        channel: Channel,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self
            .state
            .lock()
            .notification_log
            .iter()
            .filter(|(u, c, _)| *u == user_id && *c == channel)
            .map(|(_, _, at)| *at)
            .max())
    }

    async fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.fail_commit {
            return Err(store_failure("commit failed"));
        }

        for update in &unit.product_updates {
            if let Some(product) = state.products.iter_mut().find(|p| p.id == update.product_id) {
                product.current_price = update.current_price;
                product.lowest_price = update.lowest_price;
                product.checked_at = update.checked_at;
            }
        }
        for n in &unit.notifications {
            state.notification_log.push((n.user_id, n.channel, n.sent_at));
        }
        state.commits.push(unit);
        Ok(())
    }
}

/// One recorded call to the fake source
#[derive(Debug, Clone)]
pub struct SourceCall {
    pub keyword: String,
    pub page: u32,
    pub max_results: u32,
    pub at: Instant,
}

/// Scripted `ProductSource`: replies are consumed in order, then the
/// fallback (if any) repeats, then empty results
#[derive(Default)]
pub struct FakeSource {
    replies: Mutex<VecDeque<Result<SearchResult, SourceError>>>,
    fallback: Mutex<Option<Result<SearchResult, SourceError>>>,
    calls: Mutex<Vec<SourceCall>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, items: Vec<ProductSummary>) {
        let total_count = items.len() as u64;
        self.replies
            .lock()
            .push_back(Ok(SearchResult { items, total_count }));
    }

    pub fn push_price(&self, price: i64) {
        self.push_ok(vec![summary("item", "item", price)]);
    }

    pub fn push_err(&self, err: SourceError) {
        self.replies.lock().push_back(Err(err));
    }

    pub fn always_fail(&self, err: SourceError) {
        *self.fallback.lock() = Some(Err(err));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ProductSource for FakeSource {
    async fn search(
        &self,
        keyword: &str,
        page: u32,
        max_results: u32,
    ) -> Result<SearchResult, SourceError> {
        self.calls.lock().push(SourceCall {
            keyword: keyword.to_string(),
            page,
            max_results,
            at: Instant::now(),
        });

        if let Some(reply) = self.replies.lock().pop_front() {
            return reply;
        }
        self.fallback.lock().clone().unwrap_or(Ok(SearchResult {
            items: Vec::new(),
            total_count: 0,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub channel: Channel,
    pub recipient: String,
    pub message: NotificationMessage,
}

#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<SentMessage>>,
    failure: Mutex<Option<String>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, error: &str) {
        *self.failure.lock() = Some(error.to_string());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        message: &NotificationMessage,
    ) -> DeliveryReceipt {
        self.sent.lock().push(SentMessage {
            channel,
            recipient: recipient.to_string(),
            message: message.clone(),
        });
        match self.failure.lock().clone() {
            Some(err) => DeliveryReceipt::failed(err),
            None => DeliveryReceipt::delivered(Some(Uuid::new_v4().to_string())),
        }
    }
}

pub struct StaticRecommender {
    text: Option<String>,
    calls: AtomicUsize,
}

impl StaticRecommender {
    pub fn new(text: Option<&str>) -> Self {
        Self {
            text: text.map(str::to_string),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecommendationGenerator for StaticRecommender {
    async fn generate(&self, _product: &WatchedProduct) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text.clone()
    }
}

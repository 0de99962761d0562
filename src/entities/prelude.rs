pub use super::alerts::Entity as Alerts;
pub use super::notifications::Entity as Notifications;
pub use super::price_histories::Entity as PriceHistories;
pub use super::products::Entity as Products;
pub use super::sync_status::Entity as SyncStatus;
pub use super::users::Entity as Users;
pub use super::watchlists::Entity as Watchlists;

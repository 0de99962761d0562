pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_users;
mod m20260301_000002_create_products;
mod m20260301_000003_create_price_histories;
mod m20260301_000004_create_watchlists;
mod m20260301_000005_create_alerts_and_notifications;
mod m20260301_000006_create_sync_status;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_users::Migration),
            Box::new(m20260301_000002_create_products::Migration),
            Box::new(m20260301_000003_create_price_histories::Migration),
            Box::new(m20260301_000004_create_watchlists::Migration),
            Box::new(m20260301_000005_create_alerts_and_notifications::Migration),
            Box::new(m20260301_000006_create_sync_status::Migration),
        ]
    }
}

use sea_orm_migration::prelude::*;

use crate::m20260301_000001_create_users::Users;
use crate::m20260301_000004_create_watchlists::Watchlists;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Alerts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Alerts::WatchItemId).uuid().not_null())
                    // 'price_drop' or 'target_reached'
                    .col(ColumnDef::new(Alerts::AlertType).string_len(50).not_null())
                    .col(ColumnDef::new(Alerts::OldPrice).big_integer().not_null())
                    .col(ColumnDef::new(Alerts::NewPrice).big_integer().not_null())
                    .col(ColumnDef::new(Alerts::DropRate).double().not_null())
                    .col(
                        ColumnDef::new(Alerts::TriggeredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_alerts_watchlist")
                            .from(Alerts::Table, Alerts::WatchItemId)
                            .to(Watchlists::Table, Watchlists::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::UserId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::AlertId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Notifications::Message).text().not_null())
                    .col(ColumnDef::new(Notifications::Channel).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Notifications::Delivered)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notifications::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notifications::SentAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_user")
                            .from(Notifications::Table, Notifications::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_alert")
                            .from(Notifications::Table, Notifications::AlertId)
                            .to(Alerts::Table, Alerts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Cooldown lookups: latest record per (user, channel)
        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_user_channel_sent")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .col(Notifications::Channel)
                    .col((Notifications::SentAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alerts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Alerts {
    Table,
    Id,
    WatchItemId,
    AlertType,
    OldPrice,
    NewPrice,
    DropRate,
    TriggeredAt,
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    UserId,
    AlertId,
    Title,
    Message,
    Channel,
    Delivered,
    IsRead,
    SentAt,
}

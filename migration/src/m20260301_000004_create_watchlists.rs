use sea_orm_migration::prelude::*;

use crate::m20260301_000001_create_users::Users;
use crate::m20260301_000002_create_products::Products;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Watchlists::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Watchlists::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Watchlists::UserId).uuid().not_null())
                    .col(ColumnDef::new(Watchlists::ProductId).uuid().not_null())
                    .col(ColumnDef::new(Watchlists::TargetPrice).big_integer().null())
                    .col(ColumnDef::new(Watchlists::RegisteredPrice).big_integer().null())
                    .col(
                        ColumnDef::new(Watchlists::NotifyAnyDrop)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Watchlists::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_watchlists_user")
                            .from(Watchlists::Table, Watchlists::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_watchlists_product")
                            .from(Watchlists::Table, Watchlists::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One subscription per (user, product)
        manager
            .create_index(
                Index::create()
                    .name("uq_watchlists_user_product")
                    .table(Watchlists::Table)
                    .col(Watchlists::UserId)
                    .col(Watchlists::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_watchlists_product")
                    .table(Watchlists::Table)
                    .col(Watchlists::ProductId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Watchlists::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Watchlists {
    Table,
    Id,
    UserId,
    ProductId,
    TargetPrice,
    RegisteredPrice,
    NotifyAnyDrop,
    CreatedAt,
}
